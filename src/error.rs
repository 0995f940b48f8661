//! Typed errors for the document analysis pipeline.
//!
//! Backend and storage failures are wrapped into these domain errors at the
//! capability boundary, so pipeline code never branches on transport types.

use thiserror::Error;

/// Errors raised by the object storage capability.
///
/// Each variant carries the operation context (key, reason) so callers can
/// surface actionable messages without holding onto the transport error.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Invalid file: {0}")]
    InvalidFile(String),

    #[error("Upload failed for '{key}': {reason}")]
    UploadFailed { key: String, reason: String },

    #[error("Download failed for '{key}': {reason}")]
    DownloadFailed { key: String, reason: String },

    #[error("Delete failed for '{key}': {reason}")]
    DeleteFailed { key: String, reason: String },

    #[error("Copy failed from '{source_key}' to '{destination}': {reason}")]
    CopyFailed {
        source_key: String,
        destination: String,
        reason: String,
    },

    #[error("File not found: {0}")]
    NotFound(String),

    #[error("Access denied for {operation} on '{key}'")]
    AccessDenied { operation: String, key: String },
}

/// Errors raised by the document analysis (OCR) backend.
#[derive(Debug, Error)]
pub enum OcrError {
    #[error("Rate limit exceeded, try again later")]
    RateLimited,

    #[error("Invalid document format or corrupted file: {0}")]
    InvalidDocument(String),

    #[error("Document is too large for synchronous processing (max {max_bytes} bytes)")]
    DocumentTooLarge { max_bytes: u64 },

    #[error("Document format not supported for analysis: {0}")]
    UnsupportedFormat(String),

    #[error("Analysis job '{job_id}' failed: {message}")]
    JobFailed { job_id: String, message: String },

    #[error("Analysis job not found: {0}")]
    JobNotFound(String),

    #[error("OCR backend error: {0}")]
    Backend(String),
}

/// Errors raised by the text analysis (NLP) backend.
#[derive(Debug, Error)]
pub enum NlpError {
    #[error("Text exceeds the {max_bytes} byte limit for {operation}")]
    TextTooLarge { operation: String, max_bytes: usize },

    #[error("Language '{0}' is not supported")]
    UnsupportedLanguage(String),

    #[error("No text available for analysis")]
    NoTextAvailable,

    #[error("NLP backend error: {0}")]
    Backend(String),
}

/// Errors raised by the pipeline itself (classification, planning, dispatch).
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Unsupported document type: {0}")]
    UnsupportedDocumentType(String),

    #[error("No processor available for document type: {0}")]
    NoProcessorAvailable(String),

    #[error("Document not found: {0}")]
    DocumentNotFound(String),

    #[error("Processing job not found: {0}")]
    JobNotFound(String),

    #[error("Unexpected job kind for this executor: {0}")]
    WrongExecutor(String),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Ocr(#[from] OcrError),

    #[error(transparent)]
    Nlp(#[from] NlpError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages_carry_context() {
        let err = StorageError::AccessDenied {
            operation: "upload".to_string(),
            key: "docs/a.pdf".to_string(),
        };
        assert_eq!(err.to_string(), "Access denied for upload on 'docs/a.pdf'");

        let err = PipelineError::NoProcessorAvailable("application/msword".to_string());
        assert_eq!(
            err.to_string(),
            "No processor available for document type: application/msword"
        );
    }

    #[test]
    fn test_backend_errors_convert_to_pipeline_errors() {
        let err: PipelineError = NlpError::NoTextAvailable.into();
        assert!(matches!(err, PipelineError::Nlp(NlpError::NoTextAvailable)));
    }
}
