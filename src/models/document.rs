//! Document model and MIME-type classification.
//!
//! Documents are uploaded into object storage and then processed
//! asynchronously. The classifier maps the stored MIME type onto a logical
//! kind, which in turn decides which analysis backends apply.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Overall processing status of a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl ProcessingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "processing" => Some(Self::Processing),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }

    /// Terminal statuses accept no further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

/// Logical document category derived from the MIME type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    Pdf,
    Image,
    Text,
    Word,
    Excel,
    Powerpoint,
}

impl DocumentKind {
    /// Classify an exact MIME string. Unknown types yield `None`.
    pub fn from_mime(mime_type: &str) -> Option<Self> {
        match mime_type {
            "application/pdf" => Some(Self::Pdf),
            "image/jpeg" | "image/png" | "image/gif" | "image/webp" => Some(Self::Image),
            "text/plain" => Some(Self::Text),
            "application/msword"
            | "application/vnd.openxmlformats-officedocument.wordprocessingml.document" => {
                Some(Self::Word)
            }
            "application/vnd.ms-excel"
            | "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet" => {
                Some(Self::Excel)
            }
            "application/vnd.ms-powerpoint"
            | "application/vnd.openxmlformats-officedocument.presentationml.presentation" => {
                Some(Self::Powerpoint)
            }
            _ => None,
        }
    }

    /// Whether the OCR backend can ingest this kind.
    pub fn supports_ocr(&self) -> bool {
        matches!(self, Self::Pdf | Self::Image)
    }

    /// Whether the NLP backend applies to this kind.
    pub fn supports_nlp(&self) -> bool {
        matches!(self, Self::Text | Self::Pdf)
    }
}

/// An uploaded document awaiting or undergoing analysis.
///
/// The document exclusively owns its processing jobs and analysis results.
/// `processing_status` is mutated only by the dispatch step and the
/// completion evaluator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    /// Unique identifier.
    pub id: String,
    /// Owning user reference.
    pub user_id: String,
    /// Document title.
    pub title: String,
    /// Filename at upload time.
    pub original_filename: String,
    /// Exact MIME type reported at upload.
    pub mime_type: String,
    /// Size in bytes.
    pub file_size: u64,
    /// Object storage bucket.
    pub storage_bucket: String,
    /// Object storage key.
    pub storage_key: String,
    /// Free-form tags.
    pub tags: Vec<String>,
    /// Whether the document is publicly visible.
    pub is_public: bool,
    /// Current processing status.
    pub processing_status: ProcessingStatus,
    /// Additional document information.
    pub metadata: serde_json::Value,
    /// When the document was uploaded.
    pub uploaded_at: DateTime<Utc>,
}

impl Document {
    /// Create a new document in `Pending` status.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        user_id: String,
        title: String,
        original_filename: String,
        mime_type: String,
        file_size: u64,
        storage_bucket: String,
        storage_key: String,
        metadata: serde_json::Value,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            user_id,
            title,
            original_filename,
            mime_type,
            file_size,
            storage_bucket,
            storage_key,
            tags: Vec::new(),
            is_public: false,
            processing_status: ProcessingStatus::Pending,
            metadata,
            uploaded_at: Utc::now(),
        }
    }

    /// Logical kind derived from the MIME type, if recognized.
    pub fn kind(&self) -> Option<DocumentKind> {
        DocumentKind::from_mime(&self.mime_type)
    }

    /// Human-readable file size for display.
    pub fn human_readable_size(&self) -> String {
        const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
        let mut size = self.file_size as f64;
        let mut unit = 0;
        while size > 1024.0 && unit < UNITS.len() - 1 {
            size /= 1024.0;
            unit += 1;
        }
        format!("{:.2} {}", size, UNITS[unit])
    }
}
