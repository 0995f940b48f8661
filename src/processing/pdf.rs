//! PDF processing strategy.

use crate::models::{Document, DocumentKind, ExecutionMode, FeatureType, JobKind};

use super::registry::DocumentProcessor;

/// Strategy for PDF documents.
///
/// PDFs above the size threshold must use asynchronous analysis to stay
/// within the backend's synchronous size and time limits. Small PDFs get a
/// synchronous analysis plus immediate sentiment and entity detection over
/// the extracted text.
pub struct PdfProcessor {
    async_threshold_bytes: u64,
}

impl PdfProcessor {
    pub fn new(async_threshold_bytes: u64) -> Self {
        Self {
            async_threshold_bytes,
        }
    }
}

impl DocumentProcessor for PdfProcessor {
    fn name(&self) -> &'static str {
        "pdf"
    }

    fn priority(&self) -> i32 {
        20
    }

    fn supported_mime_types(&self) -> &'static [&'static str] {
        &["application/pdf"]
    }

    fn can_process(&self, document: &Document) -> bool {
        document.kind() == Some(DocumentKind::Pdf)
    }

    fn plan(&self, document: &Document) -> Vec<JobKind> {
        let features = vec![FeatureType::Tables, FeatureType::Forms];

        if document.file_size > self.async_threshold_bytes {
            tracing::info!(
                document_id = %document.id,
                file_size = document.file_size,
                "scheduling async analysis for large PDF"
            );
            vec![JobKind::OcrAnalysis {
                features,
                mode: ExecutionMode::Async,
            }]
        } else {
            tracing::info!(
                document_id = %document.id,
                file_size = document.file_size,
                "scheduling sync analysis for small PDF with text analysis"
            );
            vec![
                JobKind::OcrAnalysis {
                    features,
                    mode: ExecutionMode::Sync,
                },
                JobKind::NlpSentiment { direct_text: false },
                JobKind::NlpEntities { direct_text: false },
            ]
        }
    }
}
