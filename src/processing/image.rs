//! Image processing strategy.

use crate::models::{Document, DocumentKind, ExecutionMode, JobKind};

use super::registry::DocumentProcessor;

/// Strategy for image documents.
///
/// Images use plain text detection only, never form or table analysis, and
/// are small enough for the synchronous backend path.
pub struct ImageProcessor;

impl DocumentProcessor for ImageProcessor {
    fn name(&self) -> &'static str {
        "image"
    }

    fn priority(&self) -> i32 {
        10
    }

    fn supported_mime_types(&self) -> &'static [&'static str] {
        &["image/jpeg", "image/png", "image/gif", "image/webp"]
    }

    fn can_process(&self, document: &Document) -> bool {
        document.kind() == Some(DocumentKind::Image)
    }

    fn plan(&self, document: &Document) -> Vec<JobKind> {
        tracing::info!(
            document_id = %document.id,
            mime_type = %document.mime_type,
            "scheduling text detection for image"
        );
        vec![JobKind::OcrText {
            mode: ExecutionMode::Sync,
        }]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image(mime: &str, size: u64) -> Document {
        Document::new(
            "user-1".to_string(),
            "Scan".to_string(),
            "scan.png".to_string(),
            mime.to_string(),
            size,
            "documents".to_string(),
            "uploads/scan.png".to_string(),
            serde_json::json!({}),
        )
    }

    #[test]
    fn test_single_sync_text_job_regardless_of_size() {
        let processor = ImageProcessor;
        for size in [100, 50 * 1024 * 1024] {
            let plan = processor.plan(&image("image/png", size));
            assert_eq!(plan.len(), 1);
            assert!(matches!(
                plan[0],
                JobKind::OcrText {
                    mode: ExecutionMode::Sync
                }
            ));
        }
    }

    #[test]
    fn test_claims_all_image_kinds() {
        let processor = ImageProcessor;
        for mime in ["image/jpeg", "image/png", "image/gif", "image/webp"] {
            assert!(processor.can_process(&image(mime, 100)), "rejects {mime}");
        }
        assert!(!processor.can_process(&image("application/pdf", 100)));
    }
}
