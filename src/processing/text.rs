//! Plain text processing strategy.

use crate::models::{Document, DocumentKind, JobKind};

use super::registry::DocumentProcessor;

/// Strategy for plain text documents.
///
/// Text needs no OCR; all four NLP operations run directly over the stored
/// content (`direct_text`), independently of each other.
pub struct TextProcessor;

impl DocumentProcessor for TextProcessor {
    fn name(&self) -> &'static str {
        "text"
    }

    fn priority(&self) -> i32 {
        5
    }

    fn supported_mime_types(&self) -> &'static [&'static str] {
        &["text/plain"]
    }

    fn can_process(&self, document: &Document) -> bool {
        document.kind() == Some(DocumentKind::Text)
    }

    fn plan(&self, document: &Document) -> Vec<JobKind> {
        tracing::info!(
            document_id = %document.id,
            "scheduling direct text analysis"
        );
        vec![
            JobKind::NlpSentiment { direct_text: true },
            JobKind::NlpEntities { direct_text: true },
            JobKind::NlpKeyPhrases { direct_text: true },
            JobKind::NlpLanguage { direct_text: true },
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_four_direct_text_jobs() {
        let doc = Document::new(
            "user-1".to_string(),
            "Notes".to_string(),
            "notes.txt".to_string(),
            "text/plain".to_string(),
            512,
            "documents".to_string(),
            "uploads/notes.txt".to_string(),
            serde_json::json!({}),
        );
        let plan = TextProcessor.plan(&doc);
        assert_eq!(plan.len(), 4);
        assert!(plan.iter().all(|k| k.direct_text()));
        let tags: Vec<&str> = plan.iter().map(|k| k.analysis_type()).collect();
        assert_eq!(
            tags,
            vec!["nlp_sentiment", "nlp_entities", "nlp_key_phrases", "nlp_language"]
        );
    }
}
