//! Document completion evaluation.
//!
//! Runs after every job reaches a terminal state. A document is complete
//! when no owned job remains pending or processing; failed siblings do not
//! block completion (documented policy, see DESIGN.md).

use std::sync::Arc;

use crate::error::PipelineError;
use crate::models::ProcessingStatus;
use crate::notify::{StatusEvent, StatusNotifier};
use crate::repository::PipelineRepository;

/// Decides whether a document has finished processing.
pub struct CompletionEvaluator {
    repo: Arc<dyn PipelineRepository>,
    notifier: Arc<dyn StatusNotifier>,
}

impl CompletionEvaluator {
    pub fn new(repo: Arc<dyn PipelineRepository>, notifier: Arc<dyn StatusNotifier>) -> Self {
        Self { repo, notifier }
    }

    /// Evaluate the document, completing it when no active jobs remain.
    ///
    /// Idempotent and safe to call from concurrent job-completion callbacks:
    /// the repository performs the count-and-complete atomically, and
    /// re-completing an already Completed document is a no-op.
    pub async fn evaluate(&self, document_id: &str) -> Result<bool, PipelineError> {
        let before = self.repo.get_document(document_id).await?;

        match self.repo.complete_document_if_idle(document_id).await? {
            Some(doc) => {
                if before.processing_status != ProcessingStatus::Completed {
                    tracing::info!(document_id = %doc.id, "document processing completed");
                    let counts = self.repo.job_counts(document_id).await?;
                    self.notifier
                        .document_status_changed(StatusEvent::new(
                            doc.id.clone(),
                            doc.title.clone(),
                            ProcessingStatus::Completed,
                            counts,
                        ))
                        .await;
                }
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Document, JobKind, ProcessingJob};
    use crate::notify::ChannelNotifier;
    use crate::repository::MemoryRepository;

    async fn setup(job_count: usize) -> (CompletionEvaluator, Arc<MemoryRepository>, String, Vec<String>) {
        let repo = Arc::new(MemoryRepository::new());
        let (notifier, _rx) = ChannelNotifier::new();
        let evaluator = CompletionEvaluator::new(repo.clone(), Arc::new(notifier));

        let doc = Document::new(
            "user-1".to_string(),
            "Doc".to_string(),
            "doc.txt".to_string(),
            "text/plain".to_string(),
            100,
            "documents".to_string(),
            "uploads/doc.txt".to_string(),
            serde_json::json!({}),
        );
        let doc_id = doc.id.clone();
        repo.create_document(doc).await.unwrap();
        repo.update_document_status(&doc_id, ProcessingStatus::Processing)
            .await
            .unwrap();

        let mut job_ids = Vec::new();
        for _ in 0..job_count {
            let job = ProcessingJob::new(doc_id.clone(), JobKind::NlpLanguage { direct_text: true });
            job_ids.push(job.id.clone());
            repo.create_job(job).await.unwrap();
        }
        (evaluator, repo, doc_id, job_ids)
    }

    #[tokio::test]
    async fn test_completes_exactly_when_last_job_is_terminal() {
        let (evaluator, repo, doc_id, job_ids) = setup(3).await;

        for (i, job_id) in job_ids.iter().enumerate() {
            repo.mark_job_completed(job_id, serde_json::json!({}))
                .await
                .unwrap();
            let completed = evaluator.evaluate(&doc_id).await.unwrap();
            let expected = i == job_ids.len() - 1;
            assert_eq!(completed, expected, "after terminal job {i}");
        }

        let doc = repo.get_document(&doc_id).await.unwrap();
        assert_eq!(doc.processing_status, ProcessingStatus::Completed);

        // Re-evaluation stays completed.
        assert!(evaluator.evaluate(&doc_id).await.unwrap());
        let doc = repo.get_document(&doc_id).await.unwrap();
        assert_eq!(doc.processing_status, ProcessingStatus::Completed);
    }

    #[tokio::test]
    async fn test_failed_siblings_do_not_block_completion() {
        let (evaluator, repo, doc_id, job_ids) = setup(2).await;

        repo.mark_job_completed(&job_ids[0], serde_json::json!({}))
            .await
            .unwrap();
        repo.mark_job_failed(&job_ids[1], "backend error")
            .await
            .unwrap();

        assert!(evaluator.evaluate(&doc_id).await.unwrap());
        let doc = repo.get_document(&doc_id).await.unwrap();
        // Policy: terminal-only gate; FAILED siblings still yield COMPLETED.
        assert_eq!(doc.processing_status, ProcessingStatus::Completed);
    }

    #[tokio::test]
    async fn test_notifies_once_on_completion() {
        let repo = Arc::new(MemoryRepository::new());
        let (notifier, mut rx) = ChannelNotifier::new();
        let evaluator = CompletionEvaluator::new(repo.clone(), Arc::new(notifier));

        let doc = Document::new(
            "user-1".to_string(),
            "Doc".to_string(),
            "doc.txt".to_string(),
            "text/plain".to_string(),
            100,
            "documents".to_string(),
            "uploads/doc.txt".to_string(),
            serde_json::json!({}),
        );
        let doc_id = doc.id.clone();
        repo.create_document(doc).await.unwrap();
        repo.update_document_status(&doc_id, ProcessingStatus::Processing)
            .await
            .unwrap();

        assert!(evaluator.evaluate(&doc_id).await.unwrap());
        assert!(evaluator.evaluate(&doc_id).await.unwrap());

        let event = rx.recv().await.unwrap();
        assert_eq!(event.status, ProcessingStatus::Completed);
        assert_eq!(event.progress, 100);
        // Second evaluation saw an already-completed document: no new event.
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_pending_jobs_leave_status_unchanged() {
        let (evaluator, repo, doc_id, _job_ids) = setup(1).await;
        assert!(!evaluator.evaluate(&doc_id).await.unwrap());
        let doc = repo.get_document(&doc_id).await.unwrap();
        assert_eq!(doc.processing_status, ProcessingStatus::Processing);
    }
}
