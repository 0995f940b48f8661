//! In-memory repository implementation.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::PipelineError;
use crate::models::{AnalysisResult, Document, ProcessingJob, ProcessingStatus};

use super::{JobCounts, PipelineRepository};

#[derive(Default)]
struct Inner {
    documents: HashMap<String, Document>,
    jobs: HashMap<String, ProcessingJob>,
    /// Result rows in insertion order, so "first OCR result" is stable.
    results: Vec<AnalysisResult>,
}

impl Inner {
    fn active_jobs(&self, document_id: &str) -> usize {
        self.jobs
            .values()
            .filter(|j| j.document_id == document_id && !j.status.is_terminal())
            .count()
    }
}

/// Repository keeping all rows in memory behind a single lock.
///
/// One lock covers documents and jobs together, which makes
/// `complete_document_if_idle` an atomic check-and-set: two jobs completing
/// at once cannot observe a stale job count.
#[derive(Default)]
pub struct MemoryRepository {
    inner: RwLock<Inner>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PipelineRepository for MemoryRepository {
    async fn create_document(&self, document: Document) -> Result<(), PipelineError> {
        self.inner
            .write()
            .await
            .documents
            .insert(document.id.clone(), document);
        Ok(())
    }

    async fn get_document(&self, document_id: &str) -> Result<Document, PipelineError> {
        self.inner
            .read()
            .await
            .documents
            .get(document_id)
            .cloned()
            .ok_or_else(|| PipelineError::DocumentNotFound(document_id.to_string()))
    }

    async fn update_document_status(
        &self,
        document_id: &str,
        status: ProcessingStatus,
    ) -> Result<Document, PipelineError> {
        let mut inner = self.inner.write().await;
        let doc = inner
            .documents
            .get_mut(document_id)
            .ok_or_else(|| PipelineError::DocumentNotFound(document_id.to_string()))?;
        doc.processing_status = status;
        Ok(doc.clone())
    }

    async fn complete_document_if_idle(
        &self,
        document_id: &str,
    ) -> Result<Option<Document>, PipelineError> {
        let mut inner = self.inner.write().await;
        if inner.active_jobs(document_id) > 0 {
            return Ok(None);
        }
        let doc = inner
            .documents
            .get_mut(document_id)
            .ok_or_else(|| PipelineError::DocumentNotFound(document_id.to_string()))?;
        doc.processing_status = ProcessingStatus::Completed;
        Ok(Some(doc.clone()))
    }

    async fn create_job(&self, job: ProcessingJob) -> Result<(), PipelineError> {
        self.inner.write().await.jobs.insert(job.id.clone(), job);
        Ok(())
    }

    async fn get_job(&self, job_id: &str) -> Result<ProcessingJob, PipelineError> {
        self.inner
            .read()
            .await
            .jobs
            .get(job_id)
            .cloned()
            .ok_or_else(|| PipelineError::JobNotFound(job_id.to_string()))
    }

    async fn mark_job_started(&self, job_id: &str) -> Result<ProcessingJob, PipelineError> {
        let mut inner = self.inner.write().await;
        let job = inner
            .jobs
            .get_mut(job_id)
            .ok_or_else(|| PipelineError::JobNotFound(job_id.to_string()))?;
        job.mark_started();
        Ok(job.clone())
    }

    async fn mark_job_completed(
        &self,
        job_id: &str,
        result: serde_json::Value,
    ) -> Result<ProcessingJob, PipelineError> {
        let mut inner = self.inner.write().await;
        let job = inner
            .jobs
            .get_mut(job_id)
            .ok_or_else(|| PipelineError::JobNotFound(job_id.to_string()))?;
        job.mark_completed(result);
        Ok(job.clone())
    }

    async fn mark_job_failed(
        &self,
        job_id: &str,
        message: &str,
    ) -> Result<ProcessingJob, PipelineError> {
        let mut inner = self.inner.write().await;
        let job = inner
            .jobs
            .get_mut(job_id)
            .ok_or_else(|| PipelineError::JobNotFound(job_id.to_string()))?;
        job.mark_failed(message);
        Ok(job.clone())
    }

    async fn set_backend_job_id(
        &self,
        job_id: &str,
        backend_job_id: &str,
    ) -> Result<(), PipelineError> {
        let mut inner = self.inner.write().await;
        let job = inner
            .jobs
            .get_mut(job_id)
            .ok_or_else(|| PipelineError::JobNotFound(job_id.to_string()))?;
        job.backend_job_id = Some(backend_job_id.to_string());
        Ok(())
    }

    async fn jobs_for_document(
        &self,
        document_id: &str,
    ) -> Result<Vec<ProcessingJob>, PipelineError> {
        let inner = self.inner.read().await;
        let mut jobs: Vec<ProcessingJob> = inner
            .jobs
            .values()
            .filter(|j| j.document_id == document_id)
            .cloned()
            .collect();
        jobs.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(jobs)
    }

    async fn count_active_jobs(&self, document_id: &str) -> Result<usize, PipelineError> {
        Ok(self.inner.read().await.active_jobs(document_id))
    }

    async fn job_counts(&self, document_id: &str) -> Result<JobCounts, PipelineError> {
        let inner = self.inner.read().await;
        let mut counts = JobCounts::default();
        for job in inner.jobs.values().filter(|j| j.document_id == document_id) {
            counts.total += 1;
            if job.status.is_terminal() {
                counts.terminal += 1;
            }
        }
        Ok(counts)
    }

    async fn create_result(&self, result: AnalysisResult) -> Result<(), PipelineError> {
        self.inner.write().await.results.push(result);
        Ok(())
    }

    async fn results_for_document(
        &self,
        document_id: &str,
    ) -> Result<Vec<AnalysisResult>, PipelineError> {
        Ok(self
            .inner
            .read()
            .await
            .results
            .iter()
            .filter(|r| r.document_id == document_id)
            .cloned()
            .collect())
    }

    async fn find_ocr_text(&self, document_id: &str) -> Result<Option<String>, PipelineError> {
        let inner = self.inner.read().await;
        Ok(inner
            .results
            .iter()
            .filter(|r| r.document_id == document_id && r.is_ocr_result())
            .find_map(|r| r.processed.joined_text())
            .filter(|text| !text.is_empty()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        ExecutionMode, JobKind, ProcessedData, ResultMetadata, TextBlock,
    };

    fn doc() -> Document {
        Document::new(
            "user-1".to_string(),
            "Doc".to_string(),
            "doc.pdf".to_string(),
            "application/pdf".to_string(),
            1024,
            "documents".to_string(),
            "uploads/doc.pdf".to_string(),
            serde_json::json!({}),
        )
    }

    fn ocr_result(document_id: &str, blocks: Vec<TextBlock>) -> AnalysisResult {
        AnalysisResult::new(
            document_id.to_string(),
            "ocr_text",
            serde_json::json!({}),
            ProcessedData::Ocr {
                text_blocks: blocks,
                tables: vec![],
                forms: vec![],
            },
            Some(0.9),
            ResultMetadata::default(),
        )
    }

    #[tokio::test]
    async fn test_document_crud() {
        let repo = MemoryRepository::new();
        let d = doc();
        let id = d.id.clone();
        repo.create_document(d).await.unwrap();

        let loaded = repo.get_document(&id).await.unwrap();
        assert_eq!(loaded.processing_status, ProcessingStatus::Pending);

        let updated = repo
            .update_document_status(&id, ProcessingStatus::Processing)
            .await
            .unwrap();
        assert_eq!(updated.processing_status, ProcessingStatus::Processing);

        assert!(matches!(
            repo.get_document("missing").await.unwrap_err(),
            PipelineError::DocumentNotFound(_)
        ));
    }

    #[tokio::test]
    async fn test_complete_if_idle_gates_on_active_jobs() {
        let repo = MemoryRepository::new();
        let d = doc();
        let doc_id = d.id.clone();
        repo.create_document(d).await.unwrap();

        let job = ProcessingJob::new(
            doc_id.clone(),
            JobKind::OcrText {
                mode: ExecutionMode::Sync,
            },
        );
        let job_id = job.id.clone();
        repo.create_job(job).await.unwrap();

        // Pending job blocks completion.
        assert!(repo.complete_document_if_idle(&doc_id).await.unwrap().is_none());

        repo.mark_job_failed(&job_id, "backend down").await.unwrap();
        let completed = repo.complete_document_if_idle(&doc_id).await.unwrap();
        assert_eq!(
            completed.unwrap().processing_status,
            ProcessingStatus::Completed
        );

        // Idempotent under repeat calls.
        let again = repo.complete_document_if_idle(&doc_id).await.unwrap();
        assert_eq!(
            again.unwrap().processing_status,
            ProcessingStatus::Completed
        );
    }

    #[tokio::test]
    async fn test_job_counts() {
        let repo = MemoryRepository::new();
        let d = doc();
        let doc_id = d.id.clone();
        repo.create_document(d).await.unwrap();

        for _ in 0..3 {
            repo.create_job(ProcessingJob::new(
                doc_id.clone(),
                JobKind::NlpEntities { direct_text: true },
            ))
            .await
            .unwrap();
        }
        let jobs = repo.jobs_for_document(&doc_id).await.unwrap();
        assert_eq!(jobs.len(), 3);
        assert_eq!(repo.count_active_jobs(&doc_id).await.unwrap(), 3);

        repo.mark_job_completed(&jobs[0].id, serde_json::json!({}))
            .await
            .unwrap();
        assert_eq!(repo.count_active_jobs(&doc_id).await.unwrap(), 2);
        assert_eq!(
            repo.job_counts(&doc_id).await.unwrap(),
            JobCounts {
                total: 3,
                terminal: 1
            }
        );
    }

    #[tokio::test]
    async fn test_find_ocr_text_joins_blocks() {
        let repo = MemoryRepository::new();
        let result = ocr_result(
            "doc-1",
            vec![
                TextBlock {
                    text: "First line".to_string(),
                    confidence: 99.0,
                    geometry: None,
                },
                TextBlock {
                    text: "second".to_string(),
                    confidence: 98.0,
                    geometry: None,
                },
            ],
        );
        repo.create_result(result).await.unwrap();

        assert_eq!(
            repo.find_ocr_text("doc-1").await.unwrap().as_deref(),
            Some("First line second")
        );
        assert!(repo.find_ocr_text("doc-2").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_find_ocr_text_ignores_empty_results() {
        let repo = MemoryRepository::new();
        repo.create_result(ocr_result("doc-1", vec![])).await.unwrap();
        assert!(repo.find_ocr_text("doc-1").await.unwrap().is_none());
    }
}
