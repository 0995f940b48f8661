//! Pipeline orchestration.
//!
//! Ties storage, the processor registry, and the job executors together:
//! `ingest` stores a file and creates its document, `submit` plans and
//! dispatches analysis jobs, and `run_to_completion` drives a document
//! deterministically for the CLI and tests.

use std::collections::HashMap;
use std::sync::Arc;

use crate::config::Config;
use crate::error::PipelineError;
use crate::models::{Document, ProcessingJob, ProcessingStatus};
use crate::notify::{StatusEvent, StatusNotifier};
use crate::repository::PipelineRepository;
use crate::storage::ObjectStore;

use super::nlp_executor::NlpJobExecutor;
use super::ocr_executor::OcrJobExecutor;
use super::registry::ProcessorRegistry;

/// Bounded attempt count hint for the execution harness when dispatching a
/// document, mirroring `JobKind::max_attempts` for individual jobs.
pub const DISPATCH_MAX_ATTEMPTS: u32 = 3;

pub struct Pipeline {
    repo: Arc<dyn PipelineRepository>,
    store: Arc<dyn ObjectStore>,
    registry: ProcessorRegistry,
    ocr: Arc<OcrJobExecutor>,
    nlp: Arc<NlpJobExecutor>,
    notifier: Arc<dyn StatusNotifier>,
    config: Config,
}

impl Pipeline {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        repo: Arc<dyn PipelineRepository>,
        store: Arc<dyn ObjectStore>,
        registry: ProcessorRegistry,
        ocr: Arc<OcrJobExecutor>,
        nlp: Arc<NlpJobExecutor>,
        notifier: Arc<dyn StatusNotifier>,
        config: Config,
    ) -> Self {
        Self {
            repo,
            store,
            registry,
            ocr,
            nlp,
            notifier,
            config,
        }
    }

    pub fn registry(&self) -> &ProcessorRegistry {
        &self.registry
    }

    /// Store an uploaded file and create its document record.
    ///
    /// The document starts Pending; nothing is analyzed until `submit`.
    pub async fn ingest(
        &self,
        user_id: &str,
        title: &str,
        filename: &str,
        content_type: &str,
        content: &[u8],
    ) -> Result<Document, PipelineError> {
        let key = self
            .store
            .upload(
                content,
                &self.config.storage.upload_prefix,
                filename,
                content_type,
                HashMap::new(),
            )
            .await?;

        let document = Document::new(
            user_id.to_string(),
            title.to_string(),
            filename.to_string(),
            content_type.to_string(),
            content.len() as u64,
            self.config.storage.bucket.clone(),
            key,
            serde_json::json!({}),
        );
        self.repo.create_document(document.clone()).await?;

        tracing::info!(
            document_id = %document.id,
            filename,
            content_type,
            size = document.human_readable_size(),
            "document ingested"
        );
        Ok(document)
    }

    /// Plan and dispatch analysis for a document.
    ///
    /// Marks the document Processing, persists one job per planned kind,
    /// and spawns each onto its executor. Jobs run concurrently and
    /// unordered; an NLP job dispatched alongside an OCR job may run before
    /// the OCR result exists, in which case it falls back to direct text or
    /// fails with no text available. Returns the created jobs without
    /// awaiting them.
    pub async fn submit(&self, document_id: &str) -> Result<Vec<ProcessingJob>, PipelineError> {
        let jobs = self.plan_jobs(document_id).await?;

        for job in &jobs {
            let job_id = job.id.clone();
            if job.kind.is_ocr() {
                let executor = self.ocr.clone();
                tokio::spawn(async move {
                    if let Err(err) = executor.execute(&job_id).await {
                        tracing::error!(job_id = %job_id, error = %err, "OCR job failed");
                    }
                });
            } else {
                let executor = self.nlp.clone();
                tokio::spawn(async move {
                    if let Err(err) = executor.execute(&job_id).await {
                        tracing::error!(job_id = %job_id, error = %err, "NLP job failed");
                    }
                });
            }
        }

        Ok(jobs)
    }

    /// Plan and execute all of a document's jobs in plan order.
    ///
    /// Sequential execution keeps OCR ahead of the NLP jobs that depend on
    /// its text. Individual job failures are logged and do not stop the
    /// remaining jobs; the refreshed document is returned once every job is
    /// terminal.
    pub async fn run_to_completion(&self, document_id: &str) -> Result<Document, PipelineError> {
        let jobs = self.plan_jobs(document_id).await?;

        for job in &jobs {
            if let Err(err) = self.execute_job(job).await {
                tracing::warn!(
                    job_id = %job.id,
                    job_type = job.kind.analysis_type(),
                    error = %err,
                    "job failed, continuing with remaining jobs"
                );
            }
        }

        self.repo.get_document(document_id).await
    }

    /// Run one job on the executor matching its kind.
    pub async fn execute_job(&self, job: &ProcessingJob) -> Result<(), PipelineError> {
        if job.kind.is_ocr() {
            self.ocr.execute(&job.id).await
        } else {
            self.nlp.execute(&job.id).await
        }
    }

    /// Classify the document, build its job plan, and persist the jobs.
    ///
    /// Any planning error marks the document Failed before it propagates.
    async fn plan_jobs(&self, document_id: &str) -> Result<Vec<ProcessingJob>, PipelineError> {
        let document = self
            .repo
            .update_document_status(document_id, ProcessingStatus::Processing)
            .await?;
        self.notify(&document, None).await;

        let kinds = match self.classify_and_plan(&document) {
            Ok(kinds) => kinds,
            Err(err) => {
                let failed = self
                    .repo
                    .update_document_status(document_id, ProcessingStatus::Failed)
                    .await?;
                self.notify(&failed, Some(err.to_string())).await;
                return Err(err);
            }
        };

        let mut jobs = Vec::with_capacity(kinds.len());
        for kind in kinds {
            let job = ProcessingJob::new(document.id.clone(), kind);
            self.repo.create_job(job.clone()).await?;
            jobs.push(job);
        }

        tracing::info!(
            document_id = %document.id,
            jobs = jobs.len(),
            "analysis jobs dispatched"
        );
        Ok(jobs)
    }

    fn classify_and_plan(
        &self,
        document: &Document,
    ) -> Result<Vec<crate::models::JobKind>, PipelineError> {
        if document.kind().is_none() {
            return Err(PipelineError::UnsupportedDocumentType(
                document.mime_type.clone(),
            ));
        }
        self.registry.plan(document)
    }

    async fn notify(&self, document: &Document, message: Option<String>) {
        let counts = match self.repo.job_counts(&document.id).await {
            Ok(counts) => counts,
            Err(err) => {
                tracing::warn!(document_id = %document.id, error = %err, "job counts unavailable");
                return;
            }
        };
        let mut event = StatusEvent::new(
            &document.id,
            &document.title,
            document.processing_status,
            counts,
        );
        if let Some(message) = message {
            event = event.with_message(message);
        }
        self.notifier.document_status_changed(event).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::backends::{FakeNlpBackend, FakeOcrBackend};
    use crate::models::JobStatus;
    use crate::notify::ChannelNotifier;
    use crate::processing::completion::CompletionEvaluator;
    use crate::repository::MemoryRepository;
    use crate::storage::MemoryStore;

    fn pipeline_with_channel() -> (
        Pipeline,
        Arc<MemoryRepository>,
        tokio::sync::mpsc::UnboundedReceiver<StatusEvent>,
    ) {
        let config = Config::default();
        let repo: Arc<MemoryRepository> = Arc::new(MemoryRepository::new());
        let store = Arc::new(MemoryStore::new(config.storage.bucket.clone()));
        let (notifier, rx) = ChannelNotifier::new();
        let notifier: Arc<dyn StatusNotifier> = Arc::new(notifier);
        let completion = Arc::new(CompletionEvaluator::new(repo.clone(), notifier.clone()));
        let ocr = Arc::new(OcrJobExecutor::new(
            repo.clone(),
            Arc::new(FakeOcrBackend::new()),
            completion.clone(),
            config.processing.clone(),
        ));
        let nlp = Arc::new(NlpJobExecutor::new(
            repo.clone(),
            Arc::new(FakeNlpBackend::new()),
            store.clone(),
            completion,
            config.processing.clone(),
        ));
        let registry = ProcessorRegistry::with_defaults(&config.processing);
        let pipeline = Pipeline::new(
            repo.clone(),
            store,
            registry,
            ocr,
            nlp,
            notifier,
            config,
        );
        (pipeline, repo, rx)
    }

    #[tokio::test]
    async fn test_ingest_stores_object_and_creates_pending_document() {
        let (pipeline, repo, _rx) = pipeline_with_channel();

        let doc = pipeline
            .ingest("user-1", "Report", "report.pdf", "application/pdf", b"%PDF-1.7")
            .await
            .unwrap();

        assert_eq!(doc.processing_status, ProcessingStatus::Pending);
        assert!(doc.storage_key.starts_with("uploads/"));
        assert!(doc.storage_key.ends_with(".pdf"));
        assert_eq!(doc.file_size, 8);
        let stored = repo.get_document(&doc.id).await.unwrap();
        assert_eq!(stored.title, "Report");
    }

    #[tokio::test]
    async fn test_run_to_completion_small_pdf() {
        let (pipeline, repo, _rx) = pipeline_with_channel();
        let doc = pipeline
            .ingest("user-1", "Report", "report.pdf", "application/pdf", b"%PDF-1.7")
            .await
            .unwrap();

        let done = pipeline.run_to_completion(&doc.id).await.unwrap();

        assert_eq!(done.processing_status, ProcessingStatus::Completed);
        let jobs = repo.jobs_for_document(&doc.id).await.unwrap();
        assert_eq!(jobs.len(), 3);
        assert!(jobs.iter().all(|j| j.status == JobStatus::Completed));
        let results = repo.results_for_document(&doc.id).await.unwrap();
        assert_eq!(results.len(), 3);
    }

    #[tokio::test]
    async fn test_unsupported_type_fails_document_and_notifies() {
        let (pipeline, repo, mut rx) = pipeline_with_channel();
        let doc = pipeline
            .ingest(
                "user-1",
                "Archive",
                "data.bin",
                "application/octet-stream",
                b"\x00\x01",
            )
            .await
            .unwrap();

        let err = pipeline.submit(&doc.id).await.unwrap_err();
        assert!(matches!(err, PipelineError::UnsupportedDocumentType(_)));

        let doc = repo.get_document(&doc.id).await.unwrap();
        assert_eq!(doc.processing_status, ProcessingStatus::Failed);

        // Processing first, then Failed with a message.
        let first = rx.recv().await.unwrap();
        assert_eq!(first.status, ProcessingStatus::Processing);
        let second = rx.recv().await.unwrap();
        assert_eq!(second.status, ProcessingStatus::Failed);
        assert!(second.message.unwrap().contains("octet-stream"));
    }

    #[tokio::test]
    async fn test_office_format_classifies_but_has_no_processor() {
        let (pipeline, repo, _rx) = pipeline_with_channel();
        let doc = pipeline
            .ingest("user-1", "Memo", "memo.doc", "application/msword", b"doc")
            .await
            .unwrap();

        let err = pipeline.submit(&doc.id).await.unwrap_err();
        assert!(matches!(err, PipelineError::NoProcessorAvailable(_)));
        let doc = repo.get_document(&doc.id).await.unwrap();
        assert_eq!(doc.processing_status, ProcessingStatus::Failed);
    }

    #[tokio::test]
    async fn test_submit_dispatches_without_awaiting() {
        let (pipeline, repo, _rx) = pipeline_with_channel();
        let doc = pipeline
            .ingest("user-1", "Scan", "scan.png", "image/png", b"\x89PNG")
            .await
            .unwrap();

        let jobs = pipeline.submit(&doc.id).await.unwrap();
        assert_eq!(jobs.len(), 1);

        // The spawned job eventually completes the document.
        for _ in 0..50 {
            let doc = repo.get_document(&doc.id).await.unwrap();
            if doc.processing_status == ProcessingStatus::Completed {
                return;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        panic!("document never completed");
    }

    #[tokio::test]
    async fn test_text_document_runs_all_nlp_jobs_from_stored_text() {
        let (pipeline, repo, _rx) = pipeline_with_channel();
        let doc = pipeline
            .ingest(
                "user-1",
                "Notes",
                "notes.txt",
                "text/plain",
                b"Plain text body for analysis",
            )
            .await
            .unwrap();

        let done = pipeline.run_to_completion(&doc.id).await.unwrap();
        assert_eq!(done.processing_status, ProcessingStatus::Completed);

        let results = repo.results_for_document(&doc.id).await.unwrap();
        assert_eq!(results.len(), 4);
        assert!(results.iter().all(|r| r.is_nlp_result()));
    }
}
