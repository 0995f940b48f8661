//! Persistence seam for documents, jobs, and analysis results.
//!
//! The pipeline only depends on this trait; the bundled implementation keeps
//! everything in memory behind one lock so job-completion callbacks observe a
//! consistent view of a document's job counts.

mod memory;

pub use memory::MemoryRepository;

use async_trait::async_trait;

use crate::error::PipelineError;
use crate::models::{AnalysisResult, Document, ProcessingJob, ProcessingStatus};

/// Job counts used for progress reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct JobCounts {
    pub total: usize,
    /// Jobs in Completed or Failed.
    pub terminal: usize,
}

/// Storage operations required by the pipeline.
#[async_trait]
pub trait PipelineRepository: Send + Sync {
    async fn create_document(&self, document: Document) -> Result<(), PipelineError>;

    async fn get_document(&self, document_id: &str) -> Result<Document, PipelineError>;

    /// Overwrite the document's processing status, returning the updated row.
    async fn update_document_status(
        &self,
        document_id: &str,
        status: ProcessingStatus,
    ) -> Result<Document, PipelineError>;

    /// Atomically mark the document Completed if it has no pending or
    /// processing jobs. Returns the updated document when the transition
    /// (or an idempotent re-completion) applied, `None` when jobs remain.
    async fn complete_document_if_idle(
        &self,
        document_id: &str,
    ) -> Result<Option<Document>, PipelineError>;

    async fn create_job(&self, job: ProcessingJob) -> Result<(), PipelineError>;

    async fn get_job(&self, job_id: &str) -> Result<ProcessingJob, PipelineError>;

    /// Transition a job to Processing, stamping `started_at`.
    async fn mark_job_started(&self, job_id: &str) -> Result<ProcessingJob, PipelineError>;

    /// Transition a job to Completed with its raw result payload.
    async fn mark_job_completed(
        &self,
        job_id: &str,
        result: serde_json::Value,
    ) -> Result<ProcessingJob, PipelineError>;

    /// Transition a job to Failed with an error message.
    async fn mark_job_failed(
        &self,
        job_id: &str,
        message: &str,
    ) -> Result<ProcessingJob, PipelineError>;

    /// Record the opaque backend job id for an async operation.
    async fn set_backend_job_id(
        &self,
        job_id: &str,
        backend_job_id: &str,
    ) -> Result<(), PipelineError>;

    async fn jobs_for_document(
        &self,
        document_id: &str,
    ) -> Result<Vec<ProcessingJob>, PipelineError>;

    /// Count of jobs still Pending or Processing.
    async fn count_active_jobs(&self, document_id: &str) -> Result<usize, PipelineError>;

    async fn job_counts(&self, document_id: &str) -> Result<JobCounts, PipelineError>;

    async fn create_result(&self, result: AnalysisResult) -> Result<(), PipelineError>;

    async fn results_for_document(
        &self,
        document_id: &str,
    ) -> Result<Vec<AnalysisResult>, PipelineError>;

    /// Concatenated text from the document's first OCR result that carries
    /// text blocks, in stored block order with single-space separators.
    async fn find_ocr_text(&self, document_id: &str) -> Result<Option<String>, PipelineError>;
}
