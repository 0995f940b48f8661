//! OCR job executor.
//!
//! Consumes one OCR processing job: calls the document analysis backend
//! (synchronously or via start-then-poll), normalizes the raw block stream
//! into text blocks, tables, and form keys, derives an aggregate confidence,
//! and persists the analysis result. Partial backend results are kept with a
//! warning annotation instead of failing the job.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;

use crate::backends::ocr::{Block, BlockType, EntityRole, OcrBackend, OcrPoll};
use crate::config::ProcessingConfig;
use crate::error::{OcrError, PipelineError};
use crate::models::{
    AnalysisResult, Document, ExecutionMode, FormField, JobKind, ProcessedData, ProcessingJob,
    ResultMetadata, TableBlock, TextBlock,
};
use crate::repository::PipelineRepository;

use super::completion::CompletionEvaluator;

/// The product of one backend call, before normalization.
struct OcrRun {
    blocks: Vec<Block>,
    request_id: Option<String>,
    is_partial: bool,
    partial_message: Option<String>,
    warnings: Vec<String>,
}

/// Executor for `ocr_text` and `ocr_analysis` jobs.
pub struct OcrJobExecutor {
    repo: Arc<dyn PipelineRepository>,
    backend: Arc<dyn OcrBackend>,
    completion: Arc<CompletionEvaluator>,
    config: ProcessingConfig,
}

impl OcrJobExecutor {
    pub fn new(
        repo: Arc<dyn PipelineRepository>,
        backend: Arc<dyn OcrBackend>,
        completion: Arc<CompletionEvaluator>,
        config: ProcessingConfig,
    ) -> Self {
        Self {
            repo,
            backend,
            completion,
            config,
        }
    }

    /// Execute one job to a terminal state.
    ///
    /// On success an `AnalysisResult` is persisted and the completion
    /// evaluator runs. On failure the job is marked failed and the error is
    /// propagated to the caller.
    pub async fn execute(&self, job_id: &str) -> Result<(), PipelineError> {
        let job = self.repo.get_job(job_id).await?;
        let document = self.repo.get_document(&job.document_id).await?;

        tracing::info!(
            job_id = %job.id,
            document_id = %document.id,
            job_type = job.kind.analysis_type(),
            "starting OCR processing"
        );

        let job = self.repo.mark_job_started(job_id).await?;

        match self.run(&job, &document).await {
            Ok(run) => {
                self.record_success(&job, &document, run).await?;
                self.completion.evaluate(&document.id).await?;
                Ok(())
            }
            Err(err) => {
                tracing::error!(
                    job_id = %job.id,
                    document_id = %document.id,
                    error = %err,
                    "OCR processing failed"
                );
                self.repo.mark_job_failed(job_id, &err.to_string()).await?;
                // A failed job can still be the document's last active one.
                self.completion.evaluate(&document.id).await?;
                Err(err)
            }
        }
    }

    async fn run(&self, job: &ProcessingJob, document: &Document) -> Result<OcrRun, PipelineError> {
        let key = &document.storage_key;
        let bucket = &document.storage_bucket;

        match &job.kind {
            JobKind::OcrText { mode: ExecutionMode::Sync } => {
                let output = self.backend.detect_text(key, bucket).await?;
                Ok(OcrRun {
                    blocks: output.blocks,
                    request_id: output.request_id,
                    is_partial: false,
                    partial_message: None,
                    warnings: Vec::new(),
                })
            }
            JobKind::OcrText { mode: ExecutionMode::Async } => {
                let backend_job_id = self.backend.start_text_detection(key, bucket).await?;
                self.repo.set_backend_job_id(&job.id, &backend_job_id).await?;
                self.collect_async(&backend_job_id, false).await
            }
            JobKind::OcrAnalysis { features, mode: ExecutionMode::Sync } => {
                let output = self.backend.analyze(key, bucket, features).await?;
                Ok(OcrRun {
                    blocks: output.blocks,
                    request_id: output.request_id,
                    is_partial: false,
                    partial_message: None,
                    warnings: Vec::new(),
                })
            }
            JobKind::OcrAnalysis { features, mode: ExecutionMode::Async } => {
                let backend_job_id = self.backend.start_analysis(key, bucket, features).await?;
                self.repo.set_backend_job_id(&job.id, &backend_job_id).await?;
                self.collect_async(&backend_job_id, true).await
            }
            other => Err(PipelineError::WrongExecutor(
                other.analysis_type().to_string(),
            )),
        }
    }

    async fn poll_once(
        &self,
        backend_job_id: &str,
        analysis: bool,
        token: Option<&str>,
    ) -> Result<OcrPoll, OcrError> {
        if analysis {
            self.backend.get_analysis(backend_job_id, token).await
        } else {
            self.backend.get_text_detection(backend_job_id, token).await
        }
    }

    /// Poll an async backend job to completion, then follow continuation
    /// tokens until every page of blocks has been aggregated.
    async fn collect_async(
        &self,
        backend_job_id: &str,
        analysis: bool,
    ) -> Result<OcrRun, PipelineError> {
        // Wait for the backend job to finish.
        let mut attempts = 0u32;
        let first_page = loop {
            match self.poll_once(backend_job_id, analysis, None).await? {
                OcrPoll::InProgress => {
                    attempts += 1;
                    if attempts >= self.config.max_poll_attempts {
                        return Err(OcrError::JobFailed {
                            job_id: backend_job_id.to_string(),
                            message: format!(
                                "not finished after {} polls",
                                self.config.max_poll_attempts
                            ),
                        }
                        .into());
                    }
                    tokio::time::sleep(Duration::from_millis(self.config.poll_interval_ms)).await;
                }
                page => break page,
            }
        };

        let OcrPoll::Page {
            mut blocks,
            mut next_token,
            request_id,
            is_partial,
            status_message,
            warnings,
        } = first_page
        else {
            unreachable!("loop only breaks on a page");
        };

        // Remaining pages are available immediately.
        while let Some(token) = next_token.take() {
            match self.poll_once(backend_job_id, analysis, Some(&token)).await? {
                OcrPoll::Page {
                    blocks: more,
                    next_token: further,
                    ..
                } => {
                    blocks.extend(more);
                    next_token = further;
                }
                OcrPoll::InProgress => {
                    return Err(OcrError::Backend(
                        "backend reported in-progress on a continuation page".to_string(),
                    )
                    .into());
                }
            }
        }

        Ok(OcrRun {
            blocks,
            request_id,
            is_partial,
            partial_message: status_message,
            warnings,
        })
    }

    async fn record_success(
        &self,
        job: &ProcessingJob,
        document: &Document,
        run: OcrRun,
    ) -> Result<(), PipelineError> {
        let processing_time = job
            .started_at
            .map(|started| (Utc::now() - started).num_milliseconds() as f64 / 1_000.0)
            .unwrap_or(0.0);

        let mut metadata = ResultMetadata {
            processing_time_secs: processing_time,
            backend_request_id: run.request_id.clone(),
            ..Default::default()
        };

        if run.is_partial {
            metadata.is_partial = true;
            metadata.partial_message = Some(
                run.partial_message
                    .clone()
                    .unwrap_or_else(|| "Some pages could not be processed".to_string()),
            );
            metadata.warnings = run.warnings.clone();
            tracing::warn!(
                job_id = %job.id,
                document_id = %document.id,
                message = metadata.partial_message.as_deref().unwrap_or(""),
                "OCR completed with partial results"
            );
        }

        let raw = serde_json::json!({
            "blocks": run.blocks,
            "request_id": run.request_id,
            "is_partial": run.is_partial,
            "warnings": run.warnings,
        });

        let result = AnalysisResult::new(
            document.id.clone(),
            job.kind.analysis_type(),
            raw.clone(),
            normalize_blocks(&run.blocks),
            average_confidence(&run.blocks),
            metadata,
        );
        self.repo.create_result(result).await?;
        self.repo.mark_job_completed(&job.id, raw).await?;

        tracing::info!(
            job_id = %job.id,
            document_id = %document.id,
            blocks = run.blocks.len(),
            "OCR processing completed"
        );
        Ok(())
    }
}

/// Normalize raw blocks into the backend-agnostic OCR payload.
///
/// Lines become text blocks, tables are referenced by id, and key-value
/// blocks contribute a form field only in the KEY role. Every other block
/// type is ignored.
pub fn normalize_blocks(blocks: &[Block]) -> ProcessedData {
    let mut text_blocks = Vec::new();
    let mut tables = Vec::new();
    let mut forms = Vec::new();

    for block in blocks {
        match block.block_type {
            BlockType::Line => text_blocks.push(TextBlock {
                text: block.text.clone().unwrap_or_default(),
                confidence: block.confidence.unwrap_or(0.0),
                geometry: block.geometry.clone(),
            }),
            BlockType::Table => tables.push(TableBlock {
                id: block.id.clone().unwrap_or_default(),
                confidence: block.confidence.unwrap_or(0.0),
                geometry: block.geometry.clone(),
            }),
            BlockType::KeyValueSet => {
                if block.entity_types.contains(&EntityRole::Key) {
                    forms.push(FormField {
                        text: block.text.clone().unwrap_or_default(),
                        confidence: block.confidence.unwrap_or(0.0),
                    });
                }
            }
            _ => {}
        }
    }

    ProcessedData::Ocr {
        text_blocks,
        tables,
        forms,
    }
}

/// Mean of all reported block confidences, scaled from percent to [0,1].
/// `None` when no block carries a confidence.
pub fn average_confidence(blocks: &[Block]) -> Option<f64> {
    let confidences: Vec<f64> = blocks.iter().filter_map(|b| b.confidence).collect();
    if confidences.is_empty() {
        return None;
    }
    Some(confidences.iter().sum::<f64>() / confidences.len() as f64 / 100.0)
}
