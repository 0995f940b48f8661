//! NLP job executor.
//!
//! Consumes one text analysis job: sources document text (from a prior OCR
//! result, or straight from storage for direct-text jobs), truncates it to
//! the backend's byte limit, calls the matching operation, and persists the
//! normalized result with a derived confidence.

use std::sync::Arc;

use chrono::Utc;

use crate::backends::nlp::{
    truncate_utf8, NlpBackend, SENTIMENT_MAX_BYTES, TEXT_MAX_BYTES,
};
use crate::config::ProcessingConfig;
use crate::error::{NlpError, PipelineError};
use crate::models::{
    AnalysisResult, Document, JobKind, ProcessedData, ProcessingJob, ResultMetadata,
};
use crate::repository::PipelineRepository;
use crate::storage::ObjectStore;

use super::completion::CompletionEvaluator;

/// The normalized product of one NLP backend call.
struct NlpRun {
    raw: serde_json::Value,
    processed: ProcessedData,
    confidence: Option<f64>,
    request_id: Option<String>,
}

/// Executor for `nlp_sentiment`, `nlp_entities`, `nlp_key_phrases`, and
/// `nlp_language` jobs.
pub struct NlpJobExecutor {
    repo: Arc<dyn PipelineRepository>,
    backend: Arc<dyn NlpBackend>,
    store: Arc<dyn ObjectStore>,
    completion: Arc<CompletionEvaluator>,
    config: ProcessingConfig,
}

impl NlpJobExecutor {
    pub fn new(
        repo: Arc<dyn PipelineRepository>,
        backend: Arc<dyn NlpBackend>,
        store: Arc<dyn ObjectStore>,
        completion: Arc<CompletionEvaluator>,
        config: ProcessingConfig,
    ) -> Self {
        Self {
            repo,
            backend,
            store,
            completion,
            config,
        }
    }

    /// Execute one job to a terminal state.
    ///
    /// Mirrors the OCR executor: success persists an `AnalysisResult` and
    /// triggers completion evaluation; failure marks the job failed and
    /// propagates the error.
    pub async fn execute(&self, job_id: &str) -> Result<(), PipelineError> {
        let job = self.repo.get_job(job_id).await?;
        let document = self.repo.get_document(&job.document_id).await?;

        tracing::info!(
            job_id = %job.id,
            document_id = %document.id,
            job_type = job.kind.analysis_type(),
            "starting NLP processing"
        );

        let job = self.repo.mark_job_started(job_id).await?;

        match self.run(&job, &document).await {
            Ok((run, text_length)) => {
                self.record_success(&job, &document, run, text_length).await?;
                self.completion.evaluate(&document.id).await?;
                Ok(())
            }
            Err(err) => {
                tracing::error!(
                    job_id = %job.id,
                    document_id = %document.id,
                    error = %err,
                    "NLP processing failed"
                );
                self.repo.mark_job_failed(job_id, &err.to_string()).await?;
                // A failed job can still be the document's last active one.
                self.completion.evaluate(&document.id).await?;
                Err(err)
            }
        }
    }

    async fn run(
        &self,
        job: &ProcessingJob,
        document: &Document,
    ) -> Result<(NlpRun, usize), PipelineError> {
        let text = self.source_text(job, document).await?;
        let text_length = text.len();
        let lang = &self.config.default_language;

        let run = match &job.kind {
            JobKind::NlpSentiment { .. } => {
                let input = truncate_utf8(&text, SENTIMENT_MAX_BYTES);
                let output = self.backend.detect_sentiment(input, lang).await?;
                NlpRun {
                    raw: serde_json::to_value(&output).unwrap_or_default(),
                    confidence: Some(output.scores.max()),
                    request_id: output.request_id.clone(),
                    processed: ProcessedData::Sentiment {
                        sentiment: output.sentiment.as_str().to_string(),
                        confidence_scores: output.scores,
                    },
                }
            }
            JobKind::NlpEntities { .. } => {
                let input = truncate_utf8(&text, TEXT_MAX_BYTES);
                let output = self.backend.detect_entities(input, lang).await?;
                let confidence = mean(output.entities.iter().map(|e| e.confidence));
                NlpRun {
                    raw: serde_json::to_value(&output).unwrap_or_default(),
                    confidence,
                    request_id: output.request_id.clone(),
                    processed: ProcessedData::Entities {
                        entities: output.entities,
                    },
                }
            }
            JobKind::NlpKeyPhrases { .. } => {
                let input = truncate_utf8(&text, TEXT_MAX_BYTES);
                let output = self.backend.detect_key_phrases(input, lang).await?;
                let confidence = mean(output.key_phrases.iter().map(|p| p.confidence));
                NlpRun {
                    raw: serde_json::to_value(&output).unwrap_or_default(),
                    confidence,
                    request_id: output.request_id.clone(),
                    processed: ProcessedData::KeyPhrases {
                        key_phrases: output.key_phrases,
                    },
                }
            }
            JobKind::NlpLanguage { .. } => {
                let input = truncate_utf8(&text, TEXT_MAX_BYTES);
                let output = self.backend.detect_language(input).await?;
                let confidence = output
                    .languages
                    .iter()
                    .map(|l| l.confidence)
                    .fold(None, |acc: Option<f64>, c| {
                        Some(acc.map_or(c, |a| a.max(c)))
                    });
                NlpRun {
                    raw: serde_json::to_value(&output).unwrap_or_default(),
                    confidence,
                    request_id: output.request_id.clone(),
                    processed: ProcessedData::Languages {
                        languages: output.languages,
                    },
                }
            }
            other => {
                return Err(PipelineError::WrongExecutor(
                    other.analysis_type().to_string(),
                ))
            }
        };

        Ok((run, text_length))
    }

    /// Obtain the text this job analyzes.
    ///
    /// Precedence: a prior OCR result's text blocks win; otherwise
    /// direct-text jobs read the stored object; otherwise the job fails
    /// with `NoTextAvailable`.
    async fn source_text(
        &self,
        job: &ProcessingJob,
        document: &Document,
    ) -> Result<String, PipelineError> {
        if let Some(text) = self.repo.find_ocr_text(&document.id).await? {
            return Ok(text);
        }

        if job.kind.direct_text() {
            let bytes = self.store.download(&document.storage_key).await?;
            let text = String::from_utf8_lossy(&bytes).into_owned();
            if !text.trim().is_empty() {
                return Ok(text);
            }
        }

        Err(NlpError::NoTextAvailable.into())
    }

    async fn record_success(
        &self,
        job: &ProcessingJob,
        document: &Document,
        run: NlpRun,
        text_length: usize,
    ) -> Result<(), PipelineError> {
        let processing_time = job
            .started_at
            .map(|started| (Utc::now() - started).num_milliseconds() as f64 / 1_000.0)
            .unwrap_or(0.0);

        let metadata = ResultMetadata {
            processing_time_secs: processing_time,
            backend_request_id: run.request_id,
            text_length: Some(text_length),
            ..Default::default()
        };

        let result = AnalysisResult::new(
            document.id.clone(),
            job.kind.analysis_type(),
            run.raw.clone(),
            run.processed,
            run.confidence,
            metadata,
        );
        self.repo.create_result(result).await?;
        self.repo.mark_job_completed(&job.id, run.raw).await?;

        tracing::info!(
            job_id = %job.id,
            document_id = %document.id,
            "NLP processing completed"
        );
        Ok(())
    }
}

/// Arithmetic mean, `None` for an empty iterator.
fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let mut sum = 0.0;
    let mut count = 0usize;
    for v in values {
        sum += v;
        count += 1;
    }
    (count > 0).then(|| sum / count as f64)
}
