//! Processing job model and state machine.
//!
//! A job is one unit of work against one analysis backend. The state machine
//! is one-directional: Pending -> Processing -> Completed | Failed. Retry is
//! a "create a new job" concern for the embedding queue, never encoded here.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle status of a processing job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    /// Completed and Failed are terminal; the completion evaluator only
    /// counts non-terminal jobs.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

/// How an OCR job calls its backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    /// Blocking backend call, subject to synchronous size limits.
    Sync,
    /// Start-then-poll backend job, for large multi-page inputs.
    Async,
}

/// Feature set requested from structured document analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FeatureType {
    Forms,
    Tables,
}

/// The closed set of job kinds, each carrying its own parameters.
///
/// Executors match exhaustively on this enum, so an unhandled kind is a
/// compile error rather than a runtime string mismatch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum JobKind {
    /// Plain text detection (lines only, no forms or tables).
    OcrText { mode: ExecutionMode },
    /// Structured analysis with the requested feature set.
    OcrAnalysis {
        features: Vec<FeatureType>,
        mode: ExecutionMode,
    },
    /// Sentiment detection over document text.
    NlpSentiment { direct_text: bool },
    /// Named entity detection over document text.
    NlpEntities { direct_text: bool },
    /// Key phrase detection over document text.
    NlpKeyPhrases { direct_text: bool },
    /// Dominant language detection over document text.
    NlpLanguage { direct_text: bool },
}

impl JobKind {
    /// Stable tag mirrored into `AnalysisResult.analysis_type`.
    pub fn analysis_type(&self) -> &'static str {
        match self {
            Self::OcrText { .. } => "ocr_text",
            Self::OcrAnalysis { .. } => "ocr_analysis",
            Self::NlpSentiment { .. } => "nlp_sentiment",
            Self::NlpEntities { .. } => "nlp_entities",
            Self::NlpKeyPhrases { .. } => "nlp_key_phrases",
            Self::NlpLanguage { .. } => "nlp_language",
        }
    }

    pub fn is_ocr(&self) -> bool {
        matches!(self, Self::OcrText { .. } | Self::OcrAnalysis { .. })
    }

    pub fn is_nlp(&self) -> bool {
        !self.is_ocr()
    }

    /// Whether this NLP job reads the stored object directly instead of
    /// waiting for an OCR result.
    pub fn direct_text(&self) -> bool {
        match self {
            Self::NlpSentiment { direct_text }
            | Self::NlpEntities { direct_text }
            | Self::NlpKeyPhrases { direct_text }
            | Self::NlpLanguage { direct_text } => *direct_text,
            _ => false,
        }
    }

    /// Timeout hint for the execution harness. OCR jobs get longer budgets
    /// to allow for large async analysis.
    pub fn timeout(&self) -> Duration {
        if self.is_ocr() {
            Duration::from_secs(600)
        } else {
            Duration::from_secs(300)
        }
    }

    /// Bounded attempt count hint for the execution harness.
    pub fn max_attempts(&self) -> u32 {
        2
    }
}

/// One unit of analysis work owned by a document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessingJob {
    /// Unique identifier.
    pub id: String,
    /// Owning document.
    pub document_id: String,
    /// What to run and with which parameters.
    pub kind: JobKind,
    /// Current lifecycle status.
    pub status: JobStatus,
    /// Opaque backend job identifier for async OCR operations.
    pub backend_job_id: Option<String>,
    /// Raw result payload recorded at completion.
    pub result: Option<serde_json::Value>,
    /// Error message recorded at failure.
    pub error_message: Option<String>,
    /// Set on entry to Processing.
    pub started_at: Option<DateTime<Utc>>,
    /// Set on entry to Completed or Failed.
    pub completed_at: Option<DateTime<Utc>>,
    /// When the job row was created.
    pub created_at: DateTime<Utc>,
}

impl ProcessingJob {
    /// Create a new pending job for a document.
    pub fn new(document_id: String, kind: JobKind) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            document_id,
            kind,
            status: JobStatus::Pending,
            backend_job_id: None,
            result: None,
            error_message: None,
            started_at: None,
            completed_at: None,
            created_at: Utc::now(),
        }
    }

    /// Enter Processing and stamp `started_at`.
    pub fn mark_started(&mut self) {
        self.status = JobStatus::Processing;
        self.started_at = Some(Utc::now());
    }

    /// Enter Completed with the raw backend payload.
    pub fn mark_completed(&mut self, result: serde_json::Value) {
        self.status = JobStatus::Completed;
        self.result = Some(result);
        self.completed_at = Some(Utc::now());
    }

    /// Enter Failed with an error message.
    pub fn mark_failed(&mut self, message: impl Into<String>) {
        self.status = JobStatus::Failed;
        self.error_message = Some(message.into());
        self.completed_at = Some(Utc::now());
    }

    /// Wall-clock duration between start and completion, when both exist.
    pub fn processing_duration(&self) -> Option<chrono::Duration> {
        match (self.started_at, self.completed_at) {
            (Some(start), Some(end)) => Some(end - start),
            _ => None,
        }
    }
}
