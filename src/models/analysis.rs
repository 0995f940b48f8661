//! Analysis result model.
//!
//! One result row is created per completed job. The raw backend payload is
//! preserved verbatim for audit alongside a backend-agnostic processed form.
//! Results are write-once: never updated or deleted by the pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single line of detected text with its position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextBlock {
    pub text: String,
    /// Backend confidence as a percentage (0-100).
    pub confidence: f64,
    /// Opaque geometry payload from the backend, when present.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub geometry: Option<serde_json::Value>,
}

/// A detected table, referenced by backend block id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableBlock {
    pub id: String,
    pub confidence: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub geometry: Option<serde_json::Value>,
}

/// A detected form key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormField {
    pub text: String,
    pub confidence: f64,
}

/// Per-class sentiment scores, each in [0,1].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct SentimentScores {
    pub positive: f64,
    pub negative: f64,
    pub neutral: f64,
    pub mixed: f64,
}

impl SentimentScores {
    /// Highest single class score.
    pub fn max(&self) -> f64 {
        self.positive
            .max(self.negative)
            .max(self.neutral)
            .max(self.mixed)
    }
}

/// A detected named entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectedEntity {
    pub text: String,
    #[serde(rename = "type")]
    pub entity_type: String,
    pub confidence: f64,
}

/// A detected key phrase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyPhrase {
    pub text: String,
    pub confidence: f64,
}

/// A detected language with its confidence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectedLanguage {
    pub code: String,
    pub confidence: f64,
}

/// Backend-agnostic processed payload, tagged by analysis family.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProcessedData {
    Ocr {
        text_blocks: Vec<TextBlock>,
        tables: Vec<TableBlock>,
        forms: Vec<FormField>,
    },
    Sentiment {
        sentiment: String,
        confidence_scores: SentimentScores,
    },
    Entities { entities: Vec<DetectedEntity> },
    KeyPhrases { key_phrases: Vec<KeyPhrase> },
    Languages { languages: Vec<DetectedLanguage> },
}

impl ProcessedData {
    /// Concatenated text of all OCR blocks, space separated, in stored order.
    /// Returns `None` for non-OCR payloads.
    pub fn joined_text(&self) -> Option<String> {
        match self {
            Self::Ocr { text_blocks, .. } => Some(
                text_blocks
                    .iter()
                    .map(|b| b.text.as_str())
                    .collect::<Vec<_>>()
                    .join(" "),
            ),
            _ => None,
        }
    }
}

/// Processing context recorded alongside every result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ResultMetadata {
    /// Wall-clock seconds from job start to completion.
    pub processing_time_secs: f64,
    /// Backend request identifier, when the backend reports one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backend_request_id: Option<String>,
    /// Length of the source text handed to an NLP backend.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text_length: Option<usize>,
    /// Set when the OCR backend could not process every page.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_partial: bool,
    /// Backend status message accompanying a partial result.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub partial_message: Option<String>,
    /// Backend warnings accompanying a partial result.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

/// The immutable outcome of one completed analysis job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisResult {
    /// Unique identifier.
    pub id: String,
    /// Owning document.
    pub document_id: String,
    /// Mirrors the job kind tag ("ocr_text", "nlp_sentiment", ...).
    pub analysis_type: String,
    /// Raw backend payload, preserved verbatim for audit.
    pub raw: serde_json::Value,
    /// Normalized, backend-agnostic form.
    pub processed: ProcessedData,
    /// Derived scalar confidence in [0,1], when computable.
    pub confidence: Option<f64>,
    /// Processing context.
    pub metadata: ResultMetadata,
    /// When the result was created.
    pub created_at: DateTime<Utc>,
}

impl AnalysisResult {
    pub fn new(
        document_id: String,
        analysis_type: &str,
        raw: serde_json::Value,
        processed: ProcessedData,
        confidence: Option<f64>,
        metadata: ResultMetadata,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            document_id,
            analysis_type: analysis_type.to_string(),
            raw,
            processed,
            confidence,
            metadata,
            created_at: Utc::now(),
        }
    }

    pub fn is_ocr_result(&self) -> bool {
        self.analysis_type.starts_with("ocr_")
    }

    pub fn is_nlp_result(&self) -> bool {
        self.analysis_type.starts_with("nlp_")
    }

    /// Whether the derived confidence clears the 0.8 display threshold.
    pub fn has_high_confidence(&self) -> bool {
        self.confidence.is_some_and(|c| c >= 0.8)
    }
}
