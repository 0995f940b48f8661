//! Text analysis (NLP) backend capability.
//!
//! All operations are synchronous request/response over plain text. The
//! backend enforces per-operation byte limits, so callers truncate text with
//! [`truncate_utf8`] before dispatching.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::NlpError;
use crate::models::{DetectedEntity, DetectedLanguage, KeyPhrase, SentimentScores};

/// Byte limit for sentiment detection input.
pub const SENTIMENT_MAX_BYTES: usize = 5_000;
/// Byte limit for entity, key phrase, and language detection input.
pub const TEXT_MAX_BYTES: usize = 100_000;

/// Overall sentiment classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SentimentLabel {
    Positive,
    Negative,
    Neutral,
    Mixed,
}

impl SentimentLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Positive => "POSITIVE",
            Self::Negative => "NEGATIVE",
            Self::Neutral => "NEUTRAL",
            Self::Mixed => "MIXED",
        }
    }
}

/// Sentiment detection response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SentimentOutput {
    pub sentiment: SentimentLabel,
    pub scores: SentimentScores,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

/// Entity detection response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntitiesOutput {
    pub entities: Vec<DetectedEntity>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

/// Key phrase detection response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyPhrasesOutput {
    pub key_phrases: Vec<KeyPhrase>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

/// Language detection response, strongest candidates first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LanguagesOutput {
    pub languages: Vec<DetectedLanguage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

/// Capability contract for the NLP backend.
#[async_trait]
pub trait NlpBackend: Send + Sync {
    async fn detect_sentiment(
        &self,
        text: &str,
        language_code: &str,
    ) -> Result<SentimentOutput, NlpError>;

    async fn detect_entities(
        &self,
        text: &str,
        language_code: &str,
    ) -> Result<EntitiesOutput, NlpError>;

    async fn detect_key_phrases(
        &self,
        text: &str,
        language_code: &str,
    ) -> Result<KeyPhrasesOutput, NlpError>;

    async fn detect_language(&self, text: &str) -> Result<LanguagesOutput, NlpError>;
}

/// Truncate text to at most `max_bytes` without splitting a UTF-8 sequence.
///
/// Preserves as much leading content as fits. Returns the input unchanged
/// when it is already within the limit.
pub fn truncate_utf8(text: &str, max_bytes: usize) -> &str {
    if text.len() <= max_bytes {
        return text;
    }
    let mut end = max_bytes;
    while end > 0 && !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}
