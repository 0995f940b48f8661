//! Document analysis (OCR) backend capability.
//!
//! The backend extracts text, tables, and form fields from stored documents.
//! Synchronous calls return the full block list; asynchronous calls return a
//! backend job id that is polled for paginated pages of blocks.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::OcrError;
use crate::models::FeatureType;

/// Type tag on a raw OCR block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BlockType {
    Page,
    Line,
    Word,
    Table,
    Cell,
    KeyValueSet,
    /// Anything this pipeline does not interpret.
    #[serde(other)]
    Other,
}

/// Role of a key-value block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntityRole {
    Key,
    Value,
}

/// One raw block as reported by the backend.
///
/// Confidence is a percentage in 0-100; normalization to [0,1] happens in
/// the executor, not here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub block_type: BlockType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub geometry: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub entity_types: Vec<EntityRole>,
}

impl Block {
    /// Convenience constructor for a text line.
    pub fn line(text: impl Into<String>, confidence: f64) -> Self {
        Self {
            block_type: BlockType::Line,
            id: None,
            text: Some(text.into()),
            confidence: Some(confidence),
            geometry: None,
            entity_types: Vec::new(),
        }
    }
}

/// A complete synchronous OCR response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OcrOutput {
    pub blocks: Vec<Block>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

/// One poll of an asynchronous OCR job.
#[derive(Debug, Clone)]
pub enum OcrPoll {
    /// The backend job has not finished yet.
    InProgress,
    /// One page of results. `next_token` is `Some` while more pages remain.
    Page {
        blocks: Vec<Block>,
        next_token: Option<String>,
        request_id: Option<String>,
        /// Set when the backend processed only some pages.
        is_partial: bool,
        status_message: Option<String>,
        warnings: Vec<String>,
    },
}

/// Capability contract for the OCR backend.
#[async_trait]
pub trait OcrBackend: Send + Sync {
    /// Synchronous plain text detection.
    async fn detect_text(&self, key: &str, bucket: &str) -> Result<OcrOutput, OcrError>;

    /// Synchronous structured analysis with the requested features.
    async fn analyze(
        &self,
        key: &str,
        bucket: &str,
        features: &[FeatureType],
    ) -> Result<OcrOutput, OcrError>;

    /// Start asynchronous text detection, returning a backend job id.
    async fn start_text_detection(&self, key: &str, bucket: &str) -> Result<String, OcrError>;

    /// Poll an asynchronous text detection job, optionally fetching a
    /// continuation page.
    async fn get_text_detection(
        &self,
        job_id: &str,
        next_token: Option<&str>,
    ) -> Result<OcrPoll, OcrError>;

    /// Start asynchronous structured analysis, returning a backend job id.
    async fn start_analysis(
        &self,
        key: &str,
        bucket: &str,
        features: &[FeatureType],
    ) -> Result<String, OcrError>;

    /// Poll an asynchronous analysis job, optionally fetching a
    /// continuation page.
    async fn get_analysis(
        &self,
        job_id: &str,
        next_token: Option<&str>,
    ) -> Result<OcrPoll, OcrError>;
}
