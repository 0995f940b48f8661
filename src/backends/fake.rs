//! Fake analysis backends for development and tests.
//!
//! These return deterministic canned payloads so the full pipeline can run
//! without credentials. Tests override the canned data and inject failures.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::{NlpError, OcrError};
use crate::models::{DetectedEntity, DetectedLanguage, FeatureType, KeyPhrase, SentimentScores};

use super::nlp::{
    EntitiesOutput, KeyPhrasesOutput, LanguagesOutput, NlpBackend, SentimentLabel, SentimentOutput,
};
use super::ocr::{Block, BlockType, EntityRole, OcrBackend, OcrOutput, OcrPoll};

/// Fake OCR backend with canned line blocks.
pub struct FakeOcrBackend {
    blocks: Vec<Block>,
    fail_message: Option<String>,
    partial_message: Option<String>,
    warnings: Vec<String>,
    /// Polls an async job reports `InProgress` before finishing.
    polls_until_ready: u32,
    /// Blocks returned per async result page.
    page_size: usize,
    jobs: Mutex<HashMap<String, u32>>,
    job_counter: AtomicU32,
}

impl Default for FakeOcrBackend {
    fn default() -> Self {
        Self {
            blocks: vec![
                Block::line("This is fake extracted text from the document.", 99.5),
                Block::line("Lorem ipsum dolor sit amet, consectetur adipiscing elit.", 98.7),
                Block::line("This simulates OCR text extraction for development.", 97.3),
            ],
            fail_message: None,
            partial_message: None,
            warnings: Vec::new(),
            polls_until_ready: 1,
            page_size: 100,
            jobs: Mutex::new(HashMap::new()),
            job_counter: AtomicU32::new(0),
        }
    }
}

impl FakeOcrBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the canned block list.
    pub fn with_blocks(mut self, blocks: Vec<Block>) -> Self {
        self.blocks = blocks;
        self
    }

    /// Make every call fail with the given message.
    pub fn with_failure(mut self, message: impl Into<String>) -> Self {
        self.fail_message = Some(message.into());
        self
    }

    /// Report results as partial with a status message and warnings.
    pub fn with_partial(mut self, message: impl Into<String>, warnings: Vec<String>) -> Self {
        self.partial_message = Some(message.into());
        self.warnings = warnings;
        self
    }

    /// Number of `InProgress` polls before an async job completes.
    pub fn with_polls_until_ready(mut self, polls: u32) -> Self {
        self.polls_until_ready = polls;
        self
    }

    /// Blocks per async result page (exercises pagination aggregation).
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    fn check_failure(&self) -> Result<(), OcrError> {
        match &self.fail_message {
            Some(msg) => Err(OcrError::Backend(msg.clone())),
            None => Ok(()),
        }
    }

    fn table_and_form_blocks() -> Vec<Block> {
        vec![
            Block {
                block_type: BlockType::Table,
                id: Some("table-1".to_string()),
                text: None,
                confidence: Some(95.0),
                geometry: None,
                entity_types: Vec::new(),
            },
            Block {
                block_type: BlockType::KeyValueSet,
                id: Some("kv-1".to_string()),
                text: Some("Name".to_string()),
                confidence: Some(93.0),
                geometry: None,
                entity_types: vec![EntityRole::Key],
            },
        ]
    }

    fn start_job(&self) -> String {
        let n = self.job_counter.fetch_add(1, Ordering::SeqCst);
        let job_id = format!("fake-job-{n}");
        self.jobs.lock().unwrap().insert(job_id.clone(), 0);
        job_id
    }

    fn poll_job(&self, job_id: &str, next_token: Option<&str>) -> Result<OcrPoll, OcrError> {
        self.check_failure()?;

        // Continuation pages are available immediately once the job is done.
        let offset = match next_token {
            Some(token) => token
                .parse::<usize>()
                .map_err(|_| OcrError::Backend(format!("bad continuation token: {token}")))?,
            None => {
                let mut jobs = self.jobs.lock().unwrap();
                let polls = jobs
                    .get_mut(job_id)
                    .ok_or_else(|| OcrError::JobNotFound(job_id.to_string()))?;
                *polls += 1;
                if *polls <= self.polls_until_ready {
                    return Ok(OcrPoll::InProgress);
                }
                0
            }
        };

        let end = (offset + self.page_size).min(self.blocks.len());
        let next_token = (end < self.blocks.len()).then(|| end.to_string());
        Ok(OcrPoll::Page {
            blocks: self.blocks[offset..end].to_vec(),
            next_token,
            request_id: Some(format!("req-{job_id}")),
            is_partial: self.partial_message.is_some(),
            status_message: self.partial_message.clone(),
            warnings: self.warnings.clone(),
        })
    }
}

#[async_trait]
impl OcrBackend for FakeOcrBackend {
    async fn detect_text(&self, key: &str, bucket: &str) -> Result<OcrOutput, OcrError> {
        self.check_failure()?;
        tracing::debug!(key, bucket, "fake OCR text detection");
        Ok(OcrOutput {
            blocks: self.blocks.clone(),
            request_id: Some("fake-request-text".to_string()),
        })
    }

    async fn analyze(
        &self,
        key: &str,
        bucket: &str,
        features: &[FeatureType],
    ) -> Result<OcrOutput, OcrError> {
        self.check_failure()?;
        tracing::debug!(key, bucket, ?features, "fake OCR analysis");
        let mut blocks = self.blocks.clone();
        if features.contains(&FeatureType::Tables) || features.contains(&FeatureType::Forms) {
            blocks.extend(Self::table_and_form_blocks());
        }
        Ok(OcrOutput {
            blocks,
            request_id: Some("fake-request-analysis".to_string()),
        })
    }

    async fn start_text_detection(&self, key: &str, bucket: &str) -> Result<String, OcrError> {
        self.check_failure()?;
        tracing::debug!(key, bucket, "fake async text detection started");
        Ok(self.start_job())
    }

    async fn get_text_detection(
        &self,
        job_id: &str,
        next_token: Option<&str>,
    ) -> Result<OcrPoll, OcrError> {
        self.poll_job(job_id, next_token)
    }

    async fn start_analysis(
        &self,
        key: &str,
        bucket: &str,
        features: &[FeatureType],
    ) -> Result<String, OcrError> {
        self.check_failure()?;
        tracing::debug!(key, bucket, ?features, "fake async analysis started");
        Ok(self.start_job())
    }

    async fn get_analysis(
        &self,
        job_id: &str,
        next_token: Option<&str>,
    ) -> Result<OcrPoll, OcrError> {
        self.poll_job(job_id, next_token)
    }
}

/// Fake NLP backend with canned detections.
pub struct FakeNlpBackend {
    sentiment: SentimentLabel,
    scores: SentimentScores,
    entities: Vec<DetectedEntity>,
    key_phrases: Vec<KeyPhrase>,
    languages: Vec<DetectedLanguage>,
    fail_message: Option<String>,
}

impl Default for FakeNlpBackend {
    fn default() -> Self {
        Self {
            sentiment: SentimentLabel::Positive,
            scores: SentimentScores {
                positive: 0.75,
                negative: 0.10,
                neutral: 0.12,
                mixed: 0.03,
            },
            entities: vec![
                DetectedEntity {
                    text: "John Doe".to_string(),
                    entity_type: "PERSON".to_string(),
                    confidence: 0.98,
                },
                DetectedEntity {
                    text: "Sample Company".to_string(),
                    entity_type: "ORGANIZATION".to_string(),
                    confidence: 0.95,
                },
                DetectedEntity {
                    text: "2025-09-14".to_string(),
                    entity_type: "DATE".to_string(),
                    confidence: 0.99,
                },
            ],
            key_phrases: vec![
                KeyPhrase {
                    text: "document processing".to_string(),
                    confidence: 0.98,
                },
                KeyPhrase {
                    text: "machine learning".to_string(),
                    confidence: 0.95,
                },
                KeyPhrase {
                    text: "artificial intelligence".to_string(),
                    confidence: 0.92,
                },
            ],
            languages: vec![
                DetectedLanguage {
                    code: "en".to_string(),
                    confidence: 0.99,
                },
                DetectedLanguage {
                    code: "es".to_string(),
                    confidence: 0.005,
                },
            ],
            fail_message: None,
        }
    }
}

impl FakeNlpBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sentiment(mut self, sentiment: SentimentLabel, scores: SentimentScores) -> Self {
        self.sentiment = sentiment;
        self.scores = scores;
        self
    }

    pub fn with_entities(mut self, entities: Vec<DetectedEntity>) -> Self {
        self.entities = entities;
        self
    }

    pub fn with_key_phrases(mut self, key_phrases: Vec<KeyPhrase>) -> Self {
        self.key_phrases = key_phrases;
        self
    }

    pub fn with_languages(mut self, languages: Vec<DetectedLanguage>) -> Self {
        self.languages = languages;
        self
    }

    /// Make every call fail with the given message.
    pub fn with_failure(mut self, message: impl Into<String>) -> Self {
        self.fail_message = Some(message.into());
        self
    }

    fn check_failure(&self) -> Result<(), NlpError> {
        match &self.fail_message {
            Some(msg) => Err(NlpError::Backend(msg.clone())),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl NlpBackend for FakeNlpBackend {
    async fn detect_sentiment(
        &self,
        text: &str,
        language_code: &str,
    ) -> Result<SentimentOutput, NlpError> {
        self.check_failure()?;
        tracing::debug!(text_length = text.len(), language_code, "fake sentiment detection");
        Ok(SentimentOutput {
            sentiment: self.sentiment,
            scores: self.scores,
            request_id: Some("fake-request-sentiment".to_string()),
        })
    }

    async fn detect_entities(
        &self,
        text: &str,
        language_code: &str,
    ) -> Result<EntitiesOutput, NlpError> {
        self.check_failure()?;
        tracing::debug!(text_length = text.len(), language_code, "fake entity detection");
        Ok(EntitiesOutput {
            entities: self.entities.clone(),
            request_id: Some("fake-request-entities".to_string()),
        })
    }

    async fn detect_key_phrases(
        &self,
        text: &str,
        language_code: &str,
    ) -> Result<KeyPhrasesOutput, NlpError> {
        self.check_failure()?;
        tracing::debug!(text_length = text.len(), language_code, "fake key phrase detection");
        Ok(KeyPhrasesOutput {
            key_phrases: self.key_phrases.clone(),
            request_id: Some("fake-request-key-phrases".to_string()),
        })
    }

    async fn detect_language(&self, text: &str) -> Result<LanguagesOutput, NlpError> {
        self.check_failure()?;
        tracing::debug!(text_length = text.len(), "fake language detection");
        Ok(LanguagesOutput {
            languages: self.languages.clone(),
            request_id: Some("fake-request-language".to_string()),
        })
    }
}
