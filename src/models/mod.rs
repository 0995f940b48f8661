//! Data models for the document analysis pipeline.

mod analysis;
mod document;
mod job;

pub use analysis::{
    AnalysisResult, DetectedEntity, DetectedLanguage, FormField, KeyPhrase, ProcessedData,
    ResultMetadata, SentimentScores, TableBlock, TextBlock,
};
pub use document::{Document, DocumentKind, ProcessingStatus};
pub use job::{ExecutionMode, FeatureType, JobKind, JobStatus, ProcessingJob};
