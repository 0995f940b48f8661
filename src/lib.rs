//! Document analysis pipeline.
//!
//! Ingests uploaded documents into object storage, plans analysis jobs per
//! document type, runs them asynchronously against pluggable OCR and NLP
//! backends, and aggregates the results until the document completes.

pub mod backends;
pub mod cli;
pub mod config;
pub mod error;
pub mod models;
pub mod notify;
pub mod processing;
pub mod repository;
pub mod storage;

pub use config::Config;
pub use error::{NlpError, OcrError, PipelineError, StorageError};
pub use processing::Pipeline;
