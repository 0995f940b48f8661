//! Pipeline configuration.
//!
//! Loaded from an optional TOML file; every field has a default so the
//! pipeline runs with no configuration at all.

use std::path::Path;

use serde::{Deserialize, Serialize};

/// Size above which PDFs switch to asynchronous OCR analysis (5 MiB).
pub const DEFAULT_ASYNC_THRESHOLD_BYTES: u64 = 5 * 1024 * 1024;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Bucket documents are uploaded into.
    pub bucket: String,
    /// Key prefix for uploaded documents.
    pub upload_prefix: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            bucket: "documents".to_string(),
            upload_prefix: "uploads".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessingConfig {
    /// File size threshold for async OCR analysis.
    pub async_threshold_bytes: u64,
    /// Delay between polls of an async OCR job.
    pub poll_interval_ms: u64,
    /// Upper bound on polls before an async OCR job is abandoned.
    pub max_poll_attempts: u32,
    /// Language code passed to NLP operations that require one.
    pub default_language: String,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            async_threshold_bytes: DEFAULT_ASYNC_THRESHOLD_BYTES,
            poll_interval_ms: 2_000,
            max_poll_attempts: 150,
            default_language: "en".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub storage: StorageConfig,
    pub processing: ProcessingConfig,
}

impl Config {
    /// Load configuration from a TOML file, or defaults when `path` is
    /// `None` or the file does not exist.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        match path {
            Some(p) if p.exists() => {
                let raw = std::fs::read_to_string(p)?;
                let config = toml::from_str(&raw)?;
                tracing::debug!(path = %p.display(), "loaded configuration");
                Ok(config)
            }
            Some(p) => {
                tracing::warn!(path = %p.display(), "config file not found, using defaults");
                Ok(Self::default())
            }
            None => Ok(Self::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.storage.bucket, "documents");
        assert_eq!(
            config.processing.async_threshold_bytes,
            5 * 1024 * 1024
        );
        assert_eq!(config.processing.default_language, "en");
    }

    #[test]
    fn test_load_partial_toml_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[processing]\nasync_threshold_bytes = 1048576\n\n[storage]\nbucket = \"archive\"\n"
        )
        .unwrap();

        let config = Config::load(Some(file.path())).unwrap();
        assert_eq!(config.processing.async_threshold_bytes, 1024 * 1024);
        assert_eq!(config.storage.bucket, "archive");
        // Unspecified fields fall back to defaults.
        assert_eq!(config.processing.poll_interval_ms, 2_000);
        assert_eq!(config.storage.upload_prefix, "uploads");
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let config = Config::load(Some(Path::new("/nonexistent/docpipe.toml"))).unwrap();
        assert_eq!(config.storage.bucket, "documents");
    }
}
