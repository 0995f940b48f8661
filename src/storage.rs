//! Object storage capability.
//!
//! Uploaded documents live in a bucket addressed by opaque keys. The pipeline
//! only consumes this capability; the real backing store is a collaborator.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::error::StorageError;

/// Metadata recorded with each stored object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectMetadata {
    pub content_type: String,
    pub size: u64,
    pub uploaded_at: DateTime<Utc>,
    pub user_metadata: HashMap<String, String>,
}

/// Capability contract for object storage.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Store bytes under a fresh key below `path_hint`, returning the key.
    async fn upload(
        &self,
        content: &[u8],
        path_hint: &str,
        filename: &str,
        content_type: &str,
        metadata: HashMap<String, String>,
    ) -> Result<String, StorageError>;

    /// Fetch the stored bytes for a key.
    async fn download(&self, key: &str) -> Result<Vec<u8>, StorageError>;

    async fn delete(&self, key: &str) -> Result<bool, StorageError>;

    async fn exists(&self, key: &str) -> Result<bool, StorageError>;

    /// Public (unsigned) URL for a key.
    fn url(&self, key: &str) -> String;

    /// Time-limited signed URL for a key.
    async fn signed_url(&self, key: &str, expiration_minutes: u32) -> Result<String, StorageError>;

    async fn copy(&self, source_key: &str, destination_key: &str) -> Result<bool, StorageError>;

    /// Metadata for a key, or `None` when the object does not exist.
    async fn metadata(&self, key: &str) -> Result<Option<ObjectMetadata>, StorageError>;
}

/// In-memory object store for development and tests.
pub struct MemoryStore {
    bucket: String,
    objects: RwLock<HashMap<String, (Vec<u8>, ObjectMetadata)>>,
}

impl MemoryStore {
    pub fn new(bucket: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            objects: RwLock::new(HashMap::new()),
        }
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn upload(
        &self,
        content: &[u8],
        path_hint: &str,
        filename: &str,
        content_type: &str,
        metadata: HashMap<String, String>,
    ) -> Result<String, StorageError> {
        if content.is_empty() {
            return Err(StorageError::InvalidFile("empty upload".to_string()));
        }

        // Keys are "{hint}/{uuid}.{ext}" so concurrent uploads of the same
        // filename never collide.
        let extension = filename.rsplit('.').next().unwrap_or("bin");
        let key = format!("{}/{}.{}", path_hint, uuid::Uuid::new_v4(), extension);

        let meta = ObjectMetadata {
            content_type: content_type.to_string(),
            size: content.len() as u64,
            uploaded_at: Utc::now(),
            user_metadata: metadata,
        };
        self.objects
            .write()
            .await
            .insert(key.clone(), (content.to_vec(), meta));
        Ok(key)
    }

    async fn download(&self, key: &str) -> Result<Vec<u8>, StorageError> {
        self.objects
            .read()
            .await
            .get(key)
            .map(|(content, _)| content.clone())
            .ok_or_else(|| StorageError::NotFound(key.to_string()))
    }

    async fn delete(&self, key: &str) -> Result<bool, StorageError> {
        Ok(self.objects.write().await.remove(key).is_some())
    }

    async fn exists(&self, key: &str) -> Result<bool, StorageError> {
        Ok(self.objects.read().await.contains_key(key))
    }

    fn url(&self, key: &str) -> String {
        format!("memory://{}/{}", self.bucket, key)
    }

    async fn signed_url(&self, key: &str, expiration_minutes: u32) -> Result<String, StorageError> {
        if !self.exists(key).await? {
            return Err(StorageError::NotFound(key.to_string()));
        }
        Ok(format!(
            "memory://{}/{}?expires_in={}m",
            self.bucket, key, expiration_minutes
        ))
    }

    async fn copy(&self, source_key: &str, destination_key: &str) -> Result<bool, StorageError> {
        let mut objects = self.objects.write().await;
        let entry = objects
            .get(source_key)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(source_key.to_string()))?;
        objects.insert(destination_key.to_string(), entry);
        Ok(true)
    }

    async fn metadata(&self, key: &str) -> Result<Option<ObjectMetadata>, StorageError> {
        Ok(self
            .objects
            .read()
            .await
            .get(key)
            .map(|(_, meta)| meta.clone()))
    }
}
