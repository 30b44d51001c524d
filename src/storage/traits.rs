//! Common traits and types for the durable object store

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::Result;

/// Metadata attached to an uploaded object
#[derive(Debug, Clone, Default)]
pub struct ObjectMetadata {
    pub content_type: String,
    /// Custom key/value pairs, e.g. the generation source and upload time
    pub custom: Vec<(String, String)>,
}

impl ObjectMetadata {
    pub fn png() -> Self {
        Self {
            content_type: "image/png".to_string(),
            custom: Vec::new(),
        }
    }

    pub fn with_custom(mut self, key: &str, value: impl Into<String>) -> Self {
        self.custom.push((key.to_string(), value.into()));
        self
    }
}

/// Trait for a durable, overwrite-by-key object store
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Write bytes under a key, overwriting any previous object.
    ///
    /// Returns a durable, publicly fetchable URL for the stored object.
    async fn upload(&self, key: &str, bytes: Bytes, metadata: &ObjectMetadata) -> Result<String>;

    /// Fetch the raw bytes of an object directly through the store API,
    /// bypassing browser cross-origin restrictions
    async fn get_blob(&self, key: &str) -> Result<Bytes>;

    /// Resolve a time-limited, directly fetchable URL for an object
    async fn download_url(&self, key: &str) -> Result<String>;

    /// Whether an object exists under the key
    async fn exists(&self, key: &str) -> Result<bool>;
}
