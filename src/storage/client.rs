//! HTTP client for a Firebase-Storage-style object store API

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::debug;

use crate::config::StorageConfig;
use crate::error::{AppError, Result};
use crate::storage::traits::{ObjectMetadata, ObjectStore};

/// Object store client speaking the bucket REST API:
/// raw-body upload, `alt=media` download, and token-based download URLs.
pub struct StorageClient {
    client: Client,
    base_url: String,
    bucket: String,
    auth_token: String,
}

/// Object metadata document returned by upload and metadata requests
#[derive(Debug, Deserialize)]
struct ObjectInfo {
    #[serde(default)]
    name: String,
    #[serde(rename = "downloadTokens", default)]
    download_tokens: Option<String>,
}

impl StorageClient {
    /// Create a new client from configuration
    pub fn new(config: &StorageConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            bucket: config.bucket.clone(),
            auth_token: config.auth_token.clone(),
        })
    }

    fn object_url(&self, key: &str) -> String {
        format!(
            "{}/b/{}/o/{}",
            self.base_url,
            self.bucket,
            encode_key(key)
        )
    }

    fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        if self.auth_token.is_empty() {
            request
        } else {
            request.bearer_auth(&self.auth_token)
        }
    }

    /// Build the tokened public URL for an object from its metadata
    fn tokened_url(&self, key: &str, info: &ObjectInfo) -> Result<String> {
        let token = info
            .download_tokens
            .as_deref()
            .and_then(|t| t.split(',').next())
            .filter(|t| !t.is_empty())
            .ok_or_else(|| AppError::Storage(format!("no download token for '{}'", key)))?;

        Ok(format!("{}?alt=media&token={}", self.object_url(key), token))
    }
}

#[async_trait]
impl ObjectStore for StorageClient {
    async fn upload(&self, key: &str, bytes: Bytes, metadata: &ObjectMetadata) -> Result<String> {
        let url = format!(
            "{}/b/{}/o?uploadType=media&name={}",
            self.base_url,
            self.bucket,
            encode_key(key)
        );

        debug!(key = %key, size = bytes.len(), "Uploading object");

        let response = self
            .authorized(self.client.post(&url))
            .header("Content-Type", metadata.content_type.clone())
            .body(bytes)
            .send()
            .await
            .map_err(|e| AppError::Storage(format!("upload failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(AppError::Storage(format!(
                "upload of '{}' returned {}",
                key,
                response.status()
            )));
        }

        let info: ObjectInfo = response
            .json()
            .await
            .map_err(|e| AppError::Storage(format!("invalid upload response: {}", e)))?;

        // Custom metadata goes in a follow-up patch; the raw-body upload
        // only carries the content type.
        if !metadata.custom.is_empty() {
            let custom: serde_json::Map<String, serde_json::Value> = metadata
                .custom
                .iter()
                .map(|(k, v)| (k.clone(), serde_json::Value::String(v.clone())))
                .collect();

            let patch = self
                .authorized(self.client.patch(self.object_url(key)))
                .json(&json!({
                    "contentType": metadata.content_type,
                    "metadata": custom,
                }))
                .send()
                .await
                .map_err(|e| AppError::Storage(format!("metadata patch failed: {}", e)))?;

            if !patch.status().is_success() {
                return Err(AppError::Storage(format!(
                    "metadata patch for '{}' returned {}",
                    key,
                    patch.status()
                )));
            }
        }

        debug!(key = %key, name = %info.name, "Upload complete");
        self.tokened_url(key, &info)
    }

    async fn get_blob(&self, key: &str) -> Result<Bytes> {
        let url = format!("{}?alt=media", self.object_url(key));

        let response = self
            .authorized(self.client.get(&url))
            .send()
            .await
            .map_err(|e| AppError::Storage(format!("blob fetch failed: {}", e)))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(AppError::NotFound(format!("object '{}'", key)));
        }

        if !response.status().is_success() {
            return Err(AppError::Storage(format!(
                "blob fetch of '{}' returned {}",
                key,
                response.status()
            )));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| AppError::Storage(format!("blob read failed: {}", e)))?;

        debug!(key = %key, size = bytes.len(), "Blob fetched");
        Ok(bytes)
    }

    async fn download_url(&self, key: &str) -> Result<String> {
        let response = self
            .authorized(self.client.get(self.object_url(key)))
            .send()
            .await
            .map_err(|e| AppError::Storage(format!("metadata fetch failed: {}", e)))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(AppError::NotFound(format!("object '{}'", key)));
        }

        if !response.status().is_success() {
            return Err(AppError::Storage(format!(
                "metadata fetch of '{}' returned {}",
                key,
                response.status()
            )));
        }

        let info: ObjectInfo = response
            .json()
            .await
            .map_err(|e| AppError::Storage(format!("invalid metadata response: {}", e)))?;

        self.tokened_url(key, &info)
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        match self.download_url(key).await {
            Ok(_) => Ok(true),
            Err(AppError::NotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }
}

/// Percent-encode an object key for use as a single path segment.
/// Keys are ASCII ids and slashes, so only the reserved characters the
/// bucket API cares about need escaping.
fn encode_key(key: &str) -> String {
    let mut encoded = String::with_capacity(key.len());
    for byte in key.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                encoded.push(byte as char)
            }
            _ => encoded.push_str(&format!("%{:02X}", byte)),
        }
    }
    encoded
}
