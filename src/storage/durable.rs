//! Durable image persistence - copy a generated image into the object store

use base64::{engine::general_purpose::STANDARD, Engine};
use bytes::Bytes;
use chrono::Utc;
use reqwest::Client;
use thiserror::Error;
use tracing::{debug, info};

use crate::generation::GeneratedImage;
use crate::storage::traits::{ObjectMetadata, ObjectStore};
use crate::storage::image_key;

/// Failure modes of the persistence step. The caller decides the fallback:
/// `SourceFetch` means no bytes were ever obtained, `Storage` means the
/// source is still usable directly.
#[derive(Error, Debug)]
pub enum PersistError {
    #[error("source image fetch failed: {0}")]
    SourceFetch(String),

    #[error("durable store write failed: {0}")]
    Storage(String),
}

/// Copy a generated image into the durable store under `images/{id}.png`
/// and resolve a public URL for it.
///
/// Inline base64 payloads are decoded locally; URL references are fetched
/// from the generator's CDN first. Re-running with the same id overwrites
/// the same key.
pub async fn persist_image(
    store: &dyn ObjectStore,
    fetch: &Client,
    id: &str,
    image: &GeneratedImage,
    source_tag: &str,
) -> Result<String, PersistError> {
    let bytes = obtain_bytes(fetch, image).await?;
    debug!(id = %id, size = bytes.len(), "Obtained source image bytes");

    let metadata = ObjectMetadata::png()
        .with_custom("generated", source_tag)
        .with_custom("uploadedAt", Utc::now().to_rfc3339());

    let key = image_key(id);
    let url = store
        .upload(&key, bytes, &metadata)
        .await
        .map_err(|e| PersistError::Storage(e.to_string()))?;

    info!(id = %id, key = %key, "Image persisted to durable store");
    Ok(url)
}

async fn obtain_bytes(fetch: &Client, image: &GeneratedImage) -> Result<Bytes, PersistError> {
    if let Some(b64) = &image.b64_json {
        let data = STANDARD
            .decode(b64.trim())
            .map_err(|e| PersistError::SourceFetch(format!("invalid base64 payload: {}", e)))?;
        return Ok(Bytes::from(data));
    }

    let url = image
        .url
        .as_deref()
        .ok_or_else(|| PersistError::SourceFetch("no image reference".to_string()))?;

    let response = fetch
        .get(url)
        .send()
        .await
        .map_err(|e| PersistError::SourceFetch(format!("fetch failed: {}", e)))?;

    if !response.status().is_success() {
        return Err(PersistError::SourceFetch(format!(
            "fetch returned {}",
            response.status()
        )));
    }

    let bytes = response
        .bytes()
        .await
        .map_err(|e| PersistError::SourceFetch(format!("read failed: {}", e)))?;

    if bytes.is_empty() {
        return Err(PersistError::SourceFetch("empty response body".to_string()));
    }

    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_obtain_bytes_decodes_base64() {
        let image = GeneratedImage {
            url: None,
            b64_json: Some(STANDARD.encode(b"fake png bytes")),
            revised_prompt: None,
        };
        let bytes = obtain_bytes(&Client::new(), &image).await.unwrap();
        assert_eq!(bytes.as_ref(), b"fake png bytes");
    }

    #[tokio::test]
    async fn test_obtain_bytes_requires_reference() {
        let image = GeneratedImage {
            url: None,
            b64_json: None,
            revised_prompt: None,
        };
        let err = obtain_bytes(&Client::new(), &image).await.unwrap_err();
        assert!(matches!(err, PersistError::SourceFetch(_)));
    }
}
