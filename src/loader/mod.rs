//! Image loader - three-tier fallback for displaying a record's image
//!
//! Given a record id, the loader tries a direct blob fetch through the
//! store API (no cross-origin restrictions), then a tokened download URL,
//! and finally reports `Error` so the caller renders the static gradient
//! placeholder. Whichever reference is obtained gets validated by decoding
//! it as an image within a bounded time budget.

pub mod blob;

pub use blob::BlobHandle;

use bytes::Bytes;
use reqwest::Client;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};

use crate::storage::{image_key, ObjectStore};

/// Terminal fallback reference, always renderable, never fails
pub const PLACEHOLDER: &str = "/assets/placeholder-gradient.svg";

/// Validation budget when the loader resolved the reference itself
pub const PRIMARY_DECODE_BUDGET: Duration = Duration::from_secs(15);

/// Validation budget for caller-supplied references (legacy path)
pub const LEGACY_DECODE_BUDGET: Duration = Duration::from_secs(12);

/// How the displayed reference was obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadMethod {
    Direct,
    SignedUrl,
    LegacyUrl,
}

impl LoadMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            LoadMethod::Direct => "direct",
            LoadMethod::SignedUrl => "signed-url",
            LoadMethod::LegacyUrl => "legacy-url",
        }
    }
}

/// A successfully loaded image reference plus its telemetry
#[derive(Debug, Clone)]
pub struct LoadedImage {
    /// `blob:` reference for direct loads, a fetchable URL otherwise
    pub reference: String,
    pub method: LoadMethod,
    /// Byte size, recorded for direct loads only
    pub size: Option<usize>,
    pub elapsed: Duration,
}

/// Loader state machine
#[derive(Debug, Clone)]
pub enum LoadState {
    Idle,
    Loading,
    Loaded(LoadedImage),
    Error,
}

impl LoadState {
    pub fn is_loaded(&self) -> bool {
        matches!(self, LoadState::Loaded(_))
    }

    /// The reference a caller should render: the loaded image, or the
    /// placeholder for every other state
    pub fn display_reference(&self) -> &str {
        match self {
            LoadState::Loaded(image) => &image.reference,
            _ => PLACEHOLDER,
        }
    }
}

/// Image loader bound to one display surface.
///
/// At most one blob handle is held at a time; starting a new load or
/// resetting releases the previous one exactly once.
pub struct ImageLoader {
    store: Arc<dyn ObjectStore>,
    client: Client,
    state: LoadState,
    handle: Option<BlobHandle>,
}

impl ImageLoader {
    pub fn new(store: Arc<dyn ObjectStore>, client: Client) -> Self {
        Self {
            store,
            client,
            state: LoadState::Idle,
            handle: None,
        }
    }

    pub fn state(&self) -> &LoadState {
        &self.state
    }

    /// The blob handle backing a direct load, if any
    pub fn handle(&self) -> Option<&BlobHandle> {
        self.handle.as_ref()
    }

    /// Release any held blob and return to `Idle`
    pub fn reset(&mut self) {
        self.release_handle();
        self.state = LoadState::Idle;
    }

    /// Load the image for a record id through the fallback chain
    pub async fn load(&mut self, id: &str) -> &LoadState {
        let start = Instant::now();
        self.begin();

        let key = image_key(id);

        // Tier 1: direct blob fetch through the store API
        let direct = self.store.get_blob(&key).await;
        match direct {
            Ok(bytes) if !bytes.is_empty() => {
                self.state = self.finish_direct(id, bytes, start);
                return &self.state;
            }
            Ok(_) => {
                warn!(id = %id, "Direct blob fetch returned empty body");
            }
            Err(e) => {
                warn!(id = %id, error = %e, "Direct blob fetch failed");
            }
        }

        // Tier 2: tokened download URL, fetched like any external image
        let signed = self.store.download_url(&key).await;
        match signed {
            Ok(url) => {
                self.state = self
                    .validate_url(&url, LoadMethod::SignedUrl, PRIMARY_DECODE_BUDGET, start)
                    .await;
            }
            Err(e) => {
                warn!(id = %id, error = %e, "Download URL resolution failed");
                self.state = LoadState::Error;
            }
        }

        if matches!(self.state, LoadState::Error) {
            info!(
                id = %id,
                elapsed_ms = start.elapsed().as_millis() as u64,
                "Image load failed, caller renders placeholder"
            );
        }

        &self.state
    }

    /// Legacy path: the caller already has a reference, validate it only
    pub async fn load_url(&mut self, url: &str) -> &LoadState {
        let start = Instant::now();
        self.begin();

        self.state = self
            .validate_url(url, LoadMethod::LegacyUrl, LEGACY_DECODE_BUDGET, start)
            .await;
        &self.state
    }

    fn begin(&mut self) {
        // A new load supersedes the previous display; its blob goes now.
        self.release_handle();
        self.state = LoadState::Loading;
    }

    fn release_handle(&mut self) {
        if let Some(mut handle) = self.handle.take() {
            handle.release();
        }
    }

    fn finish_direct(&mut self, id: &str, bytes: Bytes, start: Instant) -> LoadState {
        if detect_image_format(&bytes).is_none() {
            warn!(id = %id, size = bytes.len(), "Direct blob is not a decodable image");
            return LoadState::Error;
        }

        let handle = BlobHandle::new(bytes);
        let loaded = LoadedImage {
            reference: handle.object_url().to_string(),
            method: LoadMethod::Direct,
            size: Some(handle.size()),
            elapsed: start.elapsed(),
        };

        info!(
            id = %id,
            method = loaded.method.as_str(),
            size = handle.size(),
            elapsed_ms = loaded.elapsed.as_millis() as u64,
            "Image loaded"
        );

        self.handle = Some(handle);
        LoadState::Loaded(loaded)
    }

    async fn validate_url(
        &self,
        url: &str,
        method: LoadMethod,
        budget: Duration,
        start: Instant,
    ) -> LoadState {
        match tokio::time::timeout(budget, self.fetch_bytes(url)).await {
            Ok(Ok(bytes)) if detect_image_format(&bytes).is_some() => {
                let loaded = LoadedImage {
                    reference: url.to_string(),
                    method,
                    size: None,
                    elapsed: start.elapsed(),
                };
                info!(
                    method = method.as_str(),
                    elapsed_ms = loaded.elapsed.as_millis() as u64,
                    "Image loaded"
                );
                LoadState::Loaded(loaded)
            }
            Ok(Ok(bytes)) => {
                warn!(method = method.as_str(), size = bytes.len(), "Reference is not a decodable image");
                LoadState::Error
            }
            Ok(Err(e)) => {
                warn!(method = method.as_str(), error = %e, "Reference fetch failed");
                LoadState::Error
            }
            Err(_) => {
                warn!(
                    method = method.as_str(),
                    budget_ms = budget.as_millis() as u64,
                    "Image validation timed out"
                );
                LoadState::Error
            }
        }
    }

    async fn fetch_bytes(&self, url: &str) -> reqwest::Result<Bytes> {
        let response = self.client.get(url).send().await?.error_for_status()?;
        response.bytes().await
    }
}

impl Drop for ImageLoader {
    fn drop(&mut self) {
        self.release_handle();
    }
}

/// Detect image format from binary data using magic bytes
pub fn detect_image_format(data: &[u8]) -> Option<&'static str> {
    if data.len() < 8 {
        return None;
    }

    // PNG: 89 50 4E 47 0D 0A 1A 0A
    if data.starts_with(&[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A]) {
        return Some("png");
    }

    // JPEG: FF D8 FF
    if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
        return Some("jpg");
    }

    // GIF: GIF87a or GIF89a
    if data.starts_with(b"GIF87a") || data.starts_with(b"GIF89a") {
        return Some("gif");
    }

    // WebP: RIFF....WEBP
    if data.len() >= 12 && data.starts_with(b"RIFF") && &data[8..12] == b"WEBP" {
        return Some("webp");
    }

    None
}
