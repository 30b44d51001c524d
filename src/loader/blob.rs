//! Locally-materialized image bytes with a page-scoped reference URL

use bytes::Bytes;
use uuid::Uuid;

/// An in-memory image blob and the `blob:` reference derived from it.
///
/// The handle owns the bytes exclusively. `release` drops them and is
/// idempotent; dropping the handle releases as well, so a handle can
/// never outlive its owner unreleased.
#[derive(Debug)]
pub struct BlobHandle {
    url: String,
    size: usize,
    bytes: Option<Bytes>,
}

impl BlobHandle {
    pub(crate) fn new(bytes: Bytes) -> Self {
        Self {
            url: format!("blob:{}", Uuid::new_v4()),
            size: bytes.len(),
            bytes: Some(bytes),
        }
    }

    /// The locally-scoped reference URL for this blob
    pub fn object_url(&self) -> &str {
        &self.url
    }

    /// Byte size recorded at creation; survives release for telemetry
    pub fn size(&self) -> usize {
        self.size
    }

    /// The underlying bytes, if not yet released
    pub fn bytes(&self) -> Option<&Bytes> {
        self.bytes.as_ref()
    }

    /// Drop the in-memory bytes. Calling this twice is a no-op.
    pub fn release(&mut self) {
        self.bytes = None;
    }

    pub fn is_released(&self) -> bool {
        self.bytes.is_none()
    }
}

impl Drop for BlobHandle {
    fn drop(&mut self) {
        self.release();
    }
}
