//! Storage module - Durable object store client and image persistence

pub mod client;
pub mod durable;
pub mod traits;

pub use client::StorageClient;
pub use durable::{persist_image, PersistError};
pub use traits::{ObjectMetadata, ObjectStore};

/// Deterministic object key for a record's image
pub fn image_key(id: &str) -> String {
    format!("images/{}.png", id)
}
