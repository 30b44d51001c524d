//! kotonone - poem generation service
//!
//! Accepts an emotional theme, generates a short poem and matching
//! artwork through hosted generation APIs, copies the artwork into a
//! durable object store, and persists the result as a shareable record.

pub mod api;
pub mod config;
pub mod error;
pub mod generation;
pub mod loader;
pub mod middleware;
pub mod pipeline;
pub mod records;
pub mod storage;

pub use error::{AppError, Result};

use std::sync::Arc;

use pipeline::GenerationPipeline;
use records::RecordStore;
use storage::ObjectStore;

/// Application state shared across all handlers
pub struct AppState {
    pub settings: config::Settings,
    pub pipeline: GenerationPipeline,
    pub store: Arc<dyn ObjectStore>,
    pub records: Arc<dyn RecordStore>,
    /// Client used by per-request image loaders for validation fetches
    pub loader_client: reqwest::Client,
}
