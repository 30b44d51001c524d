//! Common traits and types for text and image generation

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Generated image data as returned by an image generation API
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratedImage {
    /// Time-limited URL to the image on the generator's CDN
    pub url: Option<String>,

    /// Base64 encoded image data, if the API returned inline bytes
    pub b64_json: Option<String>,

    /// Revised prompt if the model modified it
    pub revised_prompt: Option<String>,
}

impl GeneratedImage {
    /// Whether this result carries anything a caller could render or store
    pub fn is_usable(&self) -> bool {
        self.url.is_some() || self.b64_json.is_some()
    }
}

/// Trait for poem and image-prompt text generation
#[async_trait]
pub trait PoemGenerator: Send + Sync {
    /// Generate a short poem from a user-supplied theme.
    ///
    /// Returns non-empty text or an error; there is no retry.
    async fn generate_poem(&self, theme: &str) -> Result<String>;

    /// Generate an English image-generation prompt from the theme and poem
    async fn generate_image_prompt(&self, theme: &str, poem: &str) -> Result<String>;
}

/// Trait for image generation backends
#[async_trait]
pub trait ImageGenerator: Send + Sync {
    /// Generate one image from a prompt.
    ///
    /// Rate-limit and content-policy rejections are terminal for the
    /// attempt; callers fall back rather than retry.
    async fn generate_image(&self, prompt: &str) -> Result<GeneratedImage>;
}
