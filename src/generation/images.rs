//! Images-generations client

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{info, warn};

use crate::config::GenerationConfig;
use crate::error::{AppError, Result};
use crate::generation::traits::{GeneratedImage, ImageGenerator};

/// HTTP client for an OpenAI-compatible image generation API
pub struct ImagesClient {
    client: Client,
    api_base: String,
    api_key: String,
    model: String,
    size: String,
    quality: String,
    style: String,
}

#[derive(Debug, Serialize)]
struct ImagesRequest {
    model: String,
    prompt: String,
    n: u32,
    size: String,
    quality: String,
    style: String,
}

#[derive(Debug, Deserialize)]
struct ImagesResponse {
    #[serde(default)]
    data: Vec<ImageData>,
}

#[derive(Debug, Deserialize)]
struct ImageData {
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    b64_json: Option<String>,
    #[serde(default)]
    revised_prompt: Option<String>,
}

impl ImagesClient {
    /// Create a new client from configuration
    pub fn new(config: &GenerationConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            model: config.image_model.clone(),
            size: config.image_size.clone(),
            quality: config.image_quality.clone(),
            style: config.image_style.clone(),
        })
    }
}

#[async_trait]
impl ImageGenerator for ImagesClient {
    async fn generate_image(&self, prompt: &str) -> Result<GeneratedImage> {
        let start = std::time::Instant::now();
        let url = format!("{}/v1/images/generations", self.api_base);

        let request = ImagesRequest {
            model: self.model.clone(),
            prompt: prompt.to_string(),
            n: 1,
            size: self.size.clone(),
            quality: self.quality.clone(),
            style: self.style.clone(),
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| AppError::ImageGeneration(format!("image request failed: {}", e)))?;

        // Content-policy and rate-limit rejections are terminal for this
        // attempt; the pipeline falls back instead of retrying.
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            warn!(status = %status, "Image generation returned error");
            return Err(match status {
                StatusCode::BAD_REQUEST => AppError::ImageGeneration(format!(
                    "prompt rejected by content policy: {}",
                    body
                )),
                StatusCode::TOO_MANY_REQUESTS => {
                    AppError::ImageGeneration("rate limit exceeded".to_string())
                }
                _ => AppError::ImageGeneration(format!("upstream returned {}: {}", status, body)),
            });
        }

        let images: ImagesResponse = response
            .json()
            .await
            .map_err(|e| AppError::ImageGeneration(format!("failed to parse response: {}", e)))?;

        let image = images
            .data
            .into_iter()
            .next()
            .map(|img| GeneratedImage {
                url: img.url,
                b64_json: img.b64_json,
                revised_prompt: img.revised_prompt,
            })
            .filter(GeneratedImage::is_usable)
            .ok_or_else(|| AppError::ImageGeneration("no image in response".to_string()))?;

        info!(
            has_url = image.url.is_some(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Image generated"
        );

        Ok(image)
    }
}
