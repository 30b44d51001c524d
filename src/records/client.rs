//! HTTP client for the record service

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::RecordsConfig;
use crate::error::{AppError, Result};
use crate::records::types::{NewPoemRecord, PoemRecord};

/// Trait for the poem record store
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Persist a record in one atomic write and return its id
    async fn save(&self, record: &NewPoemRecord) -> Result<String>;

    /// Fetch a record by id; unknown ids are `Ok(None)`, never an error
    async fn fetch(&self, id: &str) -> Result<Option<PoemRecord>>;

    /// Whether the record service is reachable
    async fn health(&self) -> bool;
}

/// Client for the hosted record service.
///
/// Every call has a fixed timeout (30 s in production config) and aborts
/// the in-flight request on expiry, surfacing a timeout-specific error so
/// callers can distinguish "slow" from "broken".
pub struct RecordServiceClient {
    client: Client,
    health_client: Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
struct ServiceResponse<T> {
    success: bool,
    #[serde(default)]
    data: Option<T>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SavedRecord {
    id: String,
}

impl RecordServiceClient {
    /// Create a new client from configuration
    pub fn new(config: &RecordsConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        // Health probes get a much shorter budget than data calls
        let health_client = Client::builder()
            .timeout(Duration::from_secs(5))
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            health_client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn map_request_error(e: reqwest::Error, what: &str) -> AppError {
        if e.is_timeout() {
            AppError::Timeout(format!("record service {}", what))
        } else {
            AppError::Storage(format!("record service {} failed: {}", what, e))
        }
    }
}

#[async_trait]
impl RecordStore for RecordServiceClient {
    async fn save(&self, record: &NewPoemRecord) -> Result<String> {
        let start = std::time::Instant::now();
        let url = format!("{}/savePoem", self.base_url);

        let response = self
            .client
            .post(&url)
            .json(record)
            .send()
            .await
            .map_err(|e| Self::map_request_error(e, "save"))?;

        if !response.status().is_success() {
            let status = response.status();
            let body: ServiceResponse<SavedRecord> = response
                .json()
                .await
                .unwrap_or(ServiceResponse { success: false, data: None, error: None });
            warn!(status = %status, error = ?body.error, "Record save rejected");
            return Err(AppError::Storage(format!(
                "record save returned {}",
                status
            )));
        }

        let body: ServiceResponse<SavedRecord> = response
            .json()
            .await
            .map_err(|e| AppError::Storage(format!("invalid save response: {}", e)))?;

        let saved = body
            .data
            .filter(|_| body.success)
            .ok_or_else(|| AppError::Storage("record save reported failure".to_string()))?;

        info!(
            id = %saved.id,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Record saved"
        );

        Ok(saved.id)
    }

    async fn fetch(&self, id: &str) -> Result<Option<PoemRecord>> {
        let start = std::time::Instant::now();
        let url = format!("{}/getPoem", self.base_url);

        let response = self
            .client
            .get(&url)
            .query(&[("id", id)])
            .send()
            .await
            .map_err(|e| Self::map_request_error(e, "fetch"))?;

        if response.status() == StatusCode::NOT_FOUND {
            debug!(id = %id, "Record not found");
            return Ok(None);
        }

        if !response.status().is_success() {
            return Err(AppError::Storage(format!(
                "record fetch returned {}",
                response.status()
            )));
        }

        let body: ServiceResponse<PoemRecord> = response
            .json()
            .await
            .map_err(|e| AppError::Storage(format!("invalid fetch response: {}", e)))?;

        let record = body
            .data
            .filter(|_| body.success)
            .ok_or_else(|| AppError::Storage("record fetch reported failure".to_string()))?;

        debug!(
            id = %id,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Record fetched"
        );

        Ok(Some(record))
    }

    async fn health(&self) -> bool {
        let url = format!("{}/healthCheck", self.base_url);

        match self.health_client.get(&url).send().await {
            Ok(response) if response.status().is_success() => true,
            Ok(response) => {
                warn!(status = %response.status(), "Record service health check failed");
                false
            }
            Err(e) => {
                warn!(error = %e, "Record service health check failed");
                false
            }
        }
    }
}
