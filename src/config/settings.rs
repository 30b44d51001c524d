//! Application settings and configuration management

use crate::error::{AppError, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Root configuration structure
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Settings {
    pub server: ServerConfig,
    pub generation: GenerationConfig,
    pub storage: StorageConfig,
    pub records: RecordsConfig,
    pub rate_limit: RateLimitConfig,
    pub cors: CorsConfig,
    pub logging: LoggingConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

/// Text and image generation configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GenerationConfig {
    /// "live" calls the upstream APIs, "dummy" serves canned content
    #[serde(default = "default_mode")]
    pub mode: String,
    #[serde(default = "default_api_base")]
    pub api_base: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_text_model")]
    pub text_model: String,
    #[serde(default = "default_image_model")]
    pub image_model: String,
    /// 16:9 landscape, sized for social-card rendering
    #[serde(default = "default_image_size")]
    pub image_size: String,
    #[serde(default = "default_image_quality")]
    pub image_quality: String,
    #[serde(default = "default_image_style")]
    pub image_style: String,
    #[serde(default = "default_timeout")]
    pub timeout_ms: u64,
}

fn default_mode() -> String {
    "live".to_string()
}

fn default_api_base() -> String {
    "https://api.openai.com".to_string()
}

fn default_text_model() -> String {
    "gpt-4o".to_string()
}

fn default_image_model() -> String {
    "dall-e-3".to_string()
}

fn default_image_size() -> String {
    "1792x1024".to_string()
}

fn default_image_quality() -> String {
    "hd".to_string()
}

fn default_image_style() -> String {
    "natural".to_string()
}

fn default_timeout() -> u64 {
    60000
}

/// Durable object store configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    pub base_url: String,
    pub bucket: String,
    #[serde(default)]
    pub auth_token: String,
    /// Static image used when generation or storage fails entirely
    #[serde(default = "default_placeholder_path")]
    pub placeholder_path: String,
    #[serde(default = "default_timeout")]
    pub timeout_ms: u64,
}

fn default_placeholder_path() -> String {
    "/images/fallback-background.jpg".to_string()
}

/// Record service configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RecordsConfig {
    pub base_url: String,
    #[serde(default = "default_records_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_records_timeout_secs() -> u64 {
    30
}

/// Rate limiting configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RateLimitConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_rps")]
    pub requests_per_second: u32,
    #[serde(default = "default_burst")]
    pub burst_size: u32,
}

fn default_true() -> bool {
    true
}

fn default_rps() -> u32 {
    5
}

fn default_burst() -> u32 {
    10
}

/// CORS configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CorsConfig {
    #[serde(default)]
    pub allowed_origins: Vec<String>,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "json".to_string()
}

impl Settings {
    /// Load settings from configuration files and environment variables
    pub fn load() -> Result<Self> {
        Self::load_from_path("config/default.toml")
    }

    /// Load settings from a specific configuration file path
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config = Config::builder()
            // Start with default values
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8080)?
            .set_default("generation.mode", "live")?
            .set_default("storage.base_url", "")?
            .set_default("storage.bucket", "")?
            .set_default("records.base_url", "")?
            .set_default("rate_limit.enabled", true)?
            // Load from configuration file
            .add_source(File::with_name(path.as_ref().to_str().unwrap_or("config/default")).required(false))
            // Override with environment variables (prefixed with KOTONONE_)
            .add_source(
                Environment::with_prefix("KOTONONE")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let settings: Settings = config.try_deserialize()?;
        Ok(settings)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(AppError::Config(config::ConfigError::Message(
                "Server port cannot be 0".to_string(),
            )));
        }

        if !["live", "dummy"].contains(&self.generation.mode.as_str()) {
            return Err(AppError::Config(config::ConfigError::Message(format!(
                "Invalid generation mode '{}'. Must be 'live' or 'dummy'",
                self.generation.mode
            ))));
        }

        if self.generation.mode == "live" && self.generation.api_key.is_empty() {
            return Err(AppError::Config(config::ConfigError::Message(
                "generation.api_key is required in live mode".to_string(),
            )));
        }

        if self.storage.bucket.is_empty() {
            return Err(AppError::Config(config::ConfigError::Message(
                "storage.bucket cannot be empty".to_string(),
            )));
        }

        if self.records.base_url.is_empty() {
            return Err(AppError::Config(config::ConfigError::Message(
                "records.base_url cannot be empty".to_string(),
            )));
        }

        Ok(())
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: default_host(),
                port: default_port(),
            },
            generation: GenerationConfig {
                mode: default_mode(),
                api_base: default_api_base(),
                api_key: String::new(),
                text_model: default_text_model(),
                image_model: default_image_model(),
                image_size: default_image_size(),
                image_quality: default_image_quality(),
                image_style: default_image_style(),
                timeout_ms: default_timeout(),
            },
            storage: StorageConfig {
                base_url: String::new(),
                bucket: String::new(),
                auth_token: String::new(),
                placeholder_path: default_placeholder_path(),
                timeout_ms: default_timeout(),
            },
            records: RecordsConfig {
                base_url: String::new(),
                timeout_secs: default_records_timeout_secs(),
            },
            rate_limit: RateLimitConfig {
                enabled: true,
                requests_per_second: default_rps(),
                burst_size: default_burst(),
            },
            cors: CorsConfig {
                allowed_origins: vec![],
            },
            logging: LoggingConfig {
                level: default_log_level(),
                format: default_log_format(),
            },
        }
    }
}
