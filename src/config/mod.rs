//! Configuration module

pub mod settings;

pub use settings::{
    CorsConfig, GenerationConfig, LoggingConfig, RateLimitConfig, RecordsConfig, ServerConfig,
    Settings, StorageConfig,
};
