//! Common error types for the poem generation service

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Application-wide error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Text generation failed: {0}")]
    Generation(String),

    #[error("Image generation failed: {0}")]
    ImageGeneration(String),

    #[error("Source image fetch failed: {0}")]
    SourceFetch(String),

    #[error("Object store operation failed: {0}")]
    Storage(String),

    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Error response format returned to API clients
#[derive(Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
}

impl AppError {
    /// Short user-facing message. Upstream detail stays in the logs;
    /// clients only ever see one of these.
    fn user_message(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "テーマを入力してください",
            AppError::Generation(_) => "詩の生成中にエラーが発生しました",
            AppError::ImageGeneration(_) => "画像生成中にエラーが発生しました",
            AppError::SourceFetch(_) | AppError::Storage(_) => {
                "データ保存中にエラーが発生しました"
            }
            AppError::NotFound(_) => "指定されたIDの詩が見つかりません",
            AppError::Timeout(_) => "処理がタイムアウトしました",
            _ => "サーバーエラーが発生しました",
        }
    }

    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Json(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            AppError::SourceFetch(_) | AppError::Storage(_) => StatusCode::BAD_GATEWAY,
            AppError::HttpClient(_) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        let body = Json(ErrorResponse {
            success: false,
            error: self.user_message().to_string(),
        });

        (status, body).into_response()
    }
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, AppError>;
