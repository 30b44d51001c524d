//! HTTP handlers for the poems API

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Redirect, Response},
    Json,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, info};

use crate::api::ApiResponse;
use crate::error::{AppError, Result};
use crate::loader::{ImageLoader, LoadMethod, LoadState, PLACEHOLDER};
use crate::pipeline::CreatedPoem;
use crate::records::PoemRecord;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct CreatePoemRequest {
    #[serde(default)]
    pub theme: Option<String>,
}

/// POST /api/poems - run the generation pipeline for a theme
pub async fn create_poem(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreatePoemRequest>,
) -> Result<(StatusCode, Json<ApiResponse<CreatedPoem>>)> {
    let theme = payload
        .theme
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| AppError::Validation("theme is missing or empty".to_string()))?;

    info!(theme = %theme, "Poem creation requested");

    let created = state.pipeline.create(theme).await?;

    Ok((StatusCode::CREATED, Json(ApiResponse::ok(created))))
}

/// GET /api/poems - usage info
pub async fn poem_info() -> Json<serde_json::Value> {
    debug!("API info requested");

    Json(json!({
        "message": "🌸 kotonone 詩生成API",
        "usage": "POST /api/poems with { \"theme\": \"your_theme\" }",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// GET /api/poems/{id} - fetch one record
pub async fn get_poem(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<PoemRecord>>> {
    if id.trim().is_empty() {
        return Err(AppError::Validation("id is empty".to_string()));
    }

    let record = state
        .records
        .fetch(&id)
        .await?
        .ok_or_else(|| AppError::NotFound(id))?;

    Ok(Json(ApiResponse::ok(record)))
}

/// GET /api/poems/{id}/image - serve the record's image through the
/// loader fallback chain
pub async fn get_poem_image(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Response {
    let mut loader = ImageLoader::new(state.store.clone(), state.loader_client.clone());

    let loaded = loader.load(&id).await.clone();
    match loaded {
        LoadState::Loaded(image) if image.method == LoadMethod::Direct => {
            // Bytes are local; hand them out directly
            match loader.handle().and_then(|h| h.bytes()).cloned() {
                Some(bytes) => {
                    ([(header::CONTENT_TYPE, "image/png")], bytes).into_response()
                }
                None => Redirect::temporary(PLACEHOLDER).into_response(),
            }
        }
        LoadState::Loaded(image) => Redirect::temporary(&image.reference).into_response(),
        _ => Redirect::temporary(PLACEHOLDER).into_response(),
    }
}

/// GET /health - static liveness payload, no side effects
pub async fn health() -> Json<serde_json::Value> {
    Json(json!({
        "success": true,
        "message": "kotonone API is running!",
        "timestamp": Utc::now().to_rfc3339(),
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
