//! Router assembly

use axum::{
    http::{header, HeaderValue, Method},
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::warn;

use crate::api::handlers;
use crate::middleware::rate_limit::RateLimitLayer;
use crate::AppState;

/// Build the application router
pub fn create_router(state: Arc<AppState>) -> Router {
    let mut poems = Router::new()
        .route(
            "/api/poems",
            post(handlers::create_poem).get(handlers::poem_info),
        )
        .route("/api/poems/:id", get(handlers::get_poem))
        .route("/api/poems/:id/image", get(handlers::get_poem_image));

    if state.settings.rate_limit.enabled {
        poems = poems.layer(RateLimitLayer::new(
            state.settings.rate_limit.requests_per_second,
            state.settings.rate_limit.burst_size,
        ));
    }

    Router::new()
        .merge(poems)
        .route("/health", get(handlers::health))
        .nest_service("/assets", ServeDir::new("public"))
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(Duration::from_secs(60)))
        .layer(cors_layer(&state.settings.cors.allowed_origins))
        .with_state(state)
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    if allowed_origins.is_empty() {
        return layer.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "Skipping unparseable CORS origin");
                None
            }
        })
        .collect();

    layer.allow_origin(origins)
}
