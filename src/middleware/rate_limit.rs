//! Rate limiting middleware using the Governor crate
//!
//! Poem creation fans out into paid generation calls, so the creation
//! routes get a small fixed budget per instance.

use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use futures::future::BoxFuture;
use governor::{
    clock::DefaultClock,
    middleware::NoOpMiddleware,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter,
};
use std::{
    num::NonZeroU32,
    sync::Arc,
    task::{Context, Poll},
};
use tower::{Layer, Service};
use tracing::warn;

use crate::error::ErrorResponse;

type SharedRateLimiter = Arc<RateLimiter<NotKeyed, InMemoryState, DefaultClock, NoOpMiddleware>>;

/// Rate limiting layer
#[derive(Clone)]
pub struct RateLimitLayer {
    limiter: SharedRateLimiter,
}

impl RateLimitLayer {
    pub fn new(requests_per_second: u32, burst_size: u32) -> Self {
        let quota = Quota::per_second(
            NonZeroU32::new(requests_per_second).unwrap_or(NonZeroU32::new(5).unwrap()),
        )
        .allow_burst(NonZeroU32::new(burst_size).unwrap_or(NonZeroU32::new(10).unwrap()));

        let limiter = Arc::new(RateLimiter::direct(quota));

        Self { limiter }
    }
}

impl<S> Layer<S> for RateLimitLayer {
    type Service = RateLimitMiddleware<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RateLimitMiddleware {
            inner,
            limiter: self.limiter.clone(),
        }
    }
}

/// Rate limiting middleware service
#[derive(Clone)]
pub struct RateLimitMiddleware<S> {
    inner: S,
    limiter: SharedRateLimiter,
}

impl<S> Service<Request<Body>> for RateLimitMiddleware<S>
where
    S: Service<Request<Body>, Response = Response> + Send + Clone + 'static,
    S::Future: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, request: Request<Body>) -> Self::Future {
        // Only creation spends upstream quota; reads pass through
        if request.method() != Method::POST {
            let future = self.inner.call(request);
            return Box::pin(async move { future.await });
        }

        match self.limiter.check() {
            Ok(_) => {
                let future = self.inner.call(request);
                Box::pin(async move { future.await })
            }
            Err(_) => {
                warn!(path = %request.uri().path(), "Rate limit exceeded");
                Box::pin(async move { Ok(create_rate_limit_error_response()) })
            }
        }
    }
}

fn create_rate_limit_error_response() -> Response {
    let body = ErrorResponse {
        success: false,
        error: "リクエストが多すぎます。しばらく待ってから再試行してください".to_string(),
    };

    (StatusCode::TOO_MANY_REQUESTS, Json(body)).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_limit_layer_creation() {
        let layer = RateLimitLayer::new(5, 10);
        assert!(layer.limiter.check().is_ok());
    }

    #[test]
    fn test_burst_exhaustion() {
        let layer = RateLimitLayer::new(1, 2);
        assert!(layer.limiter.check().is_ok());
        assert!(layer.limiter.check().is_ok());
        assert!(layer.limiter.check().is_err());
    }
}
