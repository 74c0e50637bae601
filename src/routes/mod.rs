//! HTTP route handlers.
//!
//! Only `GET /` (and the implied `HEAD /`) is served. Every other path, and
//! every other method on `/`, falls through to a plain-text 404.
//!
//! Request tracing is enabled via middleware that assigns a request ID to
//! each incoming request, allowing correlation of all logs within a request.

pub mod hello;

use std::time::Duration;

use axum::{extract::Request, http::StatusCode, middleware, routing::get, Router};
use http::header::{HeaderValue, CACHE_CONTROL};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::timeout::TimeoutLayer;

use crate::config::{HttpServerConfig, CACHE_CONTROL_NO_STORE};
use crate::error::AppError;
use crate::middleware::request_id_layer;

/// Fallback for unmatched paths and methods.
async fn not_found(request: Request) -> AppError {
    AppError::NotFound {
        method: request.method().clone(),
        path: request.uri().path().to_string(),
    }
}

/// Creates the Axum router with all routes and hardening layers.
pub fn create_router(config: &HttpServerConfig) -> Router {
    let routes = Router::new()
        .route("/", get(hello::index).fallback(not_found))
        .fallback(not_found);
    with_layers(routes, config)
}

/// Wrap `router` in the response header, body limit, timeout and request ID
/// layers every route shares.
pub fn with_layers(router: Router, config: &HttpServerConfig) -> Router {
    router
        // Nothing behind this router should be cached by health checkers or proxies
        .layer(SetResponseHeaderLayer::if_not_present(
            CACHE_CONTROL,
            HeaderValue::from_static(CACHE_CONTROL_NO_STORE),
        ))
        .layer(RequestBodyLimitLayer::new(config.max_body_bytes))
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            Duration::from_secs(config.request_timeout_seconds),
        ))
        // Request ID middleware - creates root span with request_id for correlation
        .layer(middleware::from_fn(request_id_layer))
}
