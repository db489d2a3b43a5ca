//! API routes.

use std::sync::Arc;

use axum::http::StatusCode;
use axum::middleware;
use axum::routing::{get, post, put};
use axum::Router;
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;

use crate::handlers::{
    cancel_download, download, download_progress, get_session, health, index, list_formats,
    preview, ready, set_time_range,
};
use crate::metrics::metrics_middleware;
use crate::middleware::{
    cors_layer, rate_limit_middleware, request_id, request_logging, security_headers,
    RateLimiterCache,
};
use crate::state::AppState;

/// Create the API router.
pub fn create_router(state: AppState, metrics_handle: Option<PrometheusHandle>) -> Router {
    // Quick JSON endpoints share the request timeout
    let session_routes = Router::new()
        .route("/formats", get(list_formats))
        .route("/session", get(get_session))
        .route("/session/time-range", put(set_time_range))
        .route("/download/progress", get(download_progress))
        .route("/download/cancel", post(cancel_download))
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            state.config.request_timeout,
        ));

    // Extractor-backed endpoints are bounded by their own process timeouts
    let extractor_routes = Router::new()
        .route("/preview", post(preview))
        .route("/download", post(download));

    let rate_limiter = Arc::new(
        RateLimiterCache::new(state.config.rate_limit_rps, state.config.rate_limit_burst)
            .with_trusted_proxy(state.config.trust_proxy_headers),
    );

    let api_routes = Router::new()
        .merge(session_routes)
        .merge(extractor_routes)
        .layer(middleware::from_fn_with_state(
            rate_limiter,
            rate_limit_middleware,
        ));

    let page_routes = Router::new().route("/", get(index));

    let health_routes = Router::new()
        .route("/health", get(health))
        .route("/healthz", get(health))
        .route("/ready", get(ready));

    // Metrics endpoint (if enabled)
    let metrics_routes = if let Some(handle) = metrics_handle {
        Router::new().route("/metrics", get(move || async move { handle.render() }))
    } else {
        Router::new()
    };

    Router::new()
        .nest("/api", api_routes)
        .merge(page_routes)
        .merge(health_routes)
        .merge(metrics_routes)
        .layer(RequestBodyLimitLayer::new(state.config.max_body_size))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(middleware::from_fn(security_headers))
        .layer(middleware::from_fn(request_id))
        .layer(middleware::from_fn(request_logging))
        .layer(cors_layer(&state.config.cors_origins))
        .with_state(state)
}
