//! Prometheus metrics for the API server.

use std::time::Instant;

use axum::body::Body;
use axum::http::{Request, Response};
use axum::middleware::Next;
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use vgrab_models::FormatChoice;

/// Initialize the Prometheus metrics recorder.
/// Returns a handle that can be used to render metrics.
pub fn init_metrics() -> Result<PrometheusHandle, BuildError> {
    PrometheusBuilder::new().install_recorder()
}

/// Metric names as constants for consistency.
pub mod names {
    // HTTP metrics
    pub const HTTP_REQUESTS_TOTAL: &str = "vgrab_http_requests_total";
    pub const HTTP_REQUEST_DURATION_SECONDS: &str = "vgrab_http_request_duration_seconds";
    pub const HTTP_REQUESTS_IN_FLIGHT: &str = "vgrab_http_requests_in_flight";

    // Extractor metrics
    pub const PREVIEWS_TOTAL: &str = "vgrab_previews_total";
    pub const PREVIEW_DURATION_SECONDS: &str = "vgrab_preview_duration_seconds";
    pub const DOWNLOADS_TOTAL: &str = "vgrab_downloads_total";
    pub const DOWNLOAD_DURATION_SECONDS: &str = "vgrab_download_duration_seconds";
    pub const ARTIFACT_SIZE_BYTES: &str = "vgrab_artifact_size_bytes";

    // Rate limiting metrics
    pub const RATE_LIMIT_HITS_TOTAL: &str = "vgrab_rate_limit_hits_total";
}

/// Record an HTTP request.
pub fn record_http_request(method: &str, path: &str, status: u16, duration_secs: f64) {
    let labels = [
        ("method", method.to_string()),
        ("path", sanitize_path(path)),
        ("status", status.to_string()),
    ];

    counter!(names::HTTP_REQUESTS_TOTAL, &labels).increment(1);
    histogram!(names::HTTP_REQUEST_DURATION_SECONDS, &labels).record(duration_secs);
}

/// Record a metadata lookup.
pub fn record_preview(outcome: &str, duration_secs: f64) {
    let labels = [("outcome", outcome.to_string())];
    counter!(names::PREVIEWS_TOTAL, &labels).increment(1);
    histogram!(names::PREVIEW_DURATION_SECONDS, &labels).record(duration_secs);
}

/// Record a finished download attempt.
pub fn record_download(format_label: &str, outcome: &str, duration_secs: f64) {
    let labels = [
        ("format", format_metric_label(format_label).to_string()),
        ("outcome", outcome.to_string()),
    ];
    counter!(names::DOWNLOADS_TOTAL, &labels).increment(1);
    histogram!(names::DOWNLOAD_DURATION_SECONDS, &labels).record(duration_secs);
}

/// Record the size of a delivered file.
pub fn record_artifact_size(bytes: u64) {
    histogram!(names::ARTIFACT_SIZE_BYTES).record(bytes as f64);
}

/// Record rate limit hit.
pub fn record_rate_limit_hit(endpoint: &str) {
    let labels = [("endpoint", sanitize_path(endpoint))];
    counter!(names::RATE_LIMIT_HITS_TOTAL, &labels).increment(1);
}

/// Bounded label for a user-supplied format label.
fn format_metric_label(label: &str) -> &'static str {
    match FormatChoice::from_label(label) {
        Some(FormatChoice::BestQuality) => "best_quality",
        Some(FormatChoice::Mp4Video) => "mp4_video",
        Some(FormatChoice::Mp3Audio) => "mp3_audio",
        Some(FormatChoice::Hd720) => "hd720",
        Some(FormatChoice::Sd480) => "sd480",
        None => "other",
    }
}

/// Sanitize path for metrics labels.
///
/// Unknown paths collapse into one label so scanners hitting random URLs
/// can't blow up label cardinality.
fn sanitize_path(path: &str) -> String {
    const KNOWN: &[&str] = &[
        "/",
        "/api/formats",
        "/api/session",
        "/api/session/time-range",
        "/api/preview",
        "/api/download",
        "/api/download/progress",
        "/api/download/cancel",
        "/health",
        "/healthz",
        "/ready",
        "/metrics",
    ];

    if KNOWN.contains(&path) {
        path.to_string()
    } else {
        "other".to_string()
    }
}

/// Metrics middleware for HTTP requests.
pub async fn metrics_middleware(request: Request<Body>, next: Next) -> Response<Body> {
    let method = request.method().to_string();
    let path = request.uri().path().to_string();
    let start = Instant::now();

    // Increment in-flight counter
    gauge!(names::HTTP_REQUESTS_IN_FLIGHT).increment(1.0);

    let response = next.run(request).await;

    // Decrement in-flight counter
    gauge!(names::HTTP_REQUESTS_IN_FLIGHT).decrement(1.0);

    let status = response.status().as_u16();
    let duration = start.elapsed().as_secs_f64();

    record_http_request(&method, &path, status, duration);

    response
}
