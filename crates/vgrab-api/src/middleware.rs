//! API middleware.

use std::collections::HashMap;
use std::net::IpAddr;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::body::Body;
use axum::extract::{ConnectInfo, State};
use axum::http::{header, HeaderValue, Method, Request, Response};
use axum::middleware::Next;
use axum::response::IntoResponse;
use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use tokio::sync::RwLock;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn, Span};
use uuid::Uuid;

use crate::error::ApiError;
use crate::metrics;

/// Per-IP rate limiter using governor.
pub type IpRateLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Maximum number of IPs to track in rate limiter cache.
const MAX_RATE_LIMITER_ENTRIES: usize = 10_000;

/// IP-based rate limiter cache with automatic cleanup.
#[derive(Clone)]
pub struct RateLimiterCache {
    limiters: Arc<RwLock<HashMap<IpAddr, (Arc<IpRateLimiter>, Instant)>>>,
    quota: Quota,
    /// Time-to-live for cached rate limiters
    ttl: Duration,
    /// Whether client-supplied forwarding headers identify the caller
    trust_proxy_headers: bool,
}

impl RateLimiterCache {
    /// Create a new rate limiter cache.
    pub fn new(requests_per_second: u32, burst: u32) -> Self {
        let rps = NonZeroU32::new(requests_per_second).unwrap_or(NonZeroU32::MIN);
        let burst = NonZeroU32::new(burst.max(requests_per_second)).unwrap_or(rps);

        Self {
            limiters: Arc::new(RwLock::new(HashMap::new())),
            quota: Quota::per_second(rps).allow_burst(burst),
            ttl: Duration::from_secs(3600),
            trust_proxy_headers: false,
        }
    }

    /// Key clients by `X-Forwarded-For` / `X-Real-IP` instead of the peer address.
    pub fn with_trusted_proxy(mut self, trust: bool) -> Self {
        self.trust_proxy_headers = trust;
        self
    }

    /// Clean up expired rate limiters to prevent memory leaks.
    async fn cleanup_expired(&self) {
        let mut limiters = self.limiters.write().await;
        let now = Instant::now();

        limiters.retain(|_, (_, created_at)| now.duration_since(*created_at) < self.ttl);

        // If still at capacity, remove oldest entries
        if limiters.len() >= MAX_RATE_LIMITER_ENTRIES {
            let mut entries: Vec<_> = limiters.iter().map(|(ip, (_, t))| (*ip, *t)).collect();
            entries.sort_by_key(|(_, t)| *t);

            let to_remove = limiters.len() + 1 - MAX_RATE_LIMITER_ENTRIES;
            for (ip, _) in entries.into_iter().take(to_remove) {
                limiters.remove(&ip);
            }
            warn!("Rate limiter cache exceeded capacity, removed {} entries", to_remove);
        }
    }

    /// Get or create a rate limiter for an IP.
    pub async fn get_limiter(&self, ip: IpAddr) -> Arc<IpRateLimiter> {
        {
            let limiters = self.limiters.read().await;
            if let Some((limiter, _)) = limiters.get(&ip) {
                return Arc::clone(limiter);
            }
        }

        if self.limiters.read().await.len() >= MAX_RATE_LIMITER_ENTRIES {
            self.cleanup_expired().await;
        }

        let mut limiters = self.limiters.write().await;
        // Double-check after acquiring write lock
        if let Some((limiter, _)) = limiters.get(&ip) {
            return Arc::clone(limiter);
        }

        let limiter = Arc::new(RateLimiter::direct(self.quota));
        limiters.insert(ip, (Arc::clone(&limiter), Instant::now()));
        limiter
    }

    /// Check rate limit for an IP.
    pub async fn check(&self, ip: IpAddr) -> bool {
        let limiter = self.get_limiter(ip).await;
        limiter.check().is_ok()
    }
}

/// Create CORS layer.
pub fn cors_layer(origins: &[String]) -> CorsLayer {
    let allowed_headers = [header::CONTENT_TYPE, header::ACCEPT, header::ORIGIN];

    // The download file name travels in Content-Disposition
    let exposed_headers = [
        header::CONTENT_LENGTH,
        header::CONTENT_TYPE,
        header::CONTENT_DISPOSITION,
    ];

    let allowed_methods = [Method::GET, Method::POST, Method::PUT, Method::OPTIONS];

    if origins.iter().any(|o| o == "*") {
        // Wildcard origin - no credentials allowed, can use Any
        CorsLayer::new()
            .allow_methods(Any)
            .allow_headers(Any)
            .expose_headers(exposed_headers)
            .allow_origin(Any)
            .max_age(Duration::from_secs(600))
    } else {
        // Explicit origins - credentials allowed so the session cookie is sent.
        // tower-http panics if you combine credentials with wildcard headers.
        let origins: Vec<HeaderValue> = origins.iter().filter_map(|o| o.parse().ok()).collect();

        CorsLayer::new()
            .allow_methods(allowed_methods)
            .allow_headers(allowed_headers)
            .expose_headers(exposed_headers)
            .allow_credentials(true)
            .allow_origin(origins)
            .max_age(Duration::from_secs(600))
    }
}

/// Security headers middleware.
pub async fn security_headers(request: Request<Body>, next: Next) -> Response<Body> {
    let mut response = next.run(request).await;
    let headers = response.headers_mut();

    headers.insert("X-Content-Type-Options", HeaderValue::from_static("nosniff"));
    headers.insert("X-Frame-Options", HeaderValue::from_static("DENY"));
    headers.insert("Referrer-Policy", HeaderValue::from_static("strict-origin-when-cross-origin"));
    headers.insert(
        "Permissions-Policy",
        HeaderValue::from_static(
            "accelerometer=(), camera=(), geolocation=(), gyroscope=(), magnetometer=(), microphone=(), payment=(), usb=()",
        ),
    );
    // Thumbnails are remote images; everything else is same-origin
    headers.insert(
        "Content-Security-Policy",
        HeaderValue::from_static(
            "default-src 'self'; img-src 'self' https: data:; style-src 'self' 'unsafe-inline'; script-src 'self' 'unsafe-inline'; frame-ancestors 'none'",
        ),
    );
    headers.insert("Cross-Origin-Resource-Policy", HeaderValue::from_static("same-origin"));
    headers.insert("X-Permitted-Cross-Domain-Policies", HeaderValue::from_static("none"));

    response
}

/// Request ID middleware.
pub async fn request_id(mut request: Request<Body>, next: Next) -> Response<Body> {
    // Generate or extract request ID
    let request_id = request
        .headers()
        .get("X-Request-ID")
        .and_then(|v| v.to_str().ok())
        .filter(|s| !s.is_empty() && s.len() <= 128)
        .map(|s| s.to_string())
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    request.extensions_mut().insert(request_id.clone());

    Span::current().record("request_id", &request_id);

    let mut response = next.run(request).await;

    if let Ok(header_value) = request_id.parse() {
        response.headers_mut().insert("X-Request-ID", header_value);
    }

    response
}

/// Request logging middleware.
pub async fn request_logging(request: Request<Body>, next: Next) -> Response<Body> {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let start = Instant::now();

    let response = next.run(request).await;

    let status = response.status();
    let duration = start.elapsed();

    // Skip health check and progress polling noise
    if !matches!(
        uri.path(),
        "/health" | "/healthz" | "/ready" | "/api/download/progress"
    ) {
        info!(
            method = %method,
            uri = %uri,
            status = %status,
            duration_ms = %duration.as_millis(),
            "Request completed"
        );
    }

    response
}

/// Rate limiting middleware using IP-based rate limiter.
pub async fn rate_limit_middleware(
    State(rate_limiter): State<Arc<RateLimiterCache>>,
    request: Request<Body>,
    next: Next,
) -> Response<Body> {
    if let Some(ip) = extract_client_ip(&request, rate_limiter.trust_proxy_headers) {
        if !rate_limiter.check(ip).await {
            warn!(ip = %ip, "Rate limit exceeded");
            metrics::record_rate_limit_hit(request.uri().path());
            return ApiError::RateLimited.into_response();
        }
    }

    next.run(request).await
}

/// Extract client IP from request headers or connection info.
///
/// Forwarding headers are client-controlled, so they are only read when
/// `trust_proxy_headers` is set.
pub fn extract_client_ip(request: &Request<Body>, trust_proxy_headers: bool) -> Option<IpAddr> {
    if trust_proxy_headers {
        if let Some(ip) = forwarded_ip(request) {
            return Some(ip);
        }
    }

    // Fall back to connection info (requires ConnectInfo in the service)
    request
        .extensions()
        .get::<ConnectInfo<std::net::SocketAddr>>()
        .map(|ci| ci.0.ip())
}

fn forwarded_ip(request: &Request<Body>) -> Option<IpAddr> {
    // Try X-Forwarded-For header first (for proxied requests)
    if let Some(forwarded) = request.headers().get("X-Forwarded-For") {
        if let Ok(forwarded_str) = forwarded.to_str() {
            // Take the first IP in the chain (original client)
            if let Some(first_ip) = forwarded_str.split(',').next() {
                if let Ok(ip) = first_ip.trim().parse() {
                    return Some(ip);
                }
            }
        }
    }

    request
        .headers()
        .get("X-Real-IP")
        .and_then(|real_ip| real_ip.to_str().ok())
        .and_then(|real_ip| real_ip.trim().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_client_ip_prefers_forwarded_for() {
        let request = Request::builder()
            .header("X-Forwarded-For", "203.0.113.7, 10.0.0.1")
            .header("X-Real-IP", "198.51.100.2")
            .body(Body::empty())
            .unwrap();
        assert_eq!(extract_client_ip(&request, true), Some("203.0.113.7".parse().unwrap()));
    }

    #[test]
    fn test_extract_client_ip_real_ip_and_missing() {
        let request = Request::builder()
            .header("X-Real-IP", "198.51.100.2")
            .body(Body::empty())
            .unwrap();
        assert_eq!(extract_client_ip(&request, true), Some("198.51.100.2".parse().unwrap()));

        let request = Request::builder().body(Body::empty()).unwrap();
        assert_eq!(extract_client_ip(&request, true), None);
    }

    #[test]
    fn test_extract_client_ip_ignores_headers_when_untrusted() {
        let peer: std::net::SocketAddr = "192.0.2.50:40000".parse().unwrap();
        let request = Request::builder()
            .header("X-Forwarded-For", "203.0.113.7")
            .header("X-Real-IP", "198.51.100.2")
            .extension(ConnectInfo(peer))
            .body(Body::empty())
            .unwrap();
        assert_eq!(extract_client_ip(&request, false), Some(peer.ip()));
        assert_eq!(extract_client_ip(&request, true), Some("203.0.113.7".parse().unwrap()));

        let request = Request::builder()
            .header("X-Forwarded-For", "203.0.113.7")
            .body(Body::empty())
            .unwrap();
        assert_eq!(extract_client_ip(&request, false), None);
    }

    #[tokio::test]
    async fn test_rate_limiter_burst() {
        let cache = RateLimiterCache::new(1, 2);
        let ip: IpAddr = "203.0.113.9".parse().unwrap();

        assert!(cache.check(ip).await);
        assert!(cache.check(ip).await);
        assert!(!cache.check(ip).await);

        // Other clients are unaffected
        assert!(cache.check("203.0.113.10".parse().unwrap()).await);
    }
}
