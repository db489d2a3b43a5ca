//! API configuration.

use std::path::PathBuf;
use std::time::Duration;

/// API server configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Server host
    pub host: String,
    /// Server port
    pub port: u16,
    /// CORS origins
    pub cors_origins: Vec<String>,
    /// Rate limit requests per second
    pub rate_limit_rps: u32,
    /// Rate limit burst
    pub rate_limit_burst: u32,
    /// Key rate limiting on X-Forwarded-For / X-Real-IP; only safe behind a proxy that sets them
    pub trust_proxy_headers: bool,
    /// Timeout for the lightweight JSON endpoints
    pub request_timeout: Duration,
    /// Max request body size
    pub max_body_size: usize,
    /// Environment (development/production)
    pub environment: String,
    /// yt-dlp binary name or path
    pub ytdlp_path: PathBuf,
    /// Limit for a metadata-only lookup
    pub preview_timeout: Duration,
    /// Limit for a full download including post-processing
    pub download_timeout: Duration,
    /// Parent directory for per-download scratch dirs (system temp if unset)
    pub scratch_dir: Option<PathBuf>,
    /// Idle time after which a session is dropped
    pub session_ttl: Duration,
    /// Largest artifact that will be read into memory
    pub max_artifact_bytes: u64,
    /// Reject ranges whose start is not before their end or that overrun the video
    pub strict_time_range: bool,
    /// Expose Prometheus metrics at /metrics
    pub metrics_enabled: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            cors_origins: vec!["*".to_string()],
            rate_limit_rps: 10,
            rate_limit_burst: 20,
            trust_proxy_headers: false,
            request_timeout: Duration::from_secs(30),
            max_body_size: 64 * 1024, // 64KB
            environment: "development".to_string(),
            ytdlp_path: PathBuf::from("yt-dlp"),
            preview_timeout: Duration::from_secs(60),
            download_timeout: Duration::from_secs(1800),
            scratch_dir: None,
            session_ttl: Duration::from_secs(3600),
            max_artifact_bytes: 2 * 1024 * 1024 * 1024, // 2GB
            strict_time_range: false,
            metrics_enabled: true,
        }
    }
}

impl ApiConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            host: std::env::var("API_HOST").unwrap_or(defaults.host),
            port: env_parse("API_PORT").unwrap_or(defaults.port),
            cors_origins: std::env::var("CORS_ORIGINS")
                .map(|s| s.split(',').map(|s| s.trim().to_string()).collect())
                .unwrap_or(defaults.cors_origins),
            rate_limit_rps: env_parse("RATE_LIMIT_RPS").unwrap_or(defaults.rate_limit_rps),
            rate_limit_burst: env_parse("RATE_LIMIT_BURST").unwrap_or(defaults.rate_limit_burst),
            trust_proxy_headers: env_flag("TRUST_PROXY_HEADERS")
                .unwrap_or(defaults.trust_proxy_headers),
            request_timeout: env_parse("REQUEST_TIMEOUT")
                .map(Duration::from_secs)
                .unwrap_or(defaults.request_timeout),
            max_body_size: env_parse("MAX_BODY_SIZE").unwrap_or(defaults.max_body_size),
            environment: std::env::var("ENVIRONMENT").unwrap_or(defaults.environment),
            ytdlp_path: std::env::var("YTDLP_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.ytdlp_path),
            preview_timeout: env_parse("PREVIEW_TIMEOUT_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.preview_timeout),
            download_timeout: env_parse("DOWNLOAD_TIMEOUT_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.download_timeout),
            scratch_dir: std::env::var("SCRATCH_DIR")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .map(PathBuf::from),
            session_ttl: env_parse("SESSION_TTL_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.session_ttl),
            max_artifact_bytes: env_parse("MAX_ARTIFACT_BYTES")
                .unwrap_or(defaults.max_artifact_bytes),
            strict_time_range: env_flag("STRICT_TIME_RANGE").unwrap_or(defaults.strict_time_range),
            metrics_enabled: env_flag("METRICS_ENABLED").unwrap_or(defaults.metrics_enabled),
        }
    }

    /// Check if running in production mode.
    pub fn is_production(&self) -> bool {
        self.environment.to_lowercase() == "production"
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|s| s.trim().parse().ok())
}

fn env_flag(key: &str) -> Option<bool> {
    std::env::var(key).ok().map(|v| parse_flag(&v))
}

fn parse_flag(value: &str) -> bool {
    matches!(value.trim().to_lowercase().as_str(), "true" | "1" | "yes" | "on")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ApiConfig::default();
        assert_eq!(config.port, 8000);
        assert_eq!(config.preview_timeout, Duration::from_secs(60));
        assert_eq!(config.download_timeout, Duration::from_secs(1800));
        assert_eq!(config.session_ttl, Duration::from_secs(3600));
        assert!(!config.strict_time_range);
        assert!(!config.is_production());
    }

    #[test]
    fn test_parse_flag() {
        assert!(parse_flag("true"));
        assert!(parse_flag(" 1 "));
        assert!(parse_flag("YES"));
        assert!(!parse_flag("false"));
        assert!(!parse_flag("0"));
        assert!(!parse_flag(""));
    }
}
