//! Input validation for user-supplied video URLs.
//!
//! The extractor supports a long list of sites, so there is no domain
//! whitelist. What is rejected is anything that is not plain http(s) and
//! anything pointing at internal or metadata endpoints (SSRF protection).

use std::sync::LazyLock;

use regex::Regex;
use tracing::warn;
use url::Url;

/// Maximum URL length to prevent DoS attacks.
pub const MAX_URL_LENGTH: usize = 2048;

/// Blocked URL patterns (sensitive endpoints).
static BLOCKED_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        // Internal IP ranges
        r"^https?://127\.",
        r"^https?://localhost",
        r"^https?://0\.0\.0\.0",
        r"^https?://10\.",
        r"^https?://172\.(1[6-9]|2[0-9]|3[0-1])\.",
        r"^https?://192\.168\.",
        r"^https?://169\.254\.",
        r"^https?://\[::1\]",
        r"^https?://\[fd",
        r"^https?://\[fe80",
        // Cloud metadata endpoints
        r"^https?://metadata\.",
        r"^https?://metadata\.google\.internal",
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).expect("valid blocked-url regex"))
    .collect()
});

/// Result of URL validation.
#[derive(Debug, PartialEq, Eq)]
pub enum UrlValidationResult {
    /// URL is valid and allowed (trimmed).
    Valid(String),
    /// Nothing was entered.
    Empty,
    /// URL is malformed or uses an unsupported protocol.
    Invalid(String),
    /// URL matches a blocked pattern (e.g., internal IPs).
    Blocked(String),
    /// URL exceeds maximum length.
    TooLong,
}

impl UrlValidationResult {
    /// Convert to Result for easy error handling.
    pub fn into_result(self) -> Result<String, String> {
        match self {
            Self::Valid(url) => Ok(url),
            Self::Empty => Err("Please enter a video URL".to_string()),
            Self::Invalid(msg) => Err(msg),
            Self::Blocked(reason) => Err(reason),
            Self::TooLong => Err(format!(
                "URL exceeds maximum length of {} characters",
                MAX_URL_LENGTH
            )),
        }
    }
}

/// Validate a video URL.
///
/// This function performs:
/// - Empty and length checks
/// - Protocol validation (only http/https)
/// - Blocked pattern check (internal IPs, metadata endpoints)
pub fn validate_video_url(url: &str) -> UrlValidationResult {
    let url = url.trim();
    if url.is_empty() {
        return UrlValidationResult::Empty;
    }

    if url.len() > MAX_URL_LENGTH {
        return UrlValidationResult::TooLong;
    }

    let parsed = match Url::parse(url) {
        Ok(u) => u,
        Err(e) => return UrlValidationResult::Invalid(format!("Invalid URL format: {}", e)),
    };

    match parsed.scheme() {
        "http" | "https" => {}
        scheme => {
            return UrlValidationResult::Invalid(format!(
                "Invalid protocol '{}'. Only HTTP and HTTPS are allowed.",
                scheme
            ))
        }
    }

    if parsed.host_str().map_or(true, str::is_empty) {
        return UrlValidationResult::Invalid("URL must have a valid domain".to_string());
    }

    // Match against the normalized form so case and userinfo tricks don't slip through
    let normalized = format!(
        "{}://{}",
        parsed.scheme(),
        parsed.host_str().unwrap_or_default().to_lowercase()
    );
    for pattern in BLOCKED_PATTERNS.iter() {
        if pattern.is_match(&normalized) {
            warn!(url = %url, "Blocked URL pattern detected");
            return UrlValidationResult::Blocked(
                "URL appears to target an internal or restricted endpoint".to_string(),
            );
        }
    }

    UrlValidationResult::Valid(url.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_urls() {
        assert_eq!(
            validate_video_url("  https://www.youtube.com/watch?v=dQw4w9WgXcQ "),
            UrlValidationResult::Valid("https://www.youtube.com/watch?v=dQw4w9WgXcQ".to_string())
        );
        assert!(matches!(
            validate_video_url("https://vimeo.com/123456789"),
            UrlValidationResult::Valid(_)
        ));
        // No whitelist: any public site is handed to the extractor
        assert!(matches!(
            validate_video_url("https://some-obscure-site.example/watch/42"),
            UrlValidationResult::Valid(_)
        ));
    }

    #[test]
    fn test_empty_url() {
        assert_eq!(validate_video_url(""), UrlValidationResult::Empty);
        assert_eq!(validate_video_url("   "), UrlValidationResult::Empty);
    }

    #[test]
    fn test_blocked_internal_ips() {
        for url in [
            "http://127.0.0.1/video.mp4",
            "http://localhost:8080/video.mp4",
            "http://192.168.1.1/video.mp4",
            "http://10.0.0.5/x",
            "http://169.254.169.254/latest/meta-data/",
            "http://[::1]/x",
            "http://metadata.google.internal/computeMetadata/v1/",
            "http://user@127.0.0.1/x",
            "HTTP://LOCALHOST/x",
        ] {
            assert!(
                matches!(validate_video_url(url), UrlValidationResult::Blocked(_)),
                "expected {} to be blocked",
                url
            );
        }
    }

    #[test]
    fn test_invalid_protocols() {
        assert!(matches!(
            validate_video_url("ftp://youtube.com/video"),
            UrlValidationResult::Invalid(_)
        ));
        assert!(matches!(
            validate_video_url("javascript:alert(1)"),
            UrlValidationResult::Invalid(_)
        ));
        assert!(matches!(
            validate_video_url("file:///etc/passwd"),
            UrlValidationResult::Invalid(_)
        ));
        assert!(matches!(
            validate_video_url("not a url"),
            UrlValidationResult::Invalid(_)
        ));
    }

    #[test]
    fn test_too_long() {
        let url = format!("https://youtube.com/watch?v={}", "a".repeat(MAX_URL_LENGTH));
        assert_eq!(validate_video_url(&url), UrlValidationResult::TooLong);
    }
}
