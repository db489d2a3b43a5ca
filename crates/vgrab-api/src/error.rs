//! API error types.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use vgrab_media::MediaError;
use vgrab_models::TimestampError;

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    InvalidUrl(String),

    #[error("Could not fetch video info: {0}")]
    PreviewFailed(String),

    #[error("{0}")]
    Validation(String),

    #[error("Download failed: {0}")]
    DownloadFailed(String),

    #[error("Downloaded file not found")]
    ArtifactNotFound,

    #[error("Preview the video before downloading")]
    NotReady,

    #[error("{0}")]
    Conflict(String),

    #[error("Operation timed out after {0} seconds")]
    Timeout(u64),

    #[error("Download cancelled")]
    Cancelled,

    #[error("Rate limit exceeded. Please try again later.")]
    RateLimited,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn invalid_url(msg: impl Into<String>) -> Self {
        Self::InvalidUrl(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::InvalidUrl(_) | ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::PreviewFailed(_) | ApiError::DownloadFailed(_) => StatusCode::BAD_GATEWAY,
            ApiError::NotReady | ApiError::Conflict(_) | ApiError::Cancelled => StatusCode::CONFLICT,
            ApiError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            ApiError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            ApiError::ArtifactNotFound | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Machine-readable error code.
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::InvalidUrl(_) => "invalid_url",
            ApiError::PreviewFailed(_) => "preview_failed",
            ApiError::Validation(_) => "invalid_time_range",
            ApiError::DownloadFailed(_) => "download_failed",
            ApiError::ArtifactNotFound => "file_not_found",
            ApiError::NotReady => "not_ready",
            ApiError::Conflict(_) => "conflict",
            ApiError::Timeout(_) => "timeout",
            ApiError::Cancelled => "cancelled",
            ApiError::RateLimited => "rate_limited",
            ApiError::Internal(_) => "internal",
        }
    }
}

impl From<MediaError> for ApiError {
    fn from(err: MediaError) -> Self {
        match err {
            MediaError::MetadataFailed(message) => ApiError::PreviewFailed(message),
            MediaError::JsonParse(e) => ApiError::PreviewFailed(e.to_string()),
            MediaError::DownloadFailed { message } => ApiError::DownloadFailed(message),
            MediaError::YtDlpFailed { message, .. } => ApiError::DownloadFailed(message),
            e @ (MediaError::YtDlpNotFound(_) | MediaError::FfmpegNotFound) => {
                ApiError::DownloadFailed(e.to_string())
            }
            MediaError::ArtifactNotFound(_) => ApiError::ArtifactNotFound,
            MediaError::Cancelled => ApiError::Cancelled,
            MediaError::Timeout(secs) => ApiError::Timeout(secs),
            MediaError::Io(e) => ApiError::Internal(e.to_string()),
        }
    }
}

impl From<TimestampError> for ApiError {
    fn from(err: TimestampError) -> Self {
        ApiError::Validation(err.to_string())
    }
}

/// JSON body of every error response.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub detail: String,
    pub code: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // Don't expose internal error details in production
        let detail = match &self {
            ApiError::Internal(_) => {
                if std::env::var("ENVIRONMENT").unwrap_or_default() == "production" {
                    "An internal error occurred".to_string()
                } else {
                    self.to_string()
                }
            }
            _ => self.to_string(),
        };

        let body = ErrorResponse {
            detail,
            code: self.code().to_string(),
        };

        let mut response = (status, Json(body)).into_response();
        if matches!(self, ApiError::RateLimited) {
            response
                .headers_mut()
                .insert("Retry-After", axum::http::HeaderValue::from_static("1"));
        }
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_status_codes() {
        assert_eq!(ApiError::invalid_url("x").status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::PreviewFailed("x".into()).status_code(), StatusCode::BAD_GATEWAY);
        assert_eq!(ApiError::ArtifactNotFound.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(ApiError::NotReady.status_code(), StatusCode::CONFLICT);
        assert_eq!(ApiError::Timeout(5).status_code(), StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(ApiError::RateLimited.status_code(), StatusCode::TOO_MANY_REQUESTS);
    }

    #[test]
    fn test_media_error_mapping() {
        let err: ApiError = MediaError::metadata_failed("ERROR: Unsupported URL").into();
        assert_eq!(err.code(), "preview_failed");
        assert_eq!(err.to_string(), "Could not fetch video info: ERROR: Unsupported URL");

        let err: ApiError = MediaError::download_failed("ERROR: Requested format is not available").into();
        assert_eq!(err.code(), "download_failed");

        let err: ApiError = MediaError::ArtifactNotFound(PathBuf::from("/tmp/x")).into();
        assert_eq!(err.code(), "file_not_found");

        let err: ApiError = MediaError::Cancelled.into();
        assert_eq!(err.code(), "cancelled");

        let err: ApiError = MediaError::Timeout(1800).into();
        assert_eq!(err.code(), "timeout");
    }

    #[test]
    fn test_timestamp_error_mapping() {
        let err: ApiError = TimestampError::Asymmetric.into();
        assert_eq!(err.code(), "invalid_time_range");
    }
}
