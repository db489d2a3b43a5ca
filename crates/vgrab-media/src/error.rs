//! Error types for media operations.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for media operations.
pub type MediaResult<T> = Result<T, MediaError>;

/// Errors that can occur while driving the extractor.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("yt-dlp not found: {0}")]
    YtDlpNotFound(String),

    #[error("FFmpeg not found in PATH")]
    FfmpegNotFound,

    #[error("yt-dlp exited with an error: {message}")]
    YtDlpFailed {
        message: String,
        stderr: Option<String>,
        exit_code: Option<i32>,
    },

    #[error("{0}")]
    MetadataFailed(String),

    #[error("{message}")]
    DownloadFailed { message: String },

    #[error("Downloaded file not found in {0}")]
    ArtifactNotFound(PathBuf),

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Operation timed out after {0} seconds")]
    Timeout(u64),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),
}

impl MediaError {
    /// Create a yt-dlp process failure error.
    pub fn ytdlp_failed(
        message: impl Into<String>,
        stderr: Option<String>,
        exit_code: Option<i32>,
    ) -> Self {
        Self::YtDlpFailed {
            message: message.into(),
            stderr,
            exit_code,
        }
    }

    /// Create a download failure error.
    pub fn download_failed(message: impl Into<String>) -> Self {
        Self::DownloadFailed {
            message: message.into(),
        }
    }

    /// Create a metadata failure error.
    pub fn metadata_failed(message: impl Into<String>) -> Self {
        Self::MetadataFailed(message.into())
    }
}
