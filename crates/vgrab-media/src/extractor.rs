//! Extractor abstraction used by the API layer.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::watch;
use vgrab_models::VideoMetadata;

use crate::command::{YtDlpRunner, DEFAULT_YTDLP_BINARY};
use crate::download::{download_video, DownloadOptions};
use crate::error::MediaResult;
use crate::probe::fetch_metadata;
use crate::progress::ProgressCallback;

/// Runtime hooks for a single download.
#[derive(Default)]
pub struct DownloadControl {
    /// Receives progress snapshots parsed from the tool's output
    pub progress: Option<ProgressCallback>,
    /// Flipping this to `true` kills the tool
    pub cancel: Option<watch::Receiver<bool>>,
}

impl std::fmt::Debug for DownloadControl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DownloadControl")
            .field("progress", &self.progress.is_some())
            .field("cancel", &self.cancel.is_some())
            .finish()
    }
}

/// Something that can describe and fetch media behind a URL.
///
/// Allows dependency injection and testing.
#[async_trait]
pub trait MediaExtractor: Send + Sync {
    /// Fetch the metadata record without downloading media.
    async fn fetch_metadata(&self, url: &str) -> MediaResult<VideoMetadata>;

    /// Download the media according to `options`.
    ///
    /// The artifact lands wherever `options.output_template` points.
    async fn download(
        &self,
        url: &str,
        options: &DownloadOptions,
        control: DownloadControl,
    ) -> MediaResult<()>;
}

/// [`MediaExtractor`] backed by the yt-dlp binary.
#[derive(Debug, Clone)]
pub struct YtDlp {
    binary: PathBuf,
    preview_timeout: Duration,
    download_timeout: Duration,
}

impl Default for YtDlp {
    fn default() -> Self {
        Self::new(DEFAULT_YTDLP_BINARY)
    }
}

impl YtDlp {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            preview_timeout: Duration::from_secs(60),
            download_timeout: Duration::from_secs(1800),
        }
    }

    pub fn with_preview_timeout(mut self, timeout: Duration) -> Self {
        self.preview_timeout = timeout;
        self
    }

    pub fn with_download_timeout(mut self, timeout: Duration) -> Self {
        self.download_timeout = timeout;
        self
    }

    pub fn binary(&self) -> &PathBuf {
        &self.binary
    }
}

#[async_trait]
impl MediaExtractor for YtDlp {
    async fn fetch_metadata(&self, url: &str) -> MediaResult<VideoMetadata> {
        let runner = YtDlpRunner::new(&self.binary).with_timeout(self.preview_timeout);
        fetch_metadata(&runner, url).await
    }

    async fn download(
        &self,
        url: &str,
        options: &DownloadOptions,
        control: DownloadControl,
    ) -> MediaResult<()> {
        let mut runner = YtDlpRunner::new(&self.binary).with_timeout(self.download_timeout);
        if let Some(cancel) = control.cancel {
            runner = runner.with_cancel(cancel);
        }
        download_video(&runner, url, options, control.progress).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MediaError;

    #[tokio::test]
    async fn test_ytdlp_missing_binary() {
        let extractor = YtDlp::new("/nonexistent/yt-dlp-binary");
        let result = extractor.fetch_metadata("https://example.com/v").await;
        assert!(matches!(result, Err(MediaError::MetadataFailed(_))));
    }

    #[test]
    fn test_download_control_debug() {
        let (_tx, rx) = watch::channel(false);
        let control = DownloadControl {
            progress: None,
            cancel: Some(rx),
        };
        assert_eq!(
            format!("{:?}", control),
            "DownloadControl { progress: false, cancel: true }"
        );
    }
}
