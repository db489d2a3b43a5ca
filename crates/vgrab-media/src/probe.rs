//! Metadata lookup without downloading media.

use tracing::{debug, info};
use vgrab_models::VideoMetadata;

use crate::command::{YtDlpCommand, YtDlpRunner};
use crate::error::{MediaError, MediaResult};

/// Ask yt-dlp for a URL's metadata record.
///
/// Tool failures (missing binary, non-zero exit, unparseable output) are
/// reported as [`MediaError::MetadataFailed`] carrying the underlying message.
/// Timeouts and cancellation pass through unchanged.
pub async fn fetch_metadata(runner: &YtDlpRunner, url: &str) -> MediaResult<VideoMetadata> {
    info!(url = %url, "Fetching video metadata");

    let cmd = YtDlpCommand::new(url).metadata_only();
    let stdout = runner.output(&cmd).await.map_err(into_metadata_error)?;

    let metadata = VideoMetadata::from_json(&stdout).map_err(|e| {
        debug!("Unparseable metadata output: {}", String::from_utf8_lossy(&stdout));
        MediaError::metadata_failed(format!("Could not parse video metadata: {}", e))
    })?;

    debug!(
        title = ?metadata.title,
        duration = ?metadata.duration,
        "Fetched video metadata"
    );

    Ok(metadata)
}

fn into_metadata_error(err: MediaError) -> MediaError {
    match err {
        err @ (MediaError::Cancelled | MediaError::Timeout(_)) => err,
        MediaError::YtDlpFailed { message, .. } => MediaError::metadata_failed(message),
        other => MediaError::metadata_failed(other.to_string()),
    }
}
