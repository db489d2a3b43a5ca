//! Metadata preview for a submitted URL.

use std::time::Instant;

use tracing::{info, warn};
use uuid::Uuid;
use vgrab_models::VideoPreview;

use crate::error::{ApiError, ApiResult};
use crate::metrics;
use crate::security::validate_video_url;
use crate::state::AppState;

/// Look up a URL's metadata and store it on the session.
///
/// A rejected URL never reaches the extractor. Any failure, including a
/// rejected URL, clears the session's preview so it can no longer be
/// downloaded.
pub async fn fetch_preview(state: &AppState, session: Uuid, raw_url: &str) -> ApiResult<VideoPreview> {
    let url = match validate_video_url(raw_url).into_result() {
        Ok(url) => url,
        Err(message) => {
            state.sessions.clear_preview(session).await;
            return Err(ApiError::InvalidUrl(message));
        }
    };

    if state.sessions.set_url(session, &url).await {
        info!(session = %session, "Video URL changed, preview reset");
    }

    let start = Instant::now();
    match state.extractor.fetch_metadata(&url).await {
        Ok(metadata) => {
            metrics::record_preview("success", start.elapsed().as_secs_f64());
            let preview = metadata.preview();
            info!(
                session = %session,
                title = %preview.title,
                duration = %preview.duration,
                "Video preview ready"
            );
            state.sessions.record_preview(session, &url, metadata).await;
            Ok(preview)
        }
        Err(e) => {
            metrics::record_preview("failure", start.elapsed().as_secs_f64());
            warn!(session = %session, url = %url, error = %e, "Video preview failed");
            state.sessions.clear_preview(session).await;
            Err(e.into())
        }
    }
}
