//! Preview and download handlers.

use axum::body::Body;
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::Response;
use axum::Json;
use axum_extra::extract::CookieJar;
use serde::{Deserialize, Serialize};
use vgrab_media::DownloadProgress;
use vgrab_models::{ascii_filename, VideoPreview};

use crate::error::{ApiError, ApiResult};
use crate::handlers::session::resolve_session;
use crate::services::download::{run_download, DownloadRequest};
use crate::services::preview::fetch_preview;
use crate::state::AppState;

// ============================================================================
// Preview
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct PreviewRequest {
    #[serde(default)]
    pub url: String,
}

/// Fetch metadata for a URL and make the session ready to download.
pub async fn preview(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(request): Json<PreviewRequest>,
) -> (CookieJar, ApiResult<Json<VideoPreview>>) {
    let (jar, session) = resolve_session(&state, jar).await;
    let result = fetch_preview(&state, session, &request.url).await.map(Json);
    (jar, result)
}

// ============================================================================
// Download
// ============================================================================

/// Download the previewed video and return it as an attachment.
pub async fn download(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(request): Json<DownloadRequest>,
) -> (CookieJar, ApiResult<Response>) {
    let (jar, session) = resolve_session(&state, jar).await;

    let result = match run_download(&state, session, &request).await {
        Ok(artifact) => attachment_response(&artifact.file_name, artifact.bytes),
        Err(e) => Err(e),
    };

    (jar, result)
}

/// Build an `application/octet-stream` attachment response.
fn attachment_response(file_name: &str, bytes: Vec<u8>) -> ApiResult<Response> {
    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "application/octet-stream")
        .header(header::CONTENT_DISPOSITION, content_disposition(file_name))
        .header(header::CONTENT_LENGTH, bytes.len())
        .header(header::CACHE_CONTROL, "no-store")
        .body(Body::from(bytes))
        .map_err(|e| ApiError::internal(format!("Failed to build response: {}", e)))
}

/// `Content-Disposition` value carrying both an ASCII fallback and the
/// UTF-8 name (RFC 6266 / RFC 5987).
pub fn content_disposition(file_name: &str) -> String {
    format!(
        "attachment; filename=\"{}\"; filename*=UTF-8''{}",
        ascii_filename(file_name),
        urlencoding::encode(file_name)
    )
}

#[derive(Debug, Serialize)]
pub struct ProgressResponse {
    pub downloading: bool,
    pub progress: Option<DownloadProgress>,
}

/// Latest progress of the session's running download.
pub async fn download_progress(
    State(state): State<AppState>,
    jar: CookieJar,
) -> (CookieJar, Json<ProgressResponse>) {
    let (jar, session) = resolve_session(&state, jar).await;
    let downloading = state.sessions.view(session).await.downloading;
    let progress = state.sessions.progress(session).await;
    (jar, Json(ProgressResponse { downloading, progress }))
}

#[derive(Debug, Serialize)]
pub struct CancelResponse {
    pub cancelled: bool,
}

/// Cancel the session's running download, if any.
pub async fn cancel_download(
    State(state): State<AppState>,
    jar: CookieJar,
) -> (CookieJar, Json<CancelResponse>) {
    let (jar, session) = resolve_session(&state, jar).await;
    let cancelled = state.sessions.cancel(session).await;
    if cancelled {
        tracing::info!(session = %session, "Download cancel requested");
    }
    (jar, Json(CancelResponse { cancelled }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_disposition_ascii() {
        assert_eq!(
            content_disposition("My Video.mp4"),
            "attachment; filename=\"My Video.mp4\"; filename*=UTF-8''My%20Video.mp4"
        );
    }

    #[test]
    fn test_content_disposition_unicode() {
        let value = content_disposition("Şarkı.mp3");
        assert!(value.starts_with("attachment; filename=\"_ark_.mp3\""));
        assert!(value.ends_with("filename*=UTF-8''%C5%9Eark%C4%B1.mp3"));
    }
}
