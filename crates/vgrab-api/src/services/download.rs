//! Download orchestration: validate, run the extractor, collect the artifact.

use std::path::{Path, PathBuf};
use std::time::Instant;

use scopeguard::ScopeGuard;
use serde::Deserialize;
use tempfile::TempDir;
use tracing::{debug, info, warn};
use uuid::Uuid;
use vgrab_media::{find_artifact, DownloadControl, DownloadOptions, PostProcessor};
use vgrab_models::{
    format_code, sanitize_filename, FormatChoice, TimeRange, VideoMetadata, AUDIO_CODEC,
    AUDIO_QUALITY,
};

use crate::error::{ApiError, ApiResult};
use crate::metrics;
use crate::security::validate_video_url;
use crate::session::DownloadTicket;
use crate::state::AppState;

/// Download request sent by the form.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DownloadRequest {
    /// URL currently in the form; must match the previewed one
    #[serde(default)]
    pub url: Option<String>,
    /// Format label; the default choice when absent
    #[serde(default)]
    pub format: Option<String>,
    #[serde(default)]
    pub start: String,
    #[serde(default)]
    pub end: String,
}

/// Validated parameters of one download.
#[derive(Debug, Clone, PartialEq)]
pub struct DownloadPlan {
    /// Filesystem-safe base name, without extension
    pub base_name: String,
    /// Format label as chosen on the form
    pub format_label: String,
    /// Extractor format selector
    pub selector: &'static str,
    pub range: Option<TimeRange>,
    /// Whether the result is transcoded to audio
    pub extract_audio: bool,
}

impl DownloadPlan {
    /// Extractor options writing into `scratch`.
    pub fn options(&self, scratch: &Path) -> DownloadOptions {
        let template = scratch.join(format!("{}.%(ext)s", self.base_name));
        let mut options = DownloadOptions::new(self.selector, template);

        if let Some(range) = &self.range {
            options = options.with_sections(range.section_spec());
        }

        if self.extract_audio {
            options = options.with_post_processor(PostProcessor::ExtractAudio {
                codec: AUDIO_CODEC.to_string(),
                quality: AUDIO_QUALITY.to_string(),
            });
        }

        options
    }
}

/// Validate a request against the previewed metadata.
///
/// Everything that can be rejected is rejected here, before the extractor
/// runs. With `strict` the range must also be ordered and fit the video.
pub fn plan_download(
    metadata: &VideoMetadata,
    request: &DownloadRequest,
    strict: bool,
) -> ApiResult<DownloadPlan> {
    let range = TimeRange::from_inputs(request.start.trim(), request.end.trim())?;

    if strict {
        if let Some(range) = &range {
            range.check_bounds(metadata.duration)?;
        }
    }

    let format_label = request
        .format
        .clone()
        .unwrap_or_else(|| FormatChoice::default().label().to_string());
    let choice = FormatChoice::from_label(&format_label);

    Ok(DownloadPlan {
        base_name: sanitize_filename(metadata.title.as_deref().unwrap_or_default()),
        selector: format_code(&format_label),
        extract_audio: choice.is_some_and(|c| c.is_audio_only()),
        format_label,
        range,
    })
}

/// A finished download, read into memory.
#[derive(Debug)]
pub struct Artifact {
    /// Name of the file as produced on disk
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// Run a download for a session from start to finish.
///
/// The session slot is released and the scratch directory removed on every
/// exit path, including the caller dropping this future mid-download.
pub async fn run_download(
    state: &AppState,
    session: Uuid,
    request: &DownloadRequest,
) -> ApiResult<Artifact> {
    let (url, metadata) = state
        .sessions
        .ready_video(session)
        .await
        .ok_or(ApiError::NotReady)?;

    if let Some(requested) = request.url.as_deref() {
        let requested = validate_video_url(requested)
            .into_result()
            .map_err(ApiError::InvalidUrl)?;
        if requested != url {
            state.sessions.set_url(session, &requested).await;
            info!(session = %session, "Video URL changed since preview, preview reset");
            return Err(ApiError::NotReady);
        }
    }

    let plan = plan_download(&metadata, request, state.config.strict_time_range)?;
    state
        .sessions
        .set_time_range(session, &request.start, &request.end)
        .await;

    let ticket = state.sessions.begin_download(session, &plan.format_label).await?;

    // Released inline below; the guard only fires if this future is dropped
    let guard = scopeguard::guard(
        (state.sessions.clone(), ticket.id),
        move |(sessions, download_id)| {
            tokio::spawn(async move {
                sessions.finish_download(session, download_id).await;
            });
        },
    );

    let result = execute_download(state, session, &url, &plan, &ticket).await;

    let (sessions, download_id) = ScopeGuard::into_inner(guard);
    sessions.finish_download(session, download_id).await;

    result
}

/// Run the extractor into a fresh scratch directory and collect the result.
async fn execute_download(
    state: &AppState,
    session: Uuid,
    url: &str,
    plan: &DownloadPlan,
    ticket: &DownloadTicket,
) -> ApiResult<Artifact> {
    let scratch = create_scratch_dir(state.config.scratch_dir.as_deref())?;
    let options = plan.options(scratch.path());

    info!(
        session = %session,
        format = %plan.format_label,
        range = ?plan.range,
        "Starting download"
    );

    let control = DownloadControl {
        progress: Some(ticket.progress_callback()),
        cancel: Some(ticket.cancel_receiver()),
    };

    let start = Instant::now();
    let result = state.extractor.download(url, &options, control).await;
    let elapsed = start.elapsed().as_secs_f64();

    if let Err(e) = result {
        let err = ApiError::from(e);
        warn!(session = %session, error = %err, "Download failed");
        metrics::record_download(&plan.format_label, err.code(), elapsed);
        return Err(err);
    }

    let artifact = match collect_artifact(scratch.path(), state.config.max_artifact_bytes).await {
        Ok(artifact) => artifact,
        Err(err) => {
            metrics::record_download(&plan.format_label, err.code(), elapsed);
            return Err(err);
        }
    };

    ticket.mark_finished();
    metrics::record_download(&plan.format_label, "success", elapsed);
    metrics::record_artifact_size(artifact.bytes.len() as u64);

    info!(
        session = %session,
        file = %artifact.file_name,
        size_mb = artifact.bytes.len() as f64 / (1024.0 * 1024.0),
        duration_secs = elapsed,
        "Download completed"
    );

    Ok(artifact)
}

/// Locate the produced file and read it fully.
async fn collect_artifact(scratch: &Path, max_bytes: u64) -> ApiResult<Artifact> {
    let path = find_artifact(scratch).await?;
    let file_name = file_name_of(&path)?;

    let size = tokio::fs::metadata(&path)
        .await
        .map_err(|e| ApiError::internal(format!("Failed to stat downloaded file: {}", e)))?
        .len();
    if size > max_bytes {
        return Err(ApiError::DownloadFailed(format!(
            "File is too large to deliver ({} bytes, limit {})",
            size, max_bytes
        )));
    }

    let bytes = tokio::fs::read(&path)
        .await
        .map_err(|e| ApiError::internal(format!("Failed to read downloaded file: {}", e)))?;

    debug!(path = %path.display(), size = bytes.len(), "Read downloaded file");
    Ok(Artifact { file_name, bytes })
}

fn file_name_of(path: &Path) -> ApiResult<String> {
    path.file_name()
        .map(|name| name.to_string_lossy().to_string())
        .ok_or(ApiError::ArtifactNotFound)
}

/// Create a per-download scratch directory.
fn create_scratch_dir(parent: Option<&Path>) -> ApiResult<TempDir> {
    let mut builder = tempfile::Builder::new();
    builder.prefix("vgrab-");

    let dir = match parent {
        Some(parent) => {
            std::fs::create_dir_all(parent).map_err(|e| {
                ApiError::internal(format!("Failed to create scratch root {}: {}", parent.display(), e))
            })?;
            builder.tempdir_in(parent)
        }
        None => builder.tempdir(),
    };

    dir.map_err(|e| ApiError::internal(format!("Failed to create scratch directory: {}", e)))
}

/// Scratch root actually used, for logging at startup.
pub fn scratch_root(configured: Option<&Path>) -> PathBuf {
    configured
        .map(Path::to_path_buf)
        .unwrap_or_else(std::env::temp_dir)
}
