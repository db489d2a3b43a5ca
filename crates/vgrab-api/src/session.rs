//! Per-browser session state.
//!
//! Each browser gets an opaque id in the `vgrab_session` cookie. The state
//! behind it lives in memory only and expires after a period of inactivity.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use tokio::sync::{watch, RwLock};
use tracing::{debug, warn};
use uuid::Uuid;
use vgrab_media::{DownloadProgress, ProgressCallback};
use vgrab_models::{VideoMetadata, VideoPreview};

use crate::error::{ApiError, ApiResult};

/// Cookie carrying the session id.
pub const SESSION_COOKIE: &str = "vgrab_session";

/// Maximum number of sessions kept in memory.
const MAX_SESSIONS: usize = 10_000;

/// Channels of the download currently running for a session.
#[derive(Debug)]
struct DownloadHandle {
    id: Uuid,
    /// Format label the download was started with
    format: String,
    progress: watch::Receiver<Option<DownloadProgress>>,
    cancel: watch::Sender<bool>,
}

/// Worker side of a registered download.
#[derive(Debug)]
pub struct DownloadTicket {
    /// Identifies this download when it is finished
    pub id: Uuid,
    progress: Arc<watch::Sender<Option<DownloadProgress>>>,
    cancel: watch::Receiver<bool>,
}

impl DownloadTicket {
    /// Callback that publishes progress snapshots to the session.
    pub fn progress_callback(&self) -> ProgressCallback {
        let tx = Arc::clone(&self.progress);
        Box::new(move |progress| {
            tx.send_replace(Some(progress));
        })
    }

    /// Receiver that flips to `true` when the user cancels.
    pub fn cancel_receiver(&self) -> watch::Receiver<bool> {
        self.cancel.clone()
    }

    /// Publish the final progress state.
    pub fn mark_finished(&self) {
        self.progress.send_modify(|current| {
            let done = current.take().unwrap_or_default().finished();
            *current = Some(done);
        });
    }
}

/// Everything remembered about one browser session.
#[derive(Debug, Default)]
pub struct SessionState {
    /// URL the current metadata belongs to
    pub url: String,
    /// Metadata from the last successful preview
    pub metadata: Option<VideoMetadata>,
    pub start_time: String,
    pub end_time: String,
    download: Option<DownloadHandle>,
}

impl SessionState {
    /// A session is ready to download once a preview succeeded.
    pub fn is_ready(&self) -> bool {
        self.metadata.is_some()
    }

    /// Forget the preview, keeping the time range.
    fn reset_preview(&mut self) {
        self.metadata = None;
    }

    pub fn view(&self) -> SessionView {
        SessionView {
            url: self.url.clone(),
            ready: self.is_ready(),
            preview: self.metadata.as_ref().map(VideoMetadata::preview),
            start_time: self.start_time.clone(),
            end_time: self.end_time.clone(),
            downloading: self.download.is_some(),
            download_format: self.download.as_ref().map(|d| d.format.clone()),
        }
    }
}

/// What the page needs to render a session.
#[derive(Debug, Clone, Serialize)]
pub struct SessionView {
    pub url: String,
    pub ready: bool,
    pub preview: Option<VideoPreview>,
    pub start_time: String,
    pub end_time: String,
    pub downloading: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub download_format: Option<String>,
}

struct SessionEntry {
    state: SessionState,
    last_seen: Instant,
}

/// In-memory session store with TTL expiry.
#[derive(Clone)]
pub struct SessionStore {
    sessions: Arc<RwLock<HashMap<Uuid, SessionEntry>>>,
    ttl: Duration,
    capacity: usize,
}

impl SessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self::with_capacity(ttl, MAX_SESSIONS)
    }

    pub fn with_capacity(ttl: Duration, capacity: usize) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            ttl,
            capacity: capacity.max(1),
        }
    }

    /// Return the live session for `id`, or create a fresh one.
    ///
    /// The returned id differs from the input when the session was unknown
    /// or had expired.
    pub async fn get_or_create(&self, id: Option<Uuid>) -> Uuid {
        let now = Instant::now();
        let mut sessions = self.sessions.write().await;

        if let Some(id) = id {
            if let Some(entry) = sessions.get_mut(&id) {
                if now.duration_since(entry.last_seen) < self.ttl {
                    entry.last_seen = now;
                    return id;
                }
                debug!(session = %id, "Session expired");
                sessions.remove(&id);
            }
        }

        self.cleanup_expired(&mut sessions, now);

        let id = Uuid::new_v4();
        sessions.insert(
            id,
            SessionEntry {
                state: SessionState::default(),
                last_seen: now,
            },
        );
        id
    }

    /// Remove expired sessions, then the oldest ones while over capacity.
    fn cleanup_expired(&self, sessions: &mut HashMap<Uuid, SessionEntry>, now: Instant) {
        sessions.retain(|_, entry| now.duration_since(entry.last_seen) < self.ttl);

        if sessions.len() >= self.capacity {
            let mut entries: Vec<_> = sessions.iter().map(|(id, e)| (*id, e.last_seen)).collect();
            entries.sort_by_key(|(_, t)| *t);

            let to_remove = sessions.len() + 1 - self.capacity;
            for (id, _) in entries.into_iter().take(to_remove) {
                sessions.remove(&id);
            }
            warn!("Session store exceeded capacity, removed {} sessions", to_remove);
        }
    }

    /// Drop every expired session. Returns how many were removed.
    pub async fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, entry| now.duration_since(entry.last_seen) < self.ttl);
        before - sessions.len()
    }

    /// Number of live sessions.
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    async fn with_session<T>(&self, id: Uuid, f: impl FnOnce(&mut SessionState) -> T) -> Option<T> {
        let mut sessions = self.sessions.write().await;
        sessions.get_mut(&id).map(|entry| {
            entry.last_seen = Instant::now();
            f(&mut entry.state)
        })
    }

    /// Record the URL typed into the form.
    ///
    /// A different URL invalidates the preview. Returns whether it changed.
    pub async fn set_url(&self, id: Uuid, url: &str) -> bool {
        self.with_session(id, |state| {
            if state.url == url {
                return false;
            }
            state.url = url.to_string();
            state.reset_preview();
            true
        })
        .await
        .unwrap_or(false)
    }

    /// Store a successful preview, replacing any earlier one.
    pub async fn record_preview(&self, id: Uuid, url: &str, metadata: VideoMetadata) {
        self.with_session(id, |state| {
            state.url = url.to_string();
            state.metadata = Some(metadata);
        })
        .await;
    }

    /// Drop the preview after a failed lookup.
    pub async fn clear_preview(&self, id: Uuid) {
        self.with_session(id, SessionState::reset_preview).await;
    }

    pub async fn set_time_range(&self, id: Uuid, start: &str, end: &str) {
        self.with_session(id, |state| {
            state.start_time = start.to_string();
            state.end_time = end.to_string();
        })
        .await;
    }

    /// URL and metadata of a ready session.
    pub async fn ready_video(&self, id: Uuid) -> Option<(String, VideoMetadata)> {
        let sessions = self.sessions.read().await;
        sessions
            .get(&id)
            .and_then(|entry| entry.state.metadata.clone().map(|m| (entry.state.url.clone(), m)))
    }

    /// Register a download, rejecting a second concurrent one.
    pub async fn begin_download(&self, id: Uuid, format: &str) -> ApiResult<DownloadTicket> {
        let (progress_tx, progress_rx) = watch::channel(None);
        let (cancel_tx, cancel_rx) = watch::channel(false);
        let download_id = Uuid::new_v4();

        self.with_session(id, move |state| {
            if state.download.is_some() {
                return Err(ApiError::conflict(
                    "A download is already running for this session",
                ));
            }
            state.download = Some(DownloadHandle {
                id: download_id,
                format: format.to_string(),
                progress: progress_rx,
                cancel: cancel_tx,
            });
            Ok(DownloadTicket {
                id: download_id,
                progress: Arc::new(progress_tx),
                cancel: cancel_rx,
            })
        })
        .await
        .ok_or(ApiError::NotReady)?
    }

    /// Unregister a download. Only the download that registered clears the slot.
    pub async fn finish_download(&self, id: Uuid, download_id: Uuid) {
        self.with_session(id, |state| {
            if state.download.as_ref().is_some_and(|d| d.id == download_id) {
                state.download = None;
            }
        })
        .await;
    }

    /// Latest progress of the running download.
    pub async fn progress(&self, id: Uuid) -> Option<DownloadProgress> {
        let sessions = self.sessions.read().await;
        sessions
            .get(&id)
            .and_then(|entry| entry.state.download.as_ref())
            .and_then(|download| download.progress.borrow().clone())
    }

    /// Ask the running download to stop. Returns whether one was running.
    pub async fn cancel(&self, id: Uuid) -> bool {
        let sessions = self.sessions.read().await;
        match sessions.get(&id).and_then(|entry| entry.state.download.as_ref()) {
            Some(download) => {
                download.cancel.send_replace(true);
                true
            }
            None => false,
        }
    }

    pub async fn view(&self, id: Uuid) -> SessionView {
        let sessions = self.sessions.read().await;
        sessions
            .get(&id)
            .map(|entry| entry.state.view())
            .unwrap_or_else(|| SessionState::default().view())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metadata(title: &str) -> VideoMetadata {
        VideoMetadata {
            title: Some(title.to_string()),
            duration: Some(212.0),
            uploader: Some("Channel".to_string()),
            thumbnail: None,
        }
    }

    #[tokio::test]
    async fn test_get_or_create_reuses_live_session() {
        let store = SessionStore::new(Duration::from_secs(60));
        let id = store.get_or_create(None).await;
        assert_eq!(store.get_or_create(Some(id)).await, id);
        assert_ne!(store.get_or_create(Some(Uuid::new_v4())).await, id);
        assert_eq!(store.len().await, 2);
    }

    #[tokio::test]
    async fn test_expired_session_is_replaced() {
        let store = SessionStore::new(Duration::from_millis(20));
        let id = store.get_or_create(None).await;
        store.record_preview(id, "https://youtu.be/x", metadata("A")).await;

        tokio::time::sleep(Duration::from_millis(40)).await;

        let new_id = store.get_or_create(Some(id)).await;
        assert_ne!(new_id, id);
        assert!(!store.view(new_id).await.ready);
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_purge_expired() {
        let store = SessionStore::new(Duration::from_millis(20));
        store.get_or_create(None).await;
        store.get_or_create(None).await;

        tokio::time::sleep(Duration::from_millis(40)).await;

        assert_eq!(store.purge_expired().await, 2);
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_capacity_evicts_oldest() {
        let store = SessionStore::with_capacity(Duration::from_secs(60), 2);
        let first = store.get_or_create(None).await;
        tokio::time::sleep(Duration::from_millis(2)).await;
        let _second = store.get_or_create(None).await;
        tokio::time::sleep(Duration::from_millis(2)).await;
        let _third = store.get_or_create(None).await;

        assert_eq!(store.len().await, 2);
        assert_ne!(store.get_or_create(Some(first)).await, first);
    }

    #[tokio::test]
    async fn test_ready_follows_metadata() {
        let store = SessionStore::new(Duration::from_secs(60));
        let id = store.get_or_create(None).await;
        assert!(!store.view(id).await.ready);

        store.record_preview(id, "https://youtu.be/x", metadata("A")).await;
        let view = store.view(id).await;
        assert!(view.ready);
        assert_eq!(view.preview.unwrap().title, "A");

        store.clear_preview(id).await;
        assert!(!store.view(id).await.ready);
        assert!(store.ready_video(id).await.is_none());
    }

    #[tokio::test]
    async fn test_preview_overwrites() {
        let store = SessionStore::new(Duration::from_secs(60));
        let id = store.get_or_create(None).await;
        store.record_preview(id, "https://youtu.be/x", metadata("A")).await;
        store.record_preview(id, "https://youtu.be/x", metadata("B")).await;

        let (url, meta) = store.ready_video(id).await.unwrap();
        assert_eq!(url, "https://youtu.be/x");
        assert_eq!(meta.title.as_deref(), Some("B"));
    }

    #[tokio::test]
    async fn test_changed_url_resets_preview() {
        let store = SessionStore::new(Duration::from_secs(60));
        let id = store.get_or_create(None).await;
        store.record_preview(id, "https://youtu.be/x", metadata("A")).await;

        assert!(!store.set_url(id, "https://youtu.be/x").await);
        assert!(store.view(id).await.ready);

        assert!(store.set_url(id, "https://youtu.be/y").await);
        let view = store.view(id).await;
        assert!(!view.ready);
        assert_eq!(view.url, "https://youtu.be/y");
    }

    #[tokio::test]
    async fn test_one_download_at_a_time() {
        let store = SessionStore::new(Duration::from_secs(60));
        let id = store.get_or_create(None).await;

        let ticket = store.begin_download(id, "MP3 (Ses)").await.unwrap();
        let second = store.begin_download(id, "MP3 (Ses)").await;
        assert!(matches!(second, Err(ApiError::Conflict(_))));
        assert_eq!(store.view(id).await.download_format.as_deref(), Some("MP3 (Ses)"));

        // A stale finish does not clear the running download
        store.finish_download(id, Uuid::new_v4()).await;
        assert!(store.view(id).await.downloading);

        store.finish_download(id, ticket.id).await;
        assert!(!store.view(id).await.downloading);
        assert!(store.begin_download(id, "720p").await.is_ok());
    }

    #[tokio::test]
    async fn test_progress_and_cancel() {
        let store = SessionStore::new(Duration::from_secs(60));
        let id = store.get_or_create(None).await;
        assert!(store.progress(id).await.is_none());
        assert!(!store.cancel(id).await);

        let ticket = store.begin_download(id, "720p").await.unwrap();
        let callback = ticket.progress_callback();
        callback(DownloadProgress {
            percent: 42.0,
            ..Default::default()
        });
        assert_eq!(store.progress(id).await.unwrap().percent, 42.0);

        let cancel_rx = ticket.cancel_receiver();
        assert!(!*cancel_rx.borrow());
        assert!(store.cancel(id).await);
        assert!(*cancel_rx.borrow());

        ticket.mark_finished();
        assert!(store.progress(id).await.unwrap().is_complete);
    }

    #[tokio::test]
    async fn test_unknown_session_cannot_download() {
        let store = SessionStore::new(Duration::from_secs(60));
        let result = store.begin_download(Uuid::new_v4(), "720p").await;
        assert!(matches!(result, Err(ApiError::NotReady)));
    }
}
