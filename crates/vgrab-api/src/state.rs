//! Application state.

use std::sync::Arc;

use vgrab_media::{MediaExtractor, YtDlp};

use crate::config::ApiConfig;
use crate::session::SessionStore;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub sessions: SessionStore,
    pub extractor: Arc<dyn MediaExtractor>,
}

impl AppState {
    /// Create application state backed by the yt-dlp binary.
    pub fn new(config: ApiConfig) -> Self {
        let extractor = YtDlp::new(&config.ytdlp_path)
            .with_preview_timeout(config.preview_timeout)
            .with_download_timeout(config.download_timeout);

        Self::with_extractor(config, Arc::new(extractor))
    }

    /// Create application state with a custom extractor.
    pub fn with_extractor(config: ApiConfig, extractor: Arc<dyn MediaExtractor>) -> Self {
        let sessions = SessionStore::new(config.session_ttl);

        Self {
            config,
            sessions,
            extractor,
        }
    }
}
