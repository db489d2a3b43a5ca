//! Background service that drops expired sessions.
//!
//! Sessions are also checked lazily on access; this sweep keeps memory flat
//! when browsers simply go away.

use std::time::Duration;

use tokio::time::interval;
use tracing::{debug, info};

use crate::session::SessionStore;

/// Default interval between sweeps.
const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Expired session sweeper.
pub struct SessionSweeper {
    sessions: SessionStore,
    interval: Duration,
}

impl SessionSweeper {
    pub fn new(sessions: SessionStore) -> Self {
        Self {
            sessions,
            interval: SWEEP_INTERVAL,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Run one sweep. Returns how many sessions were removed.
    pub async fn sweep(&self) -> usize {
        let removed = self.sessions.purge_expired().await;
        if removed > 0 {
            let remaining = self.sessions.len().await;
            debug!(removed, remaining, "Swept expired sessions");
        }
        removed
    }

    /// Start the background sweep loop.
    ///
    /// This function runs indefinitely and should be spawned as a background task.
    pub async fn run(&self) {
        info!("Starting session sweeper (interval: {:?})", self.interval);

        let mut ticker = interval(self.interval);
        loop {
            ticker.tick().await;
            self.sweep().await;
        }
    }
}
