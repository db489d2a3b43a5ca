//! Business logic services.

pub mod download;
pub mod preview;
pub mod session_sweeper;

pub use download::{plan_download, run_download, Artifact, DownloadPlan, DownloadRequest};
pub use preview::fetch_preview;
pub use session_sweeper::SessionSweeper;
