//! yt-dlp CLI wrapper for metadata lookup and downloads.
//!
//! This crate provides:
//! - Type-safe yt-dlp command building
//! - Progress parsing from `--newline` output
//! - Cancellation and timeouts via tokio
//! - Artifact lookup in a scratch directory
//! - The [`MediaExtractor`] seam used by the API

pub mod command;
pub mod download;
pub mod error;
pub mod extractor;
pub mod fs_utils;
pub mod probe;
pub mod progress;

pub use command::{check_ffmpeg, check_ytdlp, YtDlpCommand, YtDlpRunner, DEFAULT_YTDLP_BINARY};
pub use download::{download_video, DownloadOptions, PostProcessor};
pub use error::{MediaError, MediaResult};
pub use extractor::{DownloadControl, MediaExtractor, YtDlp};
pub use fs_utils::{find_artifact, is_temporary_file};
pub use probe::fetch_metadata;
pub use progress::{DownloadProgress, DownloadStage, ProgressCallback};
