//! yt-dlp progress parsing.
//!
//! yt-dlp is run with `--newline`, so every progress update arrives as its
//! own stdout line:
//!
//! ```text
//! [download]  45.3% of   10.00MiB at    1.00MiB/s ETA 00:05
//! [download] 100% of   10.00MiB in 00:00:03 at 3.20MiB/s
//! [ExtractAudio] Destination: /tmp/.../title.mp3
//! ```

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use vgrab_models::parse_timestamp;

static DOWNLOAD_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^\[download\]\s+(\d+(?:\.\d+)?)%(?:\s+of\s+~?\s*(\S+))?(?:\s+in\s+\S+)?(?:\s+at\s+(\S+(?:\s+B/s)?))?(?:\s+ETA\s+(\S+))?",
    )
    .expect("valid progress regex")
});

/// Post-processor tags yt-dlp prints once the transfer itself is done.
const POST_PROCESSOR_TAGS: &[&str] = &[
    "[Merger]",
    "[ExtractAudio]",
    "[FixupM3u8]",
    "[FixupM4a]",
    "[FixupStretched]",
    "[VideoConvertor]",
    "[VideoRemuxer]",
    "[ModifyChapters]",
];

/// Coarse phase of a download.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DownloadStage {
    #[default]
    Starting,
    Downloading,
    PostProcessing,
    Finished,
}

/// Progress information from yt-dlp.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DownloadProgress {
    pub stage: DownloadStage,
    /// Percent of the current stream transferred
    pub percent: f64,
    /// Reported size of the current stream (e.g. "10.00MiB")
    pub total_size: Option<String>,
    /// Transfer rate (e.g. "1.00MiB/s")
    pub speed: Option<String>,
    /// Remaining time as printed (e.g. "00:05")
    pub eta: Option<String>,
    /// Whether the extractor has exited successfully
    pub is_complete: bool,
}

impl DownloadProgress {
    /// Remaining time in seconds, when yt-dlp printed a parseable ETA.
    pub fn eta_seconds(&self) -> Option<u64> {
        self.eta
            .as_deref()
            .and_then(|eta| parse_timestamp(eta).ok())
            .map(|secs| secs as u64)
    }

    /// Final state once the extractor exits successfully.
    pub fn finished(mut self) -> Self {
        self.stage = DownloadStage::Finished;
        self.percent = 100.0;
        self.eta = None;
        self.is_complete = true;
        self
    }
}

/// Callback type for progress updates.
pub type ProgressCallback = Box<dyn Fn(DownloadProgress) + Send + Sync + 'static>;

/// Parse one stdout line, updating `current`.
///
/// Returns a snapshot when the line changed the progress state.
pub fn parse_progress_line(line: &str, current: &mut DownloadProgress) -> Option<DownloadProgress> {
    let line = line.trim();

    if let Some(caps) = DOWNLOAD_LINE.captures(line) {
        let percent = caps.get(1)?.as_str().parse::<f64>().ok()?;
        current.stage = DownloadStage::Downloading;
        current.percent = percent.clamp(0.0, 100.0);
        current.total_size = caps.get(2).map(|m| m.as_str().to_string());
        current.speed = caps
            .get(3)
            .map(|m| m.as_str().to_string())
            .filter(|s| !s.starts_with("Unknown"));
        current.eta = caps
            .get(4)
            .map(|m| m.as_str().to_string())
            .filter(|s| s != "Unknown");
        return Some(current.clone());
    }

    if line.starts_with("[download] Destination:") {
        current.stage = DownloadStage::Downloading;
        current.percent = 0.0;
        current.total_size = None;
        current.speed = None;
        current.eta = None;
        return Some(current.clone());
    }

    if POST_PROCESSOR_TAGS.iter().any(|tag| line.starts_with(tag))
        && current.stage != DownloadStage::PostProcessing
    {
        current.stage = DownloadStage::PostProcessing;
        current.speed = None;
        current.eta = None;
        return Some(current.clone());
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_download_line() {
        let mut progress = DownloadProgress::default();
        let snapshot = parse_progress_line(
            "[download]  45.3% of   10.00MiB at    1.00MiB/s ETA 00:05",
            &mut progress,
        )
        .unwrap();

        assert_eq!(snapshot.stage, DownloadStage::Downloading);
        assert!((snapshot.percent - 45.3).abs() < 0.01);
        assert_eq!(snapshot.total_size.as_deref(), Some("10.00MiB"));
        assert_eq!(snapshot.speed.as_deref(), Some("1.00MiB/s"));
        assert_eq!(snapshot.eta.as_deref(), Some("00:05"));
        assert_eq!(snapshot.eta_seconds(), Some(5));
    }

    #[test]
    fn test_parse_estimated_size_and_unknown_speed() {
        let mut progress = DownloadProgress::default();
        let snapshot = parse_progress_line(
            "[download]   2.0% of ~  50.12MiB at  Unknown B/s ETA Unknown",
            &mut progress,
        )
        .unwrap();

        assert_eq!(snapshot.total_size.as_deref(), Some("50.12MiB"));
        assert_eq!(snapshot.speed, None);
        assert_eq!(snapshot.eta, None);
    }

    #[test]
    fn test_parse_completed_stream() {
        let mut progress = DownloadProgress::default();
        let snapshot = parse_progress_line(
            "[download] 100% of   10.00MiB in 00:00:03 at 3.20MiB/s",
            &mut progress,
        )
        .unwrap();

        assert!((snapshot.percent - 100.0).abs() < 0.01);
        assert_eq!(snapshot.speed.as_deref(), Some("3.20MiB/s"));
        assert!(!snapshot.is_complete);
    }

    #[test]
    fn test_post_processing_reported_once() {
        let mut progress = DownloadProgress::default();
        assert!(parse_progress_line("[ExtractAudio] Destination: /tmp/a.mp3", &mut progress).is_some());
        assert_eq!(progress.stage, DownloadStage::PostProcessing);
        assert!(parse_progress_line("[Merger] Merging formats into \"a.mkv\"", &mut progress).is_none());
    }

    #[test]
    fn test_unrelated_lines_ignored() {
        let mut progress = DownloadProgress::default();
        assert!(parse_progress_line("[youtube] dQw4w9WgXcQ: Downloading webpage", &mut progress).is_none());
        assert!(parse_progress_line("", &mut progress).is_none());
        assert_eq!(progress, DownloadProgress::default());
    }

    #[test]
    fn test_finished() {
        let done = DownloadProgress {
            percent: 80.0,
            eta: Some("00:02".to_string()),
            ..Default::default()
        }
        .finished();

        assert!(done.is_complete);
        assert_eq!(done.stage, DownloadStage::Finished);
        assert_eq!(done.eta, None);
    }
}
