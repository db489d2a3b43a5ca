//! Media download using yt-dlp.
//!
//! The caller owns the scratch directory; this module only drives the tool
//! and reports how it went.

use std::path::PathBuf;

use tracing::{debug, info, warn};

use crate::command::{YtDlpCommand, YtDlpRunner};
use crate::error::{MediaError, MediaResult};
use crate::progress::ProgressCallback;

/// Post-processing step applied by yt-dlp after the transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PostProcessor {
    /// Transcode to an audio-only file.
    ExtractAudio { codec: String, quality: String },
}

/// Everything yt-dlp needs to produce one artifact.
#[derive(Debug, Clone, PartialEq)]
pub struct DownloadOptions {
    /// Format selector expression
    pub format: String,
    /// Output path template, e.g. `/tmp/x/title.%(ext)s`
    pub output_template: PathBuf,
    /// Clip directive, e.g. `*00:01:00-00:02:00`
    pub sections: Option<String>,
    pub post_processors: Vec<PostProcessor>,
}

impl DownloadOptions {
    /// Options for a full download with the given format.
    pub fn new(format: impl Into<String>, output_template: impl Into<PathBuf>) -> Self {
        Self {
            format: format.into(),
            output_template: output_template.into(),
            sections: None,
            post_processors: Vec::new(),
        }
    }

    /// Restrict the download to a time section.
    pub fn with_sections(mut self, sections: impl Into<String>) -> Self {
        self.sections = Some(sections.into());
        self
    }

    /// Append a post-processing step.
    pub fn with_post_processor(mut self, post_processor: PostProcessor) -> Self {
        self.post_processors.push(post_processor);
        self
    }

    /// Whether an audio extraction step is attached.
    pub fn extracts_audio(&self) -> bool {
        self.post_processors
            .iter()
            .any(|pp| matches!(pp, PostProcessor::ExtractAudio { .. }))
    }

    /// Apply the options to a command.
    pub fn apply(&self, cmd: YtDlpCommand) -> YtDlpCommand {
        let mut cmd = cmd
            .format(&self.format)
            .output_template(&self.output_template);

        if let Some(sections) = &self.sections {
            cmd = cmd.download_sections(sections);
        }

        for post_processor in &self.post_processors {
            cmd = match post_processor {
                PostProcessor::ExtractAudio { codec, quality } => {
                    cmd.extract_audio(codec, quality)
                }
            };
        }

        cmd
    }
}

/// Download a URL with yt-dlp, reporting progress along the way.
///
/// Process failures become [`MediaError::DownloadFailed`] carrying the most
/// relevant stderr line. Timeouts and cancellation pass through unchanged.
pub async fn download_video(
    runner: &YtDlpRunner,
    url: &str,
    options: &DownloadOptions,
    progress: Option<ProgressCallback>,
) -> MediaResult<()> {
    info!(
        url = %url,
        format = %options.format,
        sections = ?options.sections,
        output = %options.output_template.display(),
        "Downloading video"
    );

    let cmd = options.apply(YtDlpCommand::new(url).progress_lines());

    match runner.run_with_progress(&cmd, progress).await {
        Ok(()) => {
            debug!(url = %url, "yt-dlp finished");
            Ok(())
        }
        Err(MediaError::YtDlpFailed { message, stderr, .. }) => {
            let stderr = stderr.unwrap_or_default();
            if is_rate_limited(&stderr) {
                warn!(url = %url, "Rate limit detected by yt-dlp");
            }
            Err(MediaError::download_failed(message))
        }
        Err(err @ (MediaError::Cancelled | MediaError::Timeout(_))) => Err(err),
        Err(MediaError::YtDlpNotFound(binary)) => Err(MediaError::download_failed(format!(
            "yt-dlp not found: {}",
            binary
        ))),
        Err(other) => Err(other),
    }
}

/// Whether yt-dlp's stderr shows the site throttling us.
pub fn is_rate_limited(stderr: &str) -> bool {
    stderr.contains("429")
        || stderr.contains("Too Many Requests")
        || stderr.contains("rate limit")
        || stderr.contains("Sign in to confirm")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args_of(options: &DownloadOptions) -> Vec<String> {
        options
            .apply(YtDlpCommand::new("https://example.com/v"))
            .build_args()
    }

    #[test]
    fn test_plain_download_options() {
        let options = DownloadOptions::new("bestvideo+bestaudio/best", "/tmp/s/Title.%(ext)s");
        let args = args_of(&options);

        assert!(args.windows(2).any(|w| w == ["-f", "bestvideo+bestaudio/best"]));
        assert!(args.windows(2).any(|w| w == ["-o", "/tmp/s/Title.%(ext)s"]));
        assert!(!args.contains(&"--download-sections".to_string()));
        assert!(!args.contains(&"--extract-audio".to_string()));
        assert!(!options.extracts_audio());
    }

    #[test]
    fn test_clip_and_audio_options() {
        let options = DownloadOptions::new("bestaudio[ext=m4a]/bestaudio", "/tmp/s/a.%(ext)s")
            .with_sections("*00:10-00:20")
            .with_post_processor(PostProcessor::ExtractAudio {
                codec: "mp3".to_string(),
                quality: "192".to_string(),
            });
        let args = args_of(&options);

        assert!(args.windows(2).any(|w| w == ["--download-sections", "*00:10-00:20"]));
        assert!(args.windows(2).any(|w| w == ["--audio-format", "mp3"]));
        assert!(args.windows(2).any(|w| w == ["--audio-quality", "192"]));
        assert!(options.extracts_audio());
    }

    #[test]
    fn test_is_rate_limited() {
        assert!(is_rate_limited("ERROR: HTTP Error 429: Too Many Requests"));
        assert!(is_rate_limited("Sign in to confirm you're not a bot"));
        assert!(!is_rate_limited("ERROR: Video unavailable"));
    }

    #[tokio::test]
    async fn test_missing_binary_is_download_failure() {
        let runner = YtDlpRunner::new("/nonexistent/yt-dlp-binary");
        let options = DownloadOptions::new("best", "/tmp/none.%(ext)s");
        let result = download_video(&runner, "https://example.com/v", &options, None).await;
        assert!(matches!(result, Err(MediaError::DownloadFailed { .. })));
    }
}
