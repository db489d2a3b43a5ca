//! yt-dlp command builder and runner.

use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::{MediaError, MediaResult};
use crate::progress::{parse_progress_line, DownloadProgress, ProgressCallback};

/// Default binary name looked up on `PATH`.
pub const DEFAULT_YTDLP_BINARY: &str = "yt-dlp";

/// How long pipes are drained after yt-dlp exits. An ffmpeg grandchild can
/// keep them open past its parent.
const PIPE_DRAIN_TIMEOUT: Duration = Duration::from_secs(2);

/// Builder for yt-dlp invocations.
#[derive(Debug, Clone)]
pub struct YtDlpCommand {
    /// Source URL, always passed after `--`
    url: String,
    /// Option arguments
    args: Vec<String>,
}

impl YtDlpCommand {
    /// Create a command for a single URL.
    ///
    /// Playlists are never expanded and warnings are suppressed so stdout
    /// stays machine readable.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            args: vec!["--no-playlist".to_string(), "--no-warnings".to_string()],
        }
    }

    /// Add a single argument.
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Add multiple arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Print the metadata record as JSON without downloading media.
    pub fn metadata_only(self) -> Self {
        self.arg("--dump-single-json").arg("--skip-download")
    }

    /// Set the format selector.
    pub fn format(self, selector: impl Into<String>) -> Self {
        self.arg("-f").arg(selector)
    }

    /// Set the output path template.
    pub fn output_template(self, template: impl AsRef<Path>) -> Self {
        let template = template.as_ref().to_string_lossy().to_string();
        self.arg("-o").arg(template)
    }

    /// Only fetch a time-bounded section (`*start-end`).
    pub fn download_sections(self, spec: impl Into<String>) -> Self {
        self.arg("--download-sections").arg(spec)
    }

    /// Transcode the result to an audio-only file.
    pub fn extract_audio(self, codec: impl Into<String>, quality: impl Into<String>) -> Self {
        self.arg("--extract-audio")
            .arg("--audio-format")
            .arg(codec)
            .arg("--audio-quality")
            .arg(quality)
    }

    /// Print one progress line per update on stdout.
    pub fn progress_lines(self) -> Self {
        self.arg("--newline").arg("--no-colors")
    }

    /// Source URL.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Build the command arguments.
    pub fn build_args(&self) -> Vec<String> {
        let mut args = self.args.clone();
        args.push("--".to_string());
        args.push(self.url.clone());
        args
    }
}

/// Runner for yt-dlp commands with timeout and cancellation.
#[derive(Debug, Clone)]
pub struct YtDlpRunner {
    /// Binary name or path
    binary: PathBuf,
    /// Cancellation signal receiver
    cancel_rx: Option<watch::Receiver<bool>>,
    /// Wall-clock limit for the whole invocation
    timeout: Option<Duration>,
}

impl Default for YtDlpRunner {
    fn default() -> Self {
        Self::new(DEFAULT_YTDLP_BINARY)
    }
}

/// How a supervised child stopped.
enum Outcome {
    Exited(std::io::Result<ExitStatus>),
    Cancelled,
    TimedOut,
}

impl YtDlpRunner {
    /// Create a runner for the given binary.
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            cancel_rx: None,
            timeout: None,
        }
    }

    /// Set cancellation signal.
    pub fn with_cancel(mut self, cancel_rx: watch::Receiver<bool>) -> Self {
        self.cancel_rx = Some(cancel_rx);
        self
    }

    /// Set timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Run a command and return its stdout.
    pub async fn output(&self, cmd: &YtDlpCommand) -> MediaResult<Vec<u8>> {
        let mut child = self.spawn(cmd)?;

        let stdout = child.stdout.take().map(|out| tokio::spawn(read_all(out)));
        let stderr = child.stderr.take().map(|err| tokio::spawn(read_all(err)));

        let status = self.wait_for_completion(&mut child).await;
        let drain = drain_timeout(&status);

        let stdout = join_output(stdout, drain).await.unwrap_or_default();
        let stderr = join_output(stderr, drain).await.unwrap_or_default();
        let stderr = String::from_utf8_lossy(&stderr).to_string();

        check_status(status?, stderr)?;
        Ok(stdout)
    }

    /// Run a command, reporting progress parsed from stdout.
    pub async fn run_with_progress(
        &self,
        cmd: &YtDlpCommand,
        progress_callback: Option<ProgressCallback>,
    ) -> MediaResult<()> {
        let mut child = self.spawn(cmd)?;

        let stdout = child.stdout.take();
        let progress_handle = tokio::spawn(async move {
            let Some(stdout) = stdout else { return };
            let mut reader = BufReader::new(stdout).lines();
            let mut current = DownloadProgress::default();

            while let Ok(Some(line)) = reader.next_line().await {
                if let Some(progress) = parse_progress_line(&line, &mut current) {
                    if let Some(callback) = &progress_callback {
                        callback(progress);
                    }
                }
            }
        });
        let stderr = child.stderr.take().map(|err| tokio::spawn(read_all(err)));

        let status = self.wait_for_completion(&mut child).await;
        let drain = drain_timeout(&status);

        join_output(Some(progress_handle), drain).await;
        let stderr = join_output(stderr, drain).await.unwrap_or_default();
        let stderr = String::from_utf8_lossy(&stderr).to_string();

        check_status(status?, stderr)
    }

    fn spawn(&self, cmd: &YtDlpCommand) -> MediaResult<Child> {
        which::which(&self.binary)
            .map_err(|_| MediaError::YtDlpNotFound(self.binary.display().to_string()))?;

        let args = cmd.build_args();
        debug!("Running yt-dlp: {} {}", self.binary.display(), args.join(" "));

        let child = Command::new(&self.binary)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        Ok(child)
    }

    /// Wait for child process with cancellation and timeout.
    async fn wait_for_completion(&self, child: &mut Child) -> MediaResult<ExitStatus> {
        let cancelled = wait_cancelled(self.cancel_rx.clone());
        let deadline = async {
            match self.timeout {
                Some(timeout) => tokio::time::sleep(timeout).await,
                None => std::future::pending::<()>().await,
            }
        };

        let outcome = tokio::select! {
            status = child.wait() => Outcome::Exited(status),
            _ = cancelled => Outcome::Cancelled,
            _ = deadline => Outcome::TimedOut,
        };

        match outcome {
            Outcome::Exited(status) => Ok(status?),
            Outcome::Cancelled => {
                info!("yt-dlp cancelled, killing process");
                let _ = child.kill().await;
                Err(MediaError::Cancelled)
            }
            Outcome::TimedOut => {
                let secs = self.timeout.map(|t| t.as_secs()).unwrap_or_default();
                warn!("yt-dlp timed out after {} seconds, killing process", secs);
                let _ = child.kill().await;
                Err(MediaError::Timeout(secs))
            }
        }
    }
}

/// Resolve once the cancel flag flips to true. Never resolves without a receiver
/// or after the sender is gone.
async fn wait_cancelled(cancel_rx: Option<watch::Receiver<bool>>) {
    if let Some(mut rx) = cancel_rx {
        if rx.wait_for(|cancelled| *cancelled).await.is_ok() {
            return;
        }
    }
    std::future::pending::<()>().await
}

async fn read_all<R: AsyncRead + Unpin>(mut reader: R) -> Vec<u8> {
    let mut buf = Vec::new();
    let _ = reader.read_to_end(&mut buf).await;
    buf
}

/// Nothing is waited for once the process was killed.
fn drain_timeout(status: &MediaResult<ExitStatus>) -> Duration {
    if status.is_ok() {
        PIPE_DRAIN_TIMEOUT
    } else {
        Duration::ZERO
    }
}

/// Join a pipe reader, aborting it if the pipe stays open past `drain`.
async fn join_output<T>(handle: Option<JoinHandle<T>>, drain: Duration) -> Option<T> {
    let mut handle = handle?;
    match tokio::time::timeout(drain, &mut handle).await {
        Ok(result) => result.ok(),
        Err(_) => {
            handle.abort();
            None
        }
    }
}

fn check_status(status: ExitStatus, stderr: String) -> MediaResult<()> {
    if status.success() {
        return Ok(());
    }

    debug!("yt-dlp stderr: {}", stderr);
    Err(MediaError::ytdlp_failed(
        error_summary(&stderr),
        Some(stderr),
        status.code(),
    ))
}

/// Pick the line of stderr that best explains a failure.
///
/// yt-dlp prefixes fatal problems with `ERROR:`; the last such line wins,
/// otherwise the last non-empty line.
pub fn error_summary(stderr: &str) -> String {
    let lines: Vec<&str> = stderr.lines().map(str::trim).filter(|l| !l.is_empty()).collect();

    lines
        .iter()
        .rev()
        .find(|l| l.starts_with("ERROR:"))
        .or_else(|| lines.last())
        .map(|l| l.to_string())
        .unwrap_or_else(|| "Unknown error".to_string())
}

/// Check if yt-dlp is available.
pub fn check_ytdlp(binary: impl AsRef<Path>) -> MediaResult<PathBuf> {
    let binary = binary.as_ref();
    which::which(binary).map_err(|_| MediaError::YtDlpNotFound(binary.display().to_string()))
}

/// Check if FFmpeg is available.
pub fn check_ffmpeg() -> MediaResult<PathBuf> {
    which::which("ffmpeg").map_err(|_| MediaError::FfmpegNotFound)
}
