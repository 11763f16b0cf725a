use async_trait::async_trait;
use channel_sync_models::{ChannelListing, VideoMetadata};
use std::path::PathBuf;
use std::process::{Output, Stdio};
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, trace, warn};

use super::args::{download_args, listing_args, metadata_args};
use super::CookieSource;
use crate::error::SourceError;
use crate::traits::{DownloadRequest, VideoPlatform};

const LISTING_TIMEOUT_SECS: u64 = 600;
const METADATA_TIMEOUT_SECS: u64 = 120;
const DOWNLOAD_TIMEOUT_SECS: u64 = 6 * 60 * 60;

/// A runnable yt-dlp: a program plus any leading arguments (`python3 -m yt_dlp`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct YtDlpCommand {
    pub program: PathBuf,
    pub prefix: Vec<String>,
}

impl YtDlpCommand {
    /// Locate yt-dlp: the pinned path if it exists, then `yt-dlp` on PATH,
    /// then a Python interpreter running the `yt_dlp` module.
    pub fn locate(pinned: Option<&PathBuf>) -> Result<Self, SourceError> {
        if let Some(path) = pinned {
            if path.exists() {
                return Ok(Self { program: path.clone(), prefix: Vec::new() });
            }
            warn!(path = %path.display(), "Configured yt-dlp path does not exist, searching PATH");
        }
        if let Ok(path) = which::which("yt-dlp") {
            return Ok(Self { program: path, prefix: Vec::new() });
        }
        for python in ["python3", "python"] {
            if let Ok(path) = which::which(python) {
                return Ok(Self {
                    program: path,
                    prefix: vec!["-m".to_string(), "yt_dlp".to_string()],
                });
            }
        }
        Err(SourceError::ToolMissing)
    }

    fn display_name(&self) -> String {
        if self.prefix.is_empty() {
            self.program.display().to_string()
        } else {
            format!("{} {}", self.program.display(), self.prefix.join(" "))
        }
    }
}

/// The video platform, reached through the yt-dlp command-line tool.
pub struct YtDlpPlatform {
    pinned: Option<PathBuf>,
    cookies: CookieSource,
}

impl YtDlpPlatform {
    pub fn new(pinned: Option<PathBuf>, cookies: CookieSource) -> Self {
        Self { pinned, cookies }
    }

    pub fn cookies(&self) -> &CookieSource {
        &self.cookies
    }

    async fn run(&self, args: &[String], timeout_secs: u64) -> Result<Output, SourceError> {
        let command = YtDlpCommand::locate(self.pinned.as_ref())?;
        let program = command.display_name();
        trace!(program = %program, ?args, "Running yt-dlp");

        let child = Command::new(&command.program)
            .args(&command.prefix)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output();

        match tokio::time::timeout(Duration::from_secs(timeout_secs), child).await {
            Ok(Ok(output)) => Ok(output),
            Ok(Err(source)) => Err(SourceError::Spawn { program, source }),
            Err(_) => Err(SourceError::Timeout { program, seconds: timeout_secs }),
        }
    }
}

/// The most useful line of yt-dlp's stderr: the last `ERROR:` line, else the last non-empty one.
pub(crate) fn stderr_summary(stderr: &[u8]) -> String {
    let text = String::from_utf8_lossy(stderr);
    let lines: Vec<&str> = text.lines().map(str::trim).filter(|l| !l.is_empty()).collect();
    lines
        .iter()
        .rev()
        .find(|l| l.starts_with("ERROR:"))
        .or_else(|| lines.last())
        .map(|l| l.to_string())
        .unwrap_or_else(|| "yt-dlp exited without output".to_string())
}

fn failure(output: &Output) -> SourceError {
    let message = stderr_summary(&output.stderr);
    let err = SourceError::from_upstream_message(message);
    debug!(code = ?output.status.code(), error = %err, "yt-dlp failed");
    err
}

#[async_trait]
impl VideoPlatform for YtDlpPlatform {
    fn platform_name(&self) -> &str {
        "yt-dlp"
    }

    async fn list_channel(&self, channel_url: &str) -> Result<ChannelListing, SourceError> {
        let output = self.run(&listing_args(channel_url, &self.cookies), LISTING_TIMEOUT_SECS).await?;

        // --ignore-errors can leave a non-zero exit alongside a usable listing.
        let stdout = String::from_utf8_lossy(&output.stdout);
        let payload = stdout.trim();
        if !payload.is_empty() {
            if !output.status.success() {
                warn!(channel_url, error = %stderr_summary(&output.stderr), "Channel listing finished with errors");
            }
            return serde_json::from_str::<ChannelListing>(payload)
                .map_err(|e| SourceError::Parse(format!("channel listing: {}", e)));
        }
        if output.status.success() {
            return Ok(ChannelListing::default());
        }
        Err(failure(&output))
    }

    async fn fetch_metadata(&self, watch_url: &str) -> Result<VideoMetadata, SourceError> {
        let output = self.run(&metadata_args(watch_url, &self.cookies), METADATA_TIMEOUT_SECS).await?;
        if !output.status.success() {
            return Err(failure(&output));
        }
        serde_json::from_slice::<VideoMetadata>(&output.stdout)
            .map_err(|e| SourceError::Parse(format!("video metadata: {}", e)))
    }

    async fn download(&self, request: &DownloadRequest) -> Result<(), SourceError> {
        let output = self.run(&download_args(request, &self.cookies), DOWNLOAD_TIMEOUT_SECS).await?;
        if output.status.success() {
            Ok(())
        } else {
            Err(failure(&output))
        }
    }
}
