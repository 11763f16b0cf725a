use channel_sync_models::VideoEntry;
use channel_sync_sources::{DownloadRequest, VideoPlatform};
use serde::Serialize;
use std::collections::HashSet;
use std::path::Path;
use tracing::{debug, error, info, warn};

use crate::archive::DownloadArchive;
use crate::breaker::{CircuitBreaker, CHALLENGE_FORMAT_THRESHOLD};

/// Why a channel's download queue stopped early.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DownloadAbort {
    AuthBlocked,
    ChallengeFormat,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DownloadStats {
    pub downloaded: usize,
    pub failed: usize,
    pub skipped_archived: usize,
    pub aborted: Option<DownloadAbort>,
}

/// Fetches selected entries into a channel directory, gated by the channel's archive.
pub struct Downloader<'a> {
    platform: &'a dyn VideoPlatform,
    format: String,
}

impl<'a> Downloader<'a> {
    pub fn new(platform: &'a dyn VideoPlatform, format: impl Into<String>) -> Self {
        Self {
            platform,
            format: format.into(),
        }
    }

    /// Download entries in order. Duplicate watch URLs are fetched once.
    ///
    /// Never fails: per-item errors are counted; an auth block or a run of
    /// challenge/format failures stops the remaining queue.
    pub async fn download_all(
        &self,
        entries: &[VideoEntry],
        archive: &mut DownloadArchive,
        output_dir: &Path,
    ) -> DownloadStats {
        let mut stats = DownloadStats::default();
        let mut streak = CircuitBreaker::new(CHALLENGE_FORMAT_THRESHOLD);
        let mut seen = HashSet::new();

        for entry in entries.iter().filter(|e| seen.insert(e.watch_url.as_str())) {
            if let Some(id) = entry.video_id.as_deref() {
                if archive.contains(id) {
                    debug!(video_id = id, "Already in download archive");
                    stats.skipped_archived += 1;
                    continue;
                }
            }

            let request = DownloadRequest {
                url: entry.watch_url.clone(),
                output_dir: output_dir.to_path_buf(),
                format: self.format.clone(),
            };
            match self.platform.download(&request).await {
                Ok(()) => {
                    stats.downloaded += 1;
                    streak.record_success();
                    info!(url = %entry.watch_url, "Downloaded");
                    if let Some(id) = entry.video_id.as_deref() {
                        if let Err(e) = archive.append(id) {
                            warn!(video_id = id, error = %e, "Failed to record download in archive");
                        }
                    }
                }
                Err(e) if e.is_auth_block() => {
                    stats.failed += 1;
                    stats.aborted = Some(DownloadAbort::AuthBlocked);
                    error!(
                        url = %entry.watch_url,
                        error = %e,
                        "Upstream requires sign-in. Refresh the cookie file (youtube.cookies_path) and rerun; stopping this channel"
                    );
                    break;
                }
                Err(e) if e.is_challenge_format() => {
                    stats.failed += 1;
                    warn!(url = %entry.watch_url, error = %e, streak = streak.consecutive() + 1, "Format unavailable");
                    if streak.record_failure() {
                        stats.aborted = Some(DownloadAbort::ChallengeFormat);
                        error!(
                            consecutive = streak.consecutive(),
                            "Repeated challenge/format failures, stopping this channel"
                        );
                        break;
                    }
                }
                Err(e) => {
                    stats.failed += 1;
                    warn!(url = %entry.watch_url, error = %e, "Download failed");
                }
            }
        }
        stats
    }
}
