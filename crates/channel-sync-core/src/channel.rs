use channel_sync_config::ChannelConfig;
use channel_sync_models::{ChannelListing, VideoEntry};
use channel_sync_sources::{normalize_channel_url, MetadataService, VideoPlatform};
use regex::Regex;
use serde::Serialize;
use std::collections::HashSet;
use std::sync::OnceLock;
use tracing::{debug, info, warn};

use crate::breaker::{CircuitBreaker, BLOCKED_ATTEMPT_THRESHOLD};
use crate::resolution::{DateResolution, DateResolver};

const DEFAULT_CHANNEL_NAME: &str = "channel";

fn whitespace_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+").expect("static regex"))
}

fn unsafe_chars_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^A-Za-z0-9._-]").expect("static regex"))
}

/// File-system safe channel name, used for the channel directory and its archive file.
pub fn channel_slug(name: &str) -> String {
    let collapsed = whitespace_re().replace_all(name.trim(), "_");
    let safe = unsafe_chars_re().replace_all(&collapsed, "_");
    let trimmed = safe.trim_matches(|c| c == '.' || c == '_' || c == '-');
    if trimmed.is_empty() {
        DEFAULT_CHANNEL_NAME.to_string()
    } else {
        trimmed.to_string()
    }
}

/// Display name for a channel: explicit config name, then the listing's own name.
pub fn channel_display_name(channel: &ChannelConfig, listing: &ChannelListing) -> String {
    channel
        .name
        .as_deref()
        .or_else(|| listing.display_name())
        .unwrap_or(DEFAULT_CHANNEL_NAME)
        .to_string()
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ChannelScanStats {
    pub entries: usize,
    pub mapped: usize,
    pub skipped_older: usize,
    pub skipped_unknown_date: usize,
    pub api_resolved: usize,
    pub blocked_attempts: usize,
    /// Entries left unexamined after the scan stopped.
    pub abandoned: usize,
    pub scan_aborted: bool,
}

/// Entries of one channel that passed the date gate, in listing order, one per watch URL.
#[derive(Debug, Clone)]
pub struct ChannelScan {
    pub name: String,
    pub slug: String,
    pub selected: Vec<VideoEntry>,
    pub stats: ChannelScanStats,
}

/// Flat listing; failures and empty output both yield an empty listing.
pub async fn list_channel(platform: &dyn VideoPlatform, channel: &ChannelConfig) -> ChannelListing {
    let listing_url = normalize_channel_url(&channel.url);
    match platform.list_channel(&listing_url).await {
        Ok(listing) => listing,
        Err(e) => {
            warn!(channel_url = %listing_url, error = %e, "Channel listing failed, treating as empty");
            ChannelListing::default()
        }
    }
}

/// List a channel, resolve publish dates and keep entries published on or after `since_date`.
///
/// Entries whose date cannot be verified are excluded. Tier-3 extraction stops the
/// whole scan after [`BLOCKED_ATTEMPT_THRESHOLD`] consecutive blocked attempts.
pub async fn scan_channel(
    platform: &dyn VideoPlatform,
    metadata: Option<&dyn MetadataService>,
    channel: &ChannelConfig,
) -> ChannelScan {
    let listing = list_channel(platform, channel).await;
    let name = channel_display_name(channel, &listing);
    let slug = channel_slug(&name);

    let mut stats = ChannelScanStats::default();
    let mut entries: Vec<VideoEntry> = Vec::new();
    for metadata in listing.entries() {
        stats.entries += 1;
        // Only entries with an id can be gated by the archive
        match VideoEntry::from_metadata(metadata).filter(|e| e.video_id.is_some()) {
            Some(entry) => entries.push(entry),
            None => {
                debug!(channel = %name, url = ?metadata.url, "Entry has no video id, dropping");
                stats.skipped_unknown_date += 1;
            }
        }
    }
    info!(channel = %name, entries = stats.entries, "Channel listed");

    let resolver = DateResolver::new(platform, metadata);
    let pending_ids: Vec<String> = entries
        .iter()
        .filter(|e| e.published_date.is_none())
        .filter_map(|e| e.video_id.clone())
        .collect();
    let lookup = resolver.lookup_batched(&pending_ids).await;
    for entry in entries.iter_mut().filter(|e| e.published_date.is_none()) {
        if let Some(date) = entry.video_id.as_ref().and_then(|id| lookup.dates.get(id)) {
            entry.published_date = Some(*date);
            stats.api_resolved += 1;
        }
    }
    let fallback = resolver.fallback_enabled(&lookup);

    let mut breaker = CircuitBreaker::new(BLOCKED_ATTEMPT_THRESHOLD);
    let mut selected = Vec::new();
    let mut queued = HashSet::new();
    let total = entries.len();
    for (index, mut entry) in entries.into_iter().enumerate() {
        if entry.published_date.is_none() && fallback {
            match resolver.resolve_by_extraction(&entry.watch_url).await {
                DateResolution::Resolved(date) => {
                    breaker.record_success();
                    entry.published_date = Some(date);
                }
                DateResolution::Unknown => breaker.record_success(),
                DateResolution::Blocked => {
                    stats.blocked_attempts += 1;
                    if breaker.record_failure() {
                        stats.skipped_unknown_date += 1;
                        stats.abandoned = total - index - 1;
                        stats.scan_aborted = true;
                        warn!(
                            channel = %name,
                            consecutive = breaker.consecutive(),
                            abandoned = stats.abandoned,
                            "Upstream keeps blocking metadata requests, stopping channel scan. Refresh cookies and retry"
                        );
                        break;
                    }
                }
            }
        }

        match entry.published_date {
            None => {
                debug!(channel = %name, url = %entry.watch_url, "Publish date unknown, skipping");
                stats.skipped_unknown_date += 1;
            }
            Some(date) if date < channel.since_date => {
                stats.skipped_older += 1;
            }
            Some(_) => {
                if queued.insert(entry.watch_url.clone()) {
                    stats.mapped += 1;
                    selected.push(entry);
                }
            }
        }
    }

    info!(
        channel = %name,
        mapped = stats.mapped,
        skipped_older = stats.skipped_older,
        skipped_unknown_date = stats.skipped_unknown_date,
        api_resolved = stats.api_resolved,
        blocked_attempts = stats.blocked_attempts,
        "Channel scan complete"
    );

    ChannelScan {
        name,
        slug,
        selected,
        stats,
    }
}
