// Reconciles the managed-file set of a run against the persisted task queue

use channel_sync_config::normalize_rel;
use channel_sync_models::TaskStatus;
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};
use tracing::{debug, info};

use crate::queue::{TaskQueue, TaskRow, DUBBING, SOURCE_LANGUAGE, STATUS, TARGET_LANGUAGE, VIDEO_FILE};

/// Languages configured for the channel a managed file belongs to.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LanguagePreference {
    pub source_language: Option<String>,
    pub target_language: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MergeStats {
    pub kept_unmanaged: usize,
    pub dropped_stale: usize,
    pub managed: usize,
}

pub fn is_remote(video_file: &str) -> bool {
    let lower = video_file.trim().to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

fn normalize_key(video_file: &str) -> String {
    let normalized = normalize_rel(video_file.trim());
    normalized.trim_start_matches("./").to_string()
}

fn normalize_prefix(prefix: &str) -> String {
    let normalized = normalize_key(prefix);
    let trimmed = normalized.trim_matches('/');
    if trimmed == "." {
        String::new()
    } else {
        trimmed.to_string()
    }
}

/// Whether a queue value lies inside the managed subtree `prefix`.
///
/// Remote URLs and empty values are never managed. An empty prefix manages every local path.
pub fn is_managed(video_file: &str, prefix: &str) -> bool {
    if video_file.trim().is_empty() || is_remote(video_file) {
        return false;
    }
    let prefix = normalize_prefix(prefix);
    if prefix.is_empty() {
        return true;
    }
    let key = normalize_key(video_file);
    key == prefix || key.starts_with(&format!("{}/", prefix))
}

/// Merge `managed_files` into `existing`.
///
/// Rows outside the managed prefix are copied forward unchanged and in order.
/// Managed rows absent from `managed_files` are dropped. Each managed file then
/// gets one row, in sorted order, carrying over its previous cells except the
/// languages (overwritten when configured), `Dubbing` (reset to 0) and `Status`
/// (kept only when `Done`).
pub fn merge_task_queue(
    existing: &TaskQueue,
    managed_prefix: &str,
    managed_files: &[String],
    languages: &HashMap<String, LanguagePreference>,
) -> (TaskQueue, MergeStats) {
    let managed_set: BTreeSet<String> = managed_files.iter().map(|f| normalize_key(f)).collect();

    let mut previous: HashMap<String, &TaskRow> = HashMap::new();
    for row in existing.rows() {
        let video_file = row.video_file();
        if !video_file.trim().is_empty() && !is_remote(video_file) {
            previous.insert(normalize_key(video_file), row);
        }
    }

    let mut merged = TaskQueue::with_columns(existing.columns().to_vec());
    let mut stats = MergeStats::default();

    for row in existing.rows() {
        let video_file = row.video_file();
        if !is_managed(video_file, managed_prefix) {
            merged.push(row.clone());
            stats.kept_unmanaged += 1;
        } else if !managed_set.contains(&normalize_key(video_file)) {
            info!(video_file, "Managed file no longer present, dropping task");
            stats.dropped_stale += 1;
        }
    }

    for path in &managed_set {
        let mut row = previous.get(path).map(|r| (*r).clone()).unwrap_or_default();
        let prior_status = TaskStatus::parse(row.status());

        row.set(VIDEO_FILE, path.clone());
        if let Some(preference) = languages.get(path) {
            if let Some(source) = preference.source_language.as_deref().filter(|v| !v.is_empty()) {
                row.set(SOURCE_LANGUAGE, source);
            }
            if let Some(target) = preference.target_language.as_deref().filter(|v| !v.is_empty()) {
                row.set(TARGET_LANGUAGE, target);
            }
        }
        row.set(DUBBING, "0");
        row.set(STATUS, prior_status.normalized_for_queue().to_cell());

        merged.push(row);
        stats.managed += 1;
    }

    debug!(
        kept_unmanaged = stats.kept_unmanaged,
        dropped_stale = stats.dropped_stale,
        managed = stats.managed,
        "Task queue merged"
    );
    (merged, stats)
}
