use chrono::NaiveDate;
use channel_sync_models::media_file::leading_date;
use std::collections::{BTreeSet, HashSet};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Finds managed media files under a channel directory.
pub struct MediaScanner {
    input_root: PathBuf,
    allowed_extensions: HashSet<String>,
}

impl MediaScanner {
    /// `allowed_extensions` are matched case-insensitively, with or without a leading dot.
    pub fn new(input_root: impl Into<PathBuf>, allowed_extensions: &[String]) -> Self {
        let allowed_extensions = allowed_extensions
            .iter()
            .map(|ext| ext.trim().trim_start_matches('.').to_lowercase())
            .filter(|ext| !ext.is_empty())
            .collect();
        Self {
            input_root: input_root.into(),
            allowed_extensions,
        }
    }

    fn is_allowed(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| self.allowed_extensions.contains(&ext.to_lowercase()))
            .unwrap_or(false)
    }

    fn relative(&self, path: &Path) -> Option<String> {
        let relative = path.strip_prefix(&self.input_root).ok()?;
        let parts: Vec<String> = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();
        Some(parts.join("/"))
    }

    /// Forward-slash paths relative to the input root, sorted and deduplicated.
    ///
    /// With a cutoff, only files named `YYYY-MM-DD__...` dated on or after it are kept.
    pub fn scan(&self, channel_dir: &Path, cutoff: Option<NaiveDate>) -> Vec<String> {
        if !channel_dir.is_dir() {
            debug!(dir = %channel_dir.display(), "Channel directory does not exist yet");
            return Vec::new();
        }

        let mut files = BTreeSet::new();
        for entry in WalkDir::new(channel_dir).follow_links(false) {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!(error = %e, "Skipping unreadable path");
                    continue;
                }
            };
            if !entry.file_type().is_file() || !self.is_allowed(entry.path()) {
                continue;
            }
            if let Some(cutoff) = cutoff {
                let name = entry.file_name().to_string_lossy();
                match leading_date(&name) {
                    Some(date) if date >= cutoff => {}
                    _ => continue,
                }
            }
            match self.relative(entry.path()) {
                Some(relative) => {
                    files.insert(relative);
                }
                None => warn!(path = %entry.path().display(), "File outside the input root, ignoring"),
            }
        }
        files.into_iter().collect()
    }
}
