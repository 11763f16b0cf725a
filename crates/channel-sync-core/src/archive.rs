use anyhow::{Context, Result};
use std::collections::HashSet;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

const ARCHIVE_EXTRACTOR: &str = "youtube";

/// Per-channel ledger of downloaded ids. Append-only, never pruned.
///
/// Lines are written in yt-dlp's `--download-archive` format (`youtube <id>`);
/// bare `<id>` lines are accepted when reading.
#[derive(Debug)]
pub struct DownloadArchive {
    path: PathBuf,
    ids: HashSet<String>,
}

/// Id recorded on one archive line.
pub fn parse_archive_line(line: &str) -> Option<&str> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return None;
    }
    match line.split_once(char::is_whitespace) {
        Some((_, id)) => Some(id.trim()).filter(|id| !id.is_empty()),
        None => Some(line),
    }
}

impl DownloadArchive {
    /// Load the archive at `path`; a missing file is an empty archive.
    pub fn load(path: &Path) -> Result<Self> {
        let mut ids = HashSet::new();
        if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read download archive {}", path.display()))?;
            ids.extend(content.lines().filter_map(parse_archive_line).map(str::to_string));
        }
        debug!(path = %path.display(), ids = ids.len(), "Loaded download archive");
        Ok(Self {
            path: path.to_path_buf(),
            ids,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn contains(&self, video_id: &str) -> bool {
        self.ids.contains(video_id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// All recorded ids, sorted.
    pub fn ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.ids.iter().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    /// Record a downloaded id. The line is flushed to disk before returning.
    pub fn append(&mut self, video_id: &str) -> Result<()> {
        if self.ids.contains(video_id) {
            return Ok(());
        }
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("failed to open download archive {}", self.path.display()))?;
        writeln!(file, "{} {}", ARCHIVE_EXTRACTOR, video_id)?;
        file.sync_data()?;
        self.ids.insert(video_id.to_string());
        Ok(())
    }
}
