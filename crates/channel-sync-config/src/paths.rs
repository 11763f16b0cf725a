use crate::config::ConfigError;
use anyhow::Result;
use std::path::{Component, Path, PathBuf};

/// Get the working directory base from the environment, defaulting to the current directory
pub fn workdir_base_path() -> PathBuf {
    std::env::var("CHANNEL_SYNC_WORKDIR")
        .map(PathBuf::from)
        .or_else(|_| std::env::current_dir())
        .unwrap_or_else(|_| PathBuf::from("."))
}

/// Normalize a relative path string to forward slashes.
pub fn normalize_rel(path: &str) -> String {
    path.replace('\\', "/")
}

/// Every on-disk location a run touches, rooted at one working directory.
pub struct PathManager {
    base_dir: PathBuf,
}

impl PathManager {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        let base_dir = base_dir.into();
        let base_dir = if base_dir.is_absolute() {
            base_dir
        } else {
            std::env::current_dir()
                .map(|cwd| cwd.join(&base_dir))
                .unwrap_or(base_dir)
        };
        Self {
            base_dir: normalize_lexically(&base_dir),
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Root of everything the processing pipeline reads; queue paths are relative to it
    pub fn input_dir(&self) -> PathBuf {
        self.base_dir.join("batch").join("input")
    }

    pub fn state_dir(&self) -> PathBuf {
        self.base_dir.join("batch").join("state")
    }

    pub fn archive_dir(&self) -> PathBuf {
        self.state_dir().join("download_archive")
    }

    pub fn archive_file(&self, channel_slug: &str) -> PathBuf {
        self.archive_dir().join(format!("{}.txt", channel_slug))
    }

    pub fn tasks_file(&self) -> PathBuf {
        self.base_dir.join("batch").join("tasks_setting.csv")
    }

    pub fn default_config_file(&self) -> PathBuf {
        self.base_dir.join("batch").join("channel_auto.toml")
    }

    pub fn settings_file(&self) -> PathBuf {
        self.base_dir.join("settings.toml")
    }

    /// Resolve a configured download root and check it lies inside the input root.
    pub fn resolve_download_root(&self, download_root: &Path) -> Result<PathBuf, ConfigError> {
        let joined = if download_root.is_absolute() {
            download_root.to_path_buf()
        } else {
            self.base_dir.join(download_root)
        };
        let root = normalize_lexically(&joined);
        let input_root = self.input_dir();
        if !root.starts_with(&input_root) {
            return Err(ConfigError::DownloadRootOutsideInput {
                path: root,
                input_root,
            });
        }
        Ok(root)
    }

    /// Forward-slash path of `path` relative to the input root, if it lies inside it.
    pub fn relative_to_input(&self, path: &Path) -> Option<String> {
        let normalized = normalize_lexically(path);
        let relative = normalized.strip_prefix(self.input_dir()).ok()?;
        let parts: Vec<String> = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();
        Some(parts.join("/"))
    }

    pub fn ensure_directories(&self) -> Result<()> {
        std::fs::create_dir_all(self.input_dir())?;
        std::fs::create_dir_all(self.archive_dir())?;
        Ok(())
    }
}

impl Default for PathManager {
    fn default() -> Self {
        Self::new(workdir_base_path())
    }
}

/// Resolve `.` and `..` without touching the filesystem (the path may not exist yet).
fn normalize_lexically(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push(component);
                }
            }
            other => out.push(other),
        }
    }
    out
}
