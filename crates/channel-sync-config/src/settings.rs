use anyhow::{Context, Result};
use std::path::PathBuf;
use tracing::debug;

/// Dotted keys this workspace reads from or writes to the settings store.
pub mod keys {
    pub const SOURCE_LANGUAGE: &str = "whisper.language";
    pub const TARGET_LANGUAGE: &str = "target_language";
    pub const COOKIES_PATH: &str = "youtube.cookies_path";
    pub const DATA_API_KEY: &str = "youtube.data_api_key";
    pub const ALLOWED_VIDEO_FORMATS: &str = "allowed_video_formats";
}

/// Key/value configuration shared with the downstream processing pipeline.
///
/// Keys are dotted paths into nested tables (`whisper.language`). A `None`
/// value passed to [`SettingsStore::update_key`] removes the key.
pub trait SettingsStore: Send {
    fn load_key(&self, key: &str) -> Option<toml::Value>;
    fn update_key(&mut self, key: &str, value: Option<toml::Value>) -> Result<()>;

    fn load_string(&self, key: &str) -> Option<String> {
        match self.load_key(key)? {
            toml::Value::String(s) => Some(s),
            other => Some(other.to_string()),
        }
    }

    fn load_string_list(&self, key: &str) -> Option<Vec<String>> {
        match self.load_key(key)? {
            toml::Value::Array(values) => Some(
                values
                    .into_iter()
                    .filter_map(|v| v.as_str().map(str::to_string))
                    .collect(),
            ),
            _ => None,
        }
    }
}

/// Settings store backed by a TOML file. Every update is written through to disk.
pub struct TomlSettingsStore {
    path: PathBuf,
    table: toml::Table,
}

impl TomlSettingsStore {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            table: toml::Table::new(),
        }
    }

    pub fn open(path: PathBuf) -> Result<Self> {
        let mut store = Self::new(path);
        store.load()?;
        Ok(store)
    }

    pub fn load(&mut self) -> Result<()> {
        if self.path.exists() {
            let content = std::fs::read_to_string(&self.path)
                .with_context(|| format!("failed to read settings {}", self.path.display()))?;
            self.table = toml::from_str(&content)
                .with_context(|| format!("invalid settings file {}", self.path.display()))?;
        }
        Ok(())
    }

    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(&self.table)?;
        std::fs::write(&self.path, content)?;
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<&toml::Value> {
        let mut parts = key.split('.').peekable();
        let mut table = &self.table;
        while let Some(part) = parts.next() {
            let value = table.get(part)?;
            if parts.peek().is_none() {
                return Some(value);
            }
            table = value.as_table()?;
        }
        None
    }

    pub fn set(&mut self, key: &str, value: toml::Value) {
        let parts: Vec<&str> = key.split('.').collect();
        let (last, parents) = match parts.split_last() {
            Some(split) => split,
            None => return,
        };
        let mut table = &mut self.table;
        for part in parents {
            let entry = table
                .entry(part.to_string())
                .or_insert_with(|| toml::Value::Table(toml::Table::new()));
            if !entry.is_table() {
                *entry = toml::Value::Table(toml::Table::new());
            }
            table = match entry.as_table_mut() {
                Some(t) => t,
                None => return,
            };
        }
        table.insert(last.to_string(), value);
    }

    pub fn remove(&mut self, key: &str) {
        let parts: Vec<&str> = key.split('.').collect();
        let (last, parents) = match parts.split_last() {
            Some(split) => split,
            None => return,
        };
        let mut table = &mut self.table;
        for part in parents {
            table = match table.get_mut(*part).and_then(|v| v.as_table_mut()) {
                Some(t) => t,
                None => return,
            };
        }
        table.remove(*last);
    }
}

impl SettingsStore for TomlSettingsStore {
    fn load_key(&self, key: &str) -> Option<toml::Value> {
        self.get(key).cloned()
    }

    fn update_key(&mut self, key: &str, value: Option<toml::Value>) -> Result<()> {
        match value {
            Some(value) => self.set(key, value),
            None => self.remove(key),
        }
        self.save()?;
        debug!(key, "settings key updated");
        Ok(())
    }
}
