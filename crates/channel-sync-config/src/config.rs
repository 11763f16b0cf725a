use chrono::NaiveDate;
use channel_sync_models::parse_since_date;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Fatal configuration problems. Any of these aborts the run before a channel is touched.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config not found: {0}")]
    NotFound(PathBuf),
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("no channels configured. Add at least one [[channels]] entry")]
    NoChannels,
    #[error("channel #{index} must provide 'url'")]
    MissingUrl { index: usize },
    #[error("channel '{url}' is missing required key: since_date")]
    MissingSinceDate { url: String },
    #[error("invalid since_date '{value}' for channel '{url}'. Use YYYY-MM-DD")]
    InvalidDate { url: String, value: String },
    #[error("global.download_root must be inside {input_root}, got {path}")]
    DownloadRootOutsideInput { path: PathBuf, input_root: PathBuf },
    #[error("invalid resolution '{0}'. Use \"best\" or a numeric height such as 1080")]
    InvalidResolution(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub global: GlobalConfig,
    #[serde(default)]
    pub channels: Vec<ChannelSettings>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GlobalConfig {
    #[serde(default = "default_download_root")]
    pub download_root: PathBuf,
    #[serde(default)]
    pub resolution: Resolution,
    /// Settings-store keys overridden for the duration of a run, applied in file order
    #[serde(default)]
    pub config_overrides: toml::Table,
    #[serde(default)]
    pub target_language: Option<String>,
    #[serde(default)]
    pub audio_notify_file: Option<PathBuf>,
    /// Media extensions the local scan tracks (without the dot)
    #[serde(default)]
    pub allowed_video_formats: Option<Vec<String>>,
    /// argv of the per-item processing pipeline; the video file is appended
    #[serde(default)]
    pub pipeline_command: Option<Vec<String>>,
    #[serde(default)]
    pub yt_dlp_path: Option<PathBuf>,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            download_root: default_download_root(),
            resolution: Resolution::default(),
            config_overrides: toml::Table::new(),
            target_language: None,
            audio_notify_file: None,
            allowed_video_formats: None,
            pipeline_command: None,
            yt_dlp_path: None,
        }
    }
}

/// A channel entry as written in the file. Validated into [`ChannelConfig`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChannelSettings {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub since_date: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub source_language: Option<String>,
    #[serde(default)]
    pub target_language: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChannelConfig {
    pub url: String,
    pub since_date: NaiveDate,
    pub name: Option<String>,
    pub source_language: Option<String>,
    pub target_language: Option<String>,
}

/// Download resolution ceiling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Resolution {
    #[default]
    Best,
    MaxHeight(u32),
}

impl Resolution {
    pub fn parse(value: &str) -> Result<Self, ConfigError> {
        let trimmed = value.trim();
        if trimmed.eq_ignore_ascii_case("best") {
            return Ok(Resolution::Best);
        }
        trimmed
            .parse::<u32>()
            .map(Resolution::MaxHeight)
            .map_err(|_| ConfigError::InvalidResolution(value.to_string()))
    }

    /// yt-dlp format selector for this ceiling.
    pub fn format_selector(&self) -> String {
        match self {
            Resolution::Best => "bestvideo+bestaudio/best".to_string(),
            Resolution::MaxHeight(height) => format!(
                "bestvideo[height<={h}]+bestaudio/best[height<={h}]",
                h = height
            ),
        }
    }
}

impl Serialize for Resolution {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Resolution::Best => serializer.serialize_str("best"),
            Resolution::MaxHeight(height) => serializer.serialize_u32(*height),
        }
    }
}

impl<'de> Deserialize<'de> for Resolution {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Height(u32),
            Text(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Height(height) => Ok(Resolution::MaxHeight(height)),
            Raw::Text(text) => Resolution::parse(&text).map_err(serde::de::Error::custom),
        }
    }
}

fn default_download_root() -> PathBuf {
    PathBuf::from("batch/input/channels")
}

pub fn default_allowed_video_formats() -> Vec<String> {
    ["mp4", "mov", "avi", "mkv", "flv", "wmv", "webm"]
        .iter()
        .map(|ext| ext.to_string())
        .collect()
}

impl Config {
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Validate every channel entry up front. The first problem found is returned.
    pub fn validated_channels(&self) -> Result<Vec<ChannelConfig>, ConfigError> {
        if self.channels.is_empty() {
            return Err(ConfigError::NoChannels);
        }

        let mut out = Vec::with_capacity(self.channels.len());
        for (index, channel) in self.channels.iter().enumerate() {
            let url = non_empty(&channel.url).ok_or(ConfigError::MissingUrl { index })?;
            let raw_date = non_empty(&channel.since_date)
                .ok_or_else(|| ConfigError::MissingSinceDate { url: url.clone() })?;
            let since_date = parse_since_date(&raw_date).ok_or_else(|| ConfigError::InvalidDate {
                url: url.clone(),
                value: raw_date.clone(),
            })?;

            out.push(ChannelConfig {
                url,
                since_date,
                name: non_empty(&channel.name),
                source_language: non_empty(&channel.source_language),
                target_language: non_empty(&channel.target_language),
            });
        }
        Ok(out)
    }

    /// Overrides applied for the run: `config_overrides`, plus `target_language`
    /// when set globally and not already overridden.
    pub fn run_overrides(&self) -> Vec<(String, toml::Value)> {
        let mut overrides: Vec<(String, toml::Value)> = self
            .global
            .config_overrides
            .iter()
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();
        if let Some(target) = non_empty(&self.global.target_language) {
            if !overrides.iter().any(|(key, _)| key == crate::keys::TARGET_LANGUAGE) {
                overrides.push((crate::keys::TARGET_LANGUAGE.to_string(), toml::Value::String(target)));
            }
        }
        overrides
    }
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}
