pub mod config;
pub mod paths;
pub mod settings;

pub use config::{ChannelConfig, ChannelSettings, Config, ConfigError, GlobalConfig, Resolution, default_allowed_video_formats};
pub use paths::{PathManager, normalize_rel, workdir_base_path};
pub use settings::{SettingsStore, TomlSettingsStore, keys};
