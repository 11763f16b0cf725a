pub mod archive;
pub mod config;
pub mod sync;

use channel_sync_config::{Config, PathManager};
use color_eyre::Result;
use std::path::PathBuf;

pub fn path_manager(workdir: Option<PathBuf>) -> PathManager {
    match workdir {
        Some(dir) => PathManager::new(dir),
        None => PathManager::default(),
    }
}

/// Load the run configuration, `batch/channel_auto.toml` under the working directory by default.
pub fn load_config(paths: &PathManager, config: Option<PathBuf>) -> Result<(PathBuf, Config)> {
    let file = match config {
        Some(path) => path,
        None => paths.default_config_file(),
    };
    let config = Config::load_from_file(&file)
        .map_err(|e| color_eyre::eyre::eyre!("Failed to load config from {}: {}", file.display(), e))?;
    Ok((file, config))
}
