//! Builds the upstream collaborators from configuration and the settings store.

use channel_sync_config::{keys, Config, SettingsStore};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::youtube::YouTubeDataApi;
use crate::ytdlp::{CookieSource, YtDlpPlatform};

pub const DATA_API_KEY_ENV: &str = "YOUTUBE_DATA_API_KEY";
const FALLBACK_COOKIE_BROWSER: &str = "chrome";

/// Pick the metadata API key: the environment wins over the settings store.
/// Blank values and unfilled `YOUR_...` placeholders count as absent.
pub fn select_data_api_key(env_value: Option<String>, configured: Option<String>) -> Option<String> {
    [env_value, configured]
        .into_iter()
        .flatten()
        .map(|key| key.trim().to_string())
        .find(|key| !key.is_empty() && !key.starts_with("YOUR_"))
}

pub fn resolve_data_api_key(settings: &dyn SettingsStore) -> Option<String> {
    select_data_api_key(
        std::env::var(DATA_API_KEY_ENV).ok(),
        settings.load_string(keys::DATA_API_KEY),
    )
}

pub struct SourceFactory {
    base_dir: PathBuf,
}

impl SourceFactory {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self { base_dir: base_dir.into() }
    }

    /// Cookie file from `youtube.cookies_path` when it exists, otherwise the local browser's cookies.
    pub fn cookie_source(&self, settings: &dyn SettingsStore) -> CookieSource {
        match settings.load_string(keys::COOKIES_PATH).filter(|p| !p.trim().is_empty()) {
            Some(configured) => {
                let path = self.resolve(Path::new(configured.trim()));
                if path.is_file() {
                    debug!(path = %path.display(), "Using cookie file");
                    CookieSource::File(path)
                } else {
                    warn!(path = %path.display(), "Cookie file not found, falling back to browser cookies");
                    CookieSource::Browser(FALLBACK_COOKIE_BROWSER.to_string())
                }
            }
            None => CookieSource::Browser(FALLBACK_COOKIE_BROWSER.to_string()),
        }
    }

    pub fn create_platform(&self, config: &Config, settings: &dyn SettingsStore) -> YtDlpPlatform {
        let pinned = config.global.yt_dlp_path.as_deref().map(|p| self.resolve(p));
        YtDlpPlatform::new(pinned, self.cookie_source(settings))
    }

    /// The metadata service, or `None` when no usable key is configured.
    pub fn create_metadata_service(&self, settings: &dyn SettingsStore) -> Option<YouTubeDataApi> {
        let key = resolve_data_api_key(settings)?;
        match YouTubeDataApi::new(key) {
            Ok(api) => {
                info!("Publish-date lookups will use the YouTube Data API");
                Some(api)
            }
            Err(e) => {
                warn!(error = %e, "Could not build the YouTube Data API client");
                None
            }
        }
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        }
    }
}
