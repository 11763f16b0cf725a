pub mod args;
pub mod client;

pub use client::YtDlpPlatform;

use std::path::PathBuf;
use url::Url;

/// Where yt-dlp gets its cookies from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CookieSource {
    /// Netscape cookie file
    File(PathBuf),
    /// Cookies read from a local browser profile, e.g. `chrome`
    Browser(String),
    None,
}

impl CookieSource {
    pub fn to_args(&self) -> Vec<String> {
        match self {
            CookieSource::File(path) => vec!["--cookies".to_string(), path.to_string_lossy().into_owned()],
            CookieSource::Browser(browser) => vec!["--cookies-from-browser".to_string(), browser.clone()],
            CookieSource::None => Vec::new(),
        }
    }
}

const LISTING_SUFFIXES: [&str; 5] = ["/videos", "/shorts", "/streams", "/live", "/featured"];
const CHANNEL_PREFIXES: [&str; 4] = ["/@", "/channel/", "/c/", "/user/"];

/// Rewrite a bare YouTube channel/profile URL to its videos listing.
///
/// URLs that already point at a listing tab, and non-YouTube URLs, are returned unchanged.
pub fn normalize_channel_url(channel_url: &str) -> String {
    let trimmed = channel_url.trim();
    let Ok(mut parsed) = Url::parse(trimmed) else {
        return channel_url.to_string();
    };
    let is_youtube = parsed
        .host_str()
        .map(|host| host.to_ascii_lowercase().contains("youtube.com"))
        .unwrap_or(false);
    if !is_youtube {
        return channel_url.to_string();
    }

    let path = parsed.path().trim_end_matches('/').to_string();
    if LISTING_SUFFIXES.iter().any(|suffix| path.ends_with(suffix)) {
        return channel_url.to_string();
    }
    if CHANNEL_PREFIXES.iter().any(|prefix| path.starts_with(prefix)) {
        parsed.set_path(&format!("{}/videos", path));
        return parsed.to_string();
    }
    channel_url.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_bare_channel_urls() {
        assert_eq!(
            normalize_channel_url("https://www.youtube.com/@someone"),
            "https://www.youtube.com/@someone/videos"
        );
        assert_eq!(
            normalize_channel_url("https://www.youtube.com/channel/UC123/"),
            "https://www.youtube.com/channel/UC123/videos"
        );
        assert_eq!(
            normalize_channel_url("https://youtube.com/c/Name"),
            "https://youtube.com/c/Name/videos"
        );
    }

    #[test]
    fn test_normalize_keeps_listing_and_foreign_urls() {
        assert_eq!(
            normalize_channel_url("https://www.youtube.com/@someone/shorts"),
            "https://www.youtube.com/@someone/shorts"
        );
        assert_eq!(
            normalize_channel_url("https://www.youtube.com/playlist?list=PL1"),
            "https://www.youtube.com/playlist?list=PL1"
        );
        assert_eq!(normalize_channel_url("https://vimeo.com/someone"), "https://vimeo.com/someone");
    }

    #[test]
    fn test_cookie_args() {
        assert_eq!(
            CookieSource::Browser("chrome".to_string()).to_args(),
            vec!["--cookies-from-browser", "chrome"]
        );
        assert!(CookieSource::None.to_args().is_empty());
    }
}
