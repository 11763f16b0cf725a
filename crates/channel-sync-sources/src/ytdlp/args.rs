use channel_sync_models::media_file::YT_DLP_OUTPUT_TEMPLATE;
use crate::traits::DownloadRequest;
use super::CookieSource;

pub fn listing_args(channel_url: &str, cookies: &CookieSource) -> Vec<String> {
    let mut args = vec![
        "--flat-playlist".to_string(),
        "--dump-single-json".to_string(),
        "--skip-download".to_string(),
        "--ignore-errors".to_string(),
        "--no-warnings".to_string(),
        "--socket-timeout".to_string(),
        "30".to_string(),
    ];
    args.extend(cookies.to_args());
    args.push(channel_url.to_string());
    args
}

pub fn metadata_args(watch_url: &str, cookies: &CookieSource) -> Vec<String> {
    let mut args = vec![
        "--dump-single-json".to_string(),
        "--skip-download".to_string(),
        "--no-playlist".to_string(),
        "--no-warnings".to_string(),
        "--socket-timeout".to_string(),
        "30".to_string(),
    ];
    args.extend(cookies.to_args());
    args.push(watch_url.to_string());
    args
}

pub fn download_args(request: &DownloadRequest, cookies: &CookieSource) -> Vec<String> {
    let template = request.output_dir.join(YT_DLP_OUTPUT_TEMPLATE);
    let mut args = vec![
        "-f".to_string(),
        request.format.clone(),
        "-o".to_string(),
        template.to_string_lossy().into_owned(),
        "--merge-output-format".to_string(),
        "mp4".to_string(),
        "--no-playlist".to_string(),
        "--windows-filenames".to_string(),
        "--no-progress".to_string(),
    ];
    args.extend(cookies.to_args());
    args.push(request.url.clone());
    args
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_download_args() {
        let request = DownloadRequest {
            url: "https://www.youtube.com/watch?v=abc".to_string(),
            output_dir: PathBuf::from("/work/batch/input/channels/foo"),
            format: "bestvideo+bestaudio/best".to_string(),
        };
        let args = download_args(&request, &CookieSource::File(PathBuf::from("/c.txt")));
        assert_eq!(args[0], "-f");
        assert_eq!(args[1], "bestvideo+bestaudio/best");
        assert_eq!(
            args[3],
            "/work/batch/input/channels/foo/%(upload_date>%Y-%m-%d)s__%(title).180B__[%(id)s].%(ext)s"
        );
        assert!(args.windows(2).any(|w| w[0] == "--cookies" && w[1] == "/c.txt"));
        assert_eq!(args.last().map(String::as_str), Some("https://www.youtube.com/watch?v=abc"));
        assert!(!args.iter().any(|a| a == "--download-archive"));
    }

    #[test]
    fn test_listing_args_are_flat() {
        let args = listing_args("https://www.youtube.com/@a/videos", &CookieSource::None);
        assert!(args.contains(&"--flat-playlist".to_string()));
        assert_eq!(args.last().map(String::as_str), Some("https://www.youtube.com/@a/videos"));
    }
}
