use url::Url;

pub fn build_watch_url(video_id: &str) -> String {
    format!("https://www.youtube.com/watch?v={}", video_id)
}

/// Path prefixes whose next segment is the video id.
const ID_PATH_PREFIXES: [&str; 3] = ["shorts", "embed", "live"];

/// Extract a video id from a YouTube watch URL (`?v=`), a `/shorts/`, `/embed/`
/// or `/live/` path, or a `youtu.be` short link.
pub fn video_id_from_url(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let host = parsed.host_str()?.to_ascii_lowercase();

    if host.contains("youtube.com") {
        if let Some((_, value)) = parsed.query_pairs().find(|(key, _)| key == "v") {
            if !value.is_empty() {
                return Some(value.into_owned());
            }
        }
        let mut segments = parsed.path_segments()?.filter(|s| !s.is_empty());
        if let (Some(prefix), Some(id)) = (segments.next(), segments.next()) {
            if ID_PATH_PREFIXES.contains(&prefix) {
                return Some(id.to_string());
            }
        }
    }
    if host.contains("youtu.be") {
        let id = parsed.path().trim_matches('/');
        if !id.is_empty() {
            return Some(id.to_string());
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_video_id_from_url() {
        assert_eq!(
            video_id_from_url("https://www.youtube.com/watch?v=dQw4w9WgXcQ&t=10").as_deref(),
            Some("dQw4w9WgXcQ")
        );
        assert_eq!(video_id_from_url("https://youtu.be/dQw4w9WgXcQ").as_deref(), Some("dQw4w9WgXcQ"));
        assert_eq!(video_id_from_url("https://www.youtube.com/shorts/SHORT1").as_deref(), Some("SHORT1"));
        assert_eq!(video_id_from_url("https://www.youtube.com/embed/abc?start=3").as_deref(), Some("abc"));
        assert_eq!(video_id_from_url("https://m.youtube.com/live/xyz").as_deref(), Some("xyz"));
        assert_eq!(video_id_from_url("https://www.youtube.com/shorts/"), None);
        assert_eq!(video_id_from_url("https://www.youtube.com/@someone/videos"), None);
        assert_eq!(video_id_from_url("https://vimeo.com/12345"), None);
        assert_eq!(video_id_from_url("not a url"), None);
    }
}
