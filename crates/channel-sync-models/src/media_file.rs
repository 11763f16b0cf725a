//! Filename grammar for downloaded media.
//!
//! ```text
//! file   = date "__" title "__[" id "]." ext
//! date   = YYYY "-" MM "-" DD
//! title  = at most TITLE_MAX_BYTES bytes, no path separators
//! ```

use chrono::NaiveDate;
use std::fmt;

/// Separator between the date, title and id segments.
pub const SEGMENT_SEPARATOR: &str = "__";

/// Titles are cut to this many UTF-8 bytes, on a character boundary.
pub const TITLE_MAX_BYTES: usize = 180;

/// yt-dlp output template producing names that `MediaFileName::parse` accepts.
pub const YT_DLP_OUTPUT_TEMPLATE: &str = "%(upload_date>%Y-%m-%d)s__%(title).180B__[%(id)s].%(ext)s";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaFileName {
    pub date: NaiveDate,
    pub title: String,
    pub id: String,
    pub ext: String,
}

impl MediaFileName {
    pub fn new(date: NaiveDate, title: &str, id: &str, ext: &str) -> Self {
        Self {
            date,
            title: truncate_title(&sanitize_title(title)),
            id: id.to_string(),
            ext: ext.trim_start_matches('.').to_string(),
        }
    }

    pub fn parse(file_name: &str) -> Option<Self> {
        let date = leading_date(file_name)?;
        let rest = &file_name[10 + SEGMENT_SEPARATOR.len()..];

        let (stem, ext) = rest.rsplit_once('.')?;
        let stem = stem.strip_suffix(']')?;
        let id_start = stem.rfind("__[")?;
        let title = &stem[..id_start];
        let id = &stem[id_start + 3..];
        if id.is_empty() || ext.is_empty() {
            return None;
        }

        Some(Self {
            date,
            title: title.to_string(),
            id: id.to_string(),
            ext: ext.to_string(),
        })
    }
}

impl fmt::Display for MediaFileName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{sep}{}{sep}[{}].{}",
            self.date.format("%Y-%m-%d"),
            self.title,
            self.id,
            self.ext,
            sep = SEGMENT_SEPARATOR
        )
    }
}

/// Date encoded in a leading `YYYY-MM-DD__` prefix, if present and valid.
pub fn leading_date(file_name: &str) -> Option<NaiveDate> {
    let prefix = file_name.get(..10)?;
    if !file_name[10..].starts_with(SEGMENT_SEPARATOR) {
        return None;
    }
    let bytes = prefix.as_bytes();
    let shape_ok = bytes.iter().enumerate().all(|(i, b)| match i {
        4 | 7 => *b == b'-',
        _ => b.is_ascii_digit(),
    });
    if !shape_ok {
        return None;
    }
    NaiveDate::parse_from_str(prefix, "%Y-%m-%d").ok()
}

fn sanitize_title(title: &str) -> String {
    title
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect()
}

fn truncate_title(title: &str) -> String {
    if title.len() <= TITLE_MAX_BYTES {
        return title.to_string();
    }
    let mut end = TITLE_MAX_BYTES;
    while !title.is_char_boundary(end) {
        end -= 1;
    }
    title[..end].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_downloaded_name() {
        let parsed = MediaFileName::parse("2024-01-02__Title with __ inside__[abc-123_X].mp4").unwrap();
        assert_eq!(parsed.date, NaiveDate::from_ymd_opt(2024, 1, 2).unwrap());
        assert_eq!(parsed.title, "Title with __ inside");
        assert_eq!(parsed.id, "abc-123_X");
        assert_eq!(parsed.ext, "mp4");
    }

    #[test]
    fn test_format_matches_parse() {
        let name = MediaFileName::new(NaiveDate::from_ymd_opt(2024, 5, 6).unwrap(), "A/B: c?", "id1", ".mkv");
        let text = name.to_string();
        assert_eq!(text, "2024-05-06__A_B_ c___[id1].mkv");
        assert_eq!(MediaFileName::parse(&text), Some(name));
    }

    #[test]
    fn test_title_truncated_on_char_boundary() {
        let long = "é".repeat(200);
        let name = MediaFileName::new(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(), &long, "x", "mp4");
        assert!(name.title.len() <= TITLE_MAX_BYTES);
        assert_eq!(name.title.chars().count(), TITLE_MAX_BYTES / 2);
    }

    #[test]
    fn test_leading_date() {
        assert_eq!(leading_date("2024-01-02__x.mp4"), NaiveDate::from_ymd_opt(2024, 1, 2));
        assert_eq!(leading_date("2024-01-02_x.mp4"), None);
        assert_eq!(leading_date("2024-13-02__x.mp4"), None);
        assert_eq!(leading_date("old.mp4"), None);
        assert_eq!(leading_date("é024-01-02__x.mp4"), None);
    }

    #[test]
    fn test_parse_rejects_other_names() {
        assert!(MediaFileName::parse("holiday.mp4").is_none());
        assert!(MediaFileName::parse("2024-01-02__no id.mp4").is_none());
    }
}
