use chrono::{DateTime, NaiveDate};

/// Parse a `YYYY-MM-DD` cutoff date as written in the run configuration.
pub fn parse_since_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").ok()
}

/// Parse the compact `YYYYMMDD` form yt-dlp uses for `upload_date`.
pub fn parse_upload_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    if value.len() != 8 {
        return None;
    }
    NaiveDate::parse_from_str(value, "%Y%m%d").ok()
}

/// Convert an epoch timestamp (seconds, possibly fractional) to its UTC calendar date.
pub fn date_from_timestamp(seconds: f64) -> Option<NaiveDate> {
    if !seconds.is_finite() || seconds <= 0.0 {
        return None;
    }
    DateTime::from_timestamp(seconds.trunc() as i64, 0).map(|dt| dt.date_naive())
}

/// Parse an RFC 3339 `publishedAt` value (e.g. `2024-01-02T15:04:05Z`).
/// The date is taken in the offset the value was written in.
pub fn parse_published_at(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    DateTime::parse_from_rfc3339(value).ok().map(|dt| dt.date_naive())
}
