use chrono::NaiveDate;
use channel_sync_models::parse_published_at;
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use tracing::debug;

use crate::error::SourceError;

pub const VIDEOS_ENDPOINT: &str = "https://www.googleapis.com/youtube/v3/videos";

/// Maximum ids the videos endpoint accepts per request.
pub const MAX_IDS_PER_REQUEST: usize = 50;

#[derive(Debug, Deserialize)]
struct VideosResponse {
    #[serde(default)]
    items: Vec<VideoItem>,
}

#[derive(Debug, Deserialize)]
struct VideoItem {
    id: Option<String>,
    snippet: Option<Snippet>,
}

#[derive(Debug, Deserialize)]
struct Snippet {
    #[serde(rename = "publishedAt")]
    published_at: Option<String>,
}

/// Map each returned item's id to the date part of its `publishedAt`.
/// Items missing either field, or with an unparseable timestamp, are skipped.
pub fn parse_videos_response(body: &str) -> Result<HashMap<String, NaiveDate>, SourceError> {
    let response: VideosResponse =
        serde_json::from_str(body).map_err(|e| SourceError::Parse(format!("videos response: {}", e)))?;

    let mut dates = HashMap::new();
    for item in response.items {
        let Some(id) = item.id.filter(|id| !id.is_empty()) else {
            continue;
        };
        let published = item
            .snippet
            .and_then(|s| s.published_at)
            .and_then(|value| parse_published_at(&value));
        if let Some(date) = published {
            dates.insert(id, date);
        }
    }
    Ok(dates)
}

/// Fetch publish dates for up to [`MAX_IDS_PER_REQUEST`] ids.
pub async fn get_publish_dates(
    client: &Client,
    api_key: &str,
    video_ids: &[String],
) -> Result<HashMap<String, NaiveDate>, SourceError> {
    let ids = video_ids.join(",");
    let max_results = video_ids.len().min(MAX_IDS_PER_REQUEST).to_string();
    let response = client
        .get(VIDEOS_ENDPOINT)
        .query(&[
            ("part", "snippet"),
            ("id", ids.as_str()),
            ("maxResults", max_results.as_str()),
            ("fields", "items(id,snippet/publishedAt)"),
            ("key", api_key),
        ])
        .send()
        .await?;

    if !response.status().is_success() {
        let status = response.status();
        let error_text = response.text().await.unwrap_or_default();
        return Err(SourceError::Upstream(format!(
            "videos lookup failed: {} - {}",
            status,
            error_text.trim()
        )));
    }

    let body = response.text().await?;
    let dates = parse_videos_response(&body)?;
    debug!(requested = video_ids.len(), resolved = dates.len(), "Fetched publish dates");
    Ok(dates)
}
