use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};
use crate::publish_date::{date_from_timestamp, parse_upload_date};
use crate::video_id::{build_watch_url, video_id_from_url};

/// Metadata record for a single upstream item.
///
/// The same shape is produced by a flat channel listing (where most date
/// fields are usually missing) and by a full per-item metadata fetch.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct VideoMetadata {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "string_or_number")]
    pub upload_date: Option<String>,
    #[serde(default)]
    pub release_timestamp: Option<f64>,
    #[serde(default)]
    pub timestamp: Option<f64>,
}

impl VideoMetadata {
    /// Publish date derivable from fields already present on the record.
    ///
    /// Explicit `upload_date` wins; otherwise the release timestamp is
    /// preferred over the generic timestamp.
    pub fn inline_publish_date(&self) -> Option<NaiveDate> {
        if let Some(date) = self.upload_date.as_deref().and_then(parse_upload_date) {
            return Some(date);
        }
        self.release_timestamp
            .and_then(date_from_timestamp)
            .or_else(|| self.timestamp.and_then(date_from_timestamp))
    }

    /// Watch URL for the item: the entry's own absolute URL, else one built from its id.
    pub fn watch_url(&self) -> Option<String> {
        if let Some(url) = self.url.as_deref() {
            if url.starts_with("http") {
                return Some(url.to_string());
            }
        }
        self.id.as_deref().filter(|id| !id.is_empty()).map(build_watch_url)
    }

    /// Identifier from the entry, falling back to parsing the watch URL.
    pub fn video_id(&self, watch_url: Option<&str>) -> Option<String> {
        if let Some(id) = self.id.as_deref().filter(|id| !id.is_empty()) {
            return Some(id.to_string());
        }
        watch_url.and_then(video_id_from_url)
    }
}

/// Result of a flat channel enumeration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChannelListing {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub uploader: Option<String>,
    #[serde(default)]
    pub channel: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub entries: Vec<Option<VideoMetadata>>,
}

impl ChannelListing {
    /// First non-empty display name candidate, in uploader/channel/title/id order.
    pub fn display_name(&self) -> Option<&str> {
        [&self.uploader, &self.channel, &self.title, &self.id]
            .into_iter()
            .filter_map(|value| value.as_deref())
            .find(|value| !value.trim().is_empty())
    }

    /// Entries in listing order, skipping null placeholders.
    pub fn entries(&self) -> impl Iterator<Item = &VideoMetadata> {
        self.entries.iter().flatten()
    }
}

/// One discovered upstream item, with its publish date resolved progressively.
#[derive(Debug, Clone, PartialEq)]
pub struct VideoEntry {
    pub watch_url: String,
    pub video_id: Option<String>,
    pub published_date: Option<NaiveDate>,
}

impl VideoEntry {
    /// Build an entry from listing metadata. Returns `None` when no watch URL can be derived.
    pub fn from_metadata(metadata: &VideoMetadata) -> Option<Self> {
        let watch_url = metadata.watch_url()?;
        let video_id = metadata.video_id(Some(&watch_url));
        Some(Self {
            watch_url,
            video_id,
            published_date: metadata.inline_publish_date(),
        })
    }
}

fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(s)) => Some(s),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}
