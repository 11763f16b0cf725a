use async_trait::async_trait;
use chrono::NaiveDate;
use channel_sync_models::{ChannelListing, VideoMetadata};
use std::collections::HashMap;
use std::path::PathBuf;
use crate::error::SourceError;

/// One media fetch.
#[derive(Debug, Clone, PartialEq)]
pub struct DownloadRequest {
    pub url: String,
    pub output_dir: PathBuf,
    /// Format selector, e.g. `bestvideo[height<=1080]+bestaudio/best[height<=1080]`
    pub format: String,
}

/// The upstream video platform: listing, per-item metadata and media fetches.
#[async_trait]
pub trait VideoPlatform: Send + Sync {
    fn platform_name(&self) -> &str;

    /// Flat, no-media enumeration of a channel.
    async fn list_channel(&self, channel_url: &str) -> Result<ChannelListing, SourceError>;

    /// Full metadata for one item. Rejections are classified into
    /// [`SourceError::AuthBlocked`] / [`SourceError::ChallengeFormat`].
    async fn fetch_metadata(&self, watch_url: &str) -> Result<VideoMetadata, SourceError>;

    /// Fetch one item to disk.
    async fn download(&self, request: &DownloadRequest) -> Result<(), SourceError>;
}

/// Batched publish-date lookup by video id.
#[async_trait]
pub trait MetadataService: Send + Sync {
    fn service_name(&self) -> &str;

    /// Maximum ids per call.
    fn batch_size(&self) -> usize {
        50
    }

    /// Look up one batch. Ids the service does not know are simply absent from the result.
    async fn fetch_publish_dates(&self, video_ids: &[String]) -> Result<HashMap<String, NaiveDate>, SourceError>;
}
