use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Client;
use std::collections::HashMap;
use std::time::Duration;

use super::api::{get_publish_dates, MAX_IDS_PER_REQUEST};
use crate::error::SourceError;
use crate::traits::MetadataService;

const REQUEST_TIMEOUT_SECS: u64 = 20;

/// Publish-date lookups through the YouTube Data API v3 `videos` endpoint.
pub struct YouTubeDataApi {
    client: Client,
    api_key: String,
}

impl YouTubeDataApi {
    pub fn new(api_key: String) -> Result<Self, SourceError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;
        Ok(Self { client, api_key })
    }
}

#[async_trait]
impl MetadataService for YouTubeDataApi {
    fn service_name(&self) -> &str {
        "youtube-data-api"
    }

    fn batch_size(&self) -> usize {
        MAX_IDS_PER_REQUEST
    }

    async fn fetch_publish_dates(&self, video_ids: &[String]) -> Result<HashMap<String, NaiveDate>, SourceError> {
        if video_ids.is_empty() {
            return Ok(HashMap::new());
        }
        get_publish_dates(&self.client, &self.api_key, video_ids).await
    }
}
