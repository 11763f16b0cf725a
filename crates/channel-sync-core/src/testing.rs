//! In-memory collaborators shared by the unit tests.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use channel_sync_config::SettingsStore;
use channel_sync_models::{ChannelListing, VideoMetadata};
use channel_sync_sources::{DownloadRequest, MetadataService, SourceError, VideoPlatform};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::notify::Notifier;
use crate::pipeline::{PipelineOutcome, PipelineRequest, TaskPipeline};
use crate::queue::TaskQueue;

pub fn date(value: &str) -> NaiveDate {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").unwrap()
}

pub fn watch_url(id: &str) -> String {
    format!("https://www.youtube.com/watch?v={}", id)
}

/// Listing entry with an optional `YYYYMMDD` upload date.
pub fn listed(id: &str, upload_date: Option<&str>) -> VideoMetadata {
    VideoMetadata {
        id: Some(id.to_string()),
        url: Some(watch_url(id)),
        title: Some(format!("Video {}", id)),
        upload_date: upload_date.map(str::to_string),
        ..Default::default()
    }
}

pub fn listing(name: &str, entries: Vec<VideoMetadata>) -> ChannelListing {
    ChannelListing {
        uploader: Some(name.to_string()),
        entries: entries.into_iter().map(Some).collect(),
        ..Default::default()
    }
}

#[derive(Default)]
pub struct FakePlatform {
    listing: Option<ChannelListing>,
    listing_error: Option<String>,
    metadata: HashMap<String, std::result::Result<VideoMetadata, String>>,
    download_errors: HashMap<String, String>,
    download_files: HashMap<String, String>,
    metadata_calls: Mutex<Vec<String>>,
    download_calls: Mutex<Vec<String>>,
}

impl FakePlatform {
    pub fn with_listing(mut self, listing: ChannelListing) -> Self {
        self.listing = Some(listing);
        self
    }

    pub fn with_listing_error(mut self, message: &str) -> Self {
        self.listing_error = Some(message.to_string());
        self
    }

    pub fn with_metadata_date(mut self, url: &str, upload_date: &str) -> Self {
        let metadata = VideoMetadata {
            upload_date: Some(upload_date.to_string()),
            ..Default::default()
        };
        self.metadata.insert(url.to_string(), Ok(metadata));
        self
    }

    pub fn with_metadata_error(mut self, url: &str, message: &str) -> Self {
        self.metadata.insert(url.to_string(), Err(message.to_string()));
        self
    }

    pub fn with_download_error(mut self, url: &str, message: &str) -> Self {
        self.download_errors.insert(url.to_string(), message.to_string());
        self
    }

    /// On a successful download of `url`, create `file_name` in the output directory.
    pub fn with_download_file(mut self, url: &str, file_name: &str) -> Self {
        self.download_files.insert(url.to_string(), file_name.to_string());
        self
    }

    pub fn metadata_calls(&self) -> Vec<String> {
        self.metadata_calls.lock().unwrap().clone()
    }

    pub fn downloads(&self) -> Vec<String> {
        self.download_calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl VideoPlatform for FakePlatform {
    fn platform_name(&self) -> &str {
        "fake"
    }

    async fn list_channel(&self, _channel_url: &str) -> std::result::Result<ChannelListing, SourceError> {
        if let Some(message) = &self.listing_error {
            return Err(SourceError::from_upstream_message(message.clone()));
        }
        Ok(self.listing.clone().unwrap_or_default())
    }

    async fn fetch_metadata(&self, watch_url: &str) -> std::result::Result<VideoMetadata, SourceError> {
        self.metadata_calls.lock().unwrap().push(watch_url.to_string());
        match self.metadata.get(watch_url) {
            Some(Ok(metadata)) => Ok(metadata.clone()),
            Some(Err(message)) => Err(SourceError::from_upstream_message(message.clone())),
            None => Ok(VideoMetadata::default()),
        }
    }

    async fn download(&self, request: &DownloadRequest) -> std::result::Result<(), SourceError> {
        self.download_calls.lock().unwrap().push(request.url.clone());
        if let Some(message) = self.download_errors.get(&request.url) {
            return Err(SourceError::from_upstream_message(message.clone()));
        }
        if let Some(file_name) = self.download_files.get(&request.url) {
            std::fs::create_dir_all(&request.output_dir).unwrap();
            std::fs::write(request.output_dir.join(file_name), b"media").unwrap();
        }
        Ok(())
    }
}

pub struct FakeMetadataService {
    dates: HashMap<String, NaiveDate>,
    batch_size: usize,
    fail_on_call: Option<usize>,
    calls: Mutex<Vec<Vec<String>>>,
}

impl FakeMetadataService {
    pub fn with_dates(dates: &[(&str, &str)]) -> Self {
        Self {
            dates: dates.iter().map(|(id, d)| (id.to_string(), date(d))).collect(),
            batch_size: 50,
            fail_on_call: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn batch_size(mut self, size: usize) -> Self {
        self.batch_size = size;
        self
    }

    /// Fail the n-th call (1-based).
    pub fn fail_on_call(mut self, call: usize) -> Self {
        self.fail_on_call = Some(call);
        self
    }

    pub fn calls(&self) -> Vec<Vec<String>> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl MetadataService for FakeMetadataService {
    fn service_name(&self) -> &str {
        "fake-metadata"
    }

    fn batch_size(&self) -> usize {
        self.batch_size
    }

    async fn fetch_publish_dates(
        &self,
        video_ids: &[String],
    ) -> std::result::Result<HashMap<String, NaiveDate>, SourceError> {
        let call = {
            let mut calls = self.calls.lock().unwrap();
            calls.push(video_ids.to_vec());
            calls.len()
        };
        if self.fail_on_call == Some(call) {
            return Err(SourceError::Upstream("quota exceeded".to_string()));
        }
        Ok(video_ids
            .iter()
            .filter_map(|id| self.dates.get(id).map(|d| (id.clone(), *d)))
            .collect())
    }
}

/// Settings store kept in memory; clones share the same values.
#[derive(Clone, Default)]
pub struct MemorySettingsStore {
    values: Arc<Mutex<HashMap<String, toml::Value>>>,
    fail_writes: Arc<Mutex<bool>>,
}

impl MemorySettingsStore {
    pub fn with(values: &[(&str, &str)]) -> Self {
        let store = Self::default();
        {
            let mut map = store.values.lock().unwrap();
            for (key, value) in values {
                map.insert(key.to_string(), toml::Value::String(value.to_string()));
            }
        }
        store
    }

    pub fn snapshot(&self) -> HashMap<String, toml::Value> {
        self.values.lock().unwrap().clone()
    }

    pub fn set_fail_writes(&self, fail: bool) {
        *self.fail_writes.lock().unwrap() = fail;
    }
}

impl SettingsStore for MemorySettingsStore {
    fn load_key(&self, key: &str) -> Option<toml::Value> {
        self.values.lock().unwrap().get(key).cloned()
    }

    fn update_key(&mut self, key: &str, value: Option<toml::Value>) -> Result<()> {
        if *self.fail_writes.lock().unwrap() {
            return Err(anyhow!("settings store is read-only"));
        }
        let mut values = self.values.lock().unwrap();
        match value {
            Some(value) => values.insert(key.to_string(), value),
            None => values.remove(key),
        };
        Ok(())
    }
}

pub enum FakeOutcome {
    Fail(&'static str, &'static str),
    Error(&'static str),
    Panic(&'static str),
}

/// Per-call record: video file plus the language settings visible during the call.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineCall {
    pub video_file: String,
    pub dubbing: bool,
    pub is_retry: bool,
    pub source_language: Option<String>,
    pub target_language: Option<String>,
    /// `(video file, status)` rows of the queue file on disk at call time, if one was read.
    pub queue_on_disk: Option<Vec<(String, String)>>,
}

#[derive(Default)]
pub struct FakePipeline {
    outcomes: HashMap<String, FakeOutcome>,
    settings: Option<MemorySettingsStore>,
    queue_path: Option<PathBuf>,
    calls: Mutex<Vec<PipelineCall>>,
}

impl FakePipeline {
    pub fn observing(settings: &MemorySettingsStore) -> Self {
        Self {
            settings: Some(settings.clone()),
            ..Default::default()
        }
    }

    /// Read the queue file at `path` on every call.
    pub fn reading_queue(mut self, path: &Path) -> Self {
        self.queue_path = Some(path.to_path_buf());
        self
    }

    pub fn with_outcome(mut self, video_file: &str, outcome: FakeOutcome) -> Self {
        self.outcomes.insert(video_file.to_string(), outcome);
        self
    }

    pub fn calls(&self) -> Vec<PipelineCall> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl TaskPipeline for FakePipeline {
    fn name(&self) -> &str {
        "fake-pipeline"
    }

    async fn run(&self, request: &PipelineRequest) -> Result<PipelineOutcome> {
        let (source_language, target_language) = match &self.settings {
            Some(store) => (
                store.load_string(channel_sync_config::keys::SOURCE_LANGUAGE),
                store.load_string(channel_sync_config::keys::TARGET_LANGUAGE),
            ),
            None => (None, None),
        };
        let queue_on_disk = self
            .queue_path
            .as_deref()
            .filter(|path| path.exists())
            .map(|path| {
                TaskQueue::load(path)
                    .unwrap()
                    .rows()
                    .iter()
                    .map(|row| (row.video_file().to_string(), row.status().to_string()))
                    .collect()
            });
        self.calls.lock().unwrap().push(PipelineCall {
            video_file: request.video_file.clone(),
            dubbing: request.dubbing,
            is_retry: request.is_retry,
            source_language,
            target_language,
            queue_on_disk,
        });
        match self.outcomes.get(&request.video_file) {
            None => Ok(PipelineOutcome::Success),
            Some(FakeOutcome::Fail(step, message)) => Ok(PipelineOutcome::Failed {
                step: step.to_string(),
                message: message.to_string(),
            }),
            Some(FakeOutcome::Error(message)) => Err(anyhow!(message.to_string())),
            Some(FakeOutcome::Panic(message)) => panic!("{}", message),
        }
    }
}

/// Counts completion notifications.
#[derive(Clone, Default)]
pub struct CountingNotifier(pub Arc<AtomicUsize>);

impl CountingNotifier {
    pub fn count(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}

impl Notifier for CountingNotifier {
    fn notify(&self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

/// Hands a collaborator to an owner (`Box<dyn ...>`) while the test keeps a handle to inspect it.
pub struct Shared<T>(pub Arc<T>);

#[async_trait]
impl<T: VideoPlatform> VideoPlatform for Shared<T> {
    fn platform_name(&self) -> &str {
        self.0.platform_name()
    }

    async fn list_channel(&self, channel_url: &str) -> std::result::Result<ChannelListing, SourceError> {
        self.0.list_channel(channel_url).await
    }

    async fn fetch_metadata(&self, watch_url: &str) -> std::result::Result<VideoMetadata, SourceError> {
        self.0.fetch_metadata(watch_url).await
    }

    async fn download(&self, request: &DownloadRequest) -> std::result::Result<(), SourceError> {
        self.0.download(request).await
    }
}

#[async_trait]
impl<T: TaskPipeline> TaskPipeline for Shared<T> {
    fn name(&self) -> &str {
        self.0.name()
    }

    async fn run(&self, request: &PipelineRequest) -> Result<PipelineOutcome> {
        self.0.run(request).await
    }
}
