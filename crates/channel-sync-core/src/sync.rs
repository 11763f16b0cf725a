use anyhow::Context;
use channel_sync_config::{
    default_allowed_video_formats, keys, ChannelConfig, Config, ConfigError, PathManager, SettingsStore,
};
use channel_sync_models::ChannelListing;
use channel_sync_sources::{MetadataService, VideoPlatform};
use serde::Serialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{error, info, warn};

use crate::archive::DownloadArchive;
use crate::channel::{channel_display_name, channel_slug, list_channel, scan_channel, ChannelScanStats};
use crate::download::{DownloadStats, Downloader};
use crate::merge::{merge_task_queue, LanguagePreference, MergeStats};
use crate::notify::{CompletionNotifier, Notifier, NotifyOnDrop};
use crate::overrides::ScopedOverrides;
use crate::pipeline::TaskPipeline;
use crate::processor::{ProcessStats, TaskProcessor};
use crate::queue::TaskQueue;
use crate::scanner::MediaScanner;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("failed to prepare working directory: {0:#}")]
    Setup(#[source] anyhow::Error),
    #[error("failed to apply config overrides: {0:#}")]
    Overrides(#[source] anyhow::Error),
    #[error("task queue error: {0:#}")]
    Queue(#[source] anyhow::Error),
}

#[derive(Debug, Clone, Default)]
pub struct SyncOptions {
    /// List channels for naming only; no date resolution, no downloads.
    pub skip_download: bool,
    pub skip_process: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChannelReport {
    pub name: String,
    pub slug: String,
    pub url: String,
    pub scan: ChannelScanStats,
    pub download: DownloadStats,
    /// Managed files found locally for this channel
    pub tracked: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct SyncReport {
    pub channels: Vec<ChannelReport>,
    pub merge: MergeStats,
    pub processing: Option<ProcessStats>,
    pub queue_file: PathBuf,
}

/// Runs one full sync: every channel in order, then the queue merge, then processing.
pub struct SyncOrchestrator {
    config: Config,
    paths: PathManager,
    platform: Box<dyn VideoPlatform>,
    metadata: Option<Box<dyn MetadataService>>,
    pipeline: Option<Box<dyn TaskPipeline>>,
    notifier: Box<dyn Notifier>,
    options: SyncOptions,
}

impl SyncOrchestrator {
    pub fn new(config: Config, paths: PathManager, platform: Box<dyn VideoPlatform>) -> Self {
        let sound = config
            .global
            .audio_notify_file
            .as_deref()
            .map(|p| resolve_against(paths.base_dir(), p));
        Self {
            config,
            paths,
            platform,
            metadata: None,
            pipeline: None,
            notifier: Box::new(CompletionNotifier::new(sound)),
            options: SyncOptions::default(),
        }
    }

    pub fn with_notifier(mut self, notifier: Box<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn with_metadata_service(mut self, metadata: Option<Box<dyn MetadataService>>) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn with_pipeline(mut self, pipeline: Option<Box<dyn TaskPipeline>>) -> Self {
        self.pipeline = pipeline;
        self
    }

    pub fn with_options(mut self, options: SyncOptions) -> Self {
        self.options = options;
        self
    }

    /// Run the sync. Configuration is validated before any channel is touched and a
    /// rejected configuration returns without notifying. Past validation, config
    /// overrides are restored and the completion notification fires on every exit path.
    pub async fn run(&self, settings: &mut dyn SettingsStore) -> Result<SyncReport, SyncError> {
        let channels = self.config.validated_channels()?;
        let download_root = self.paths.resolve_download_root(&self.config.global.download_root)?;
        let managed_prefix = self.paths.relative_to_input(&download_root).unwrap_or_default();

        let _notify = NotifyOnDrop::new(self.notifier.as_ref());

        self.paths.ensure_directories().map_err(SyncError::Setup)?;
        std::fs::create_dir_all(&download_root)
            .with_context(|| format!("failed to create {}", download_root.display()))
            .map_err(SyncError::Setup)?;

        let overrides = self.config.run_overrides();
        if !overrides.is_empty() {
            info!(count = overrides.len(), "Applying config overrides for this run");
        }
        let mut scope = ScopedOverrides::apply(settings, overrides).map_err(SyncError::Overrides)?;

        let result = self
            .run_with_overrides(&channels, &download_root, &managed_prefix, &mut scope)
            .await;

        if let Err(e) = scope.restore() {
            error!(error = %e, "Failed to restore config overrides");
        }
        result
    }

    async fn run_with_overrides(
        &self,
        channels: &[ChannelConfig],
        download_root: &Path,
        managed_prefix: &str,
        scope: &mut ScopedOverrides<'_>,
    ) -> Result<SyncReport, SyncError> {
        let formats = self.allowed_formats(scope.store());
        let scanner = MediaScanner::new(self.paths.input_dir(), &formats);

        let mut reports = Vec::with_capacity(channels.len());
        let mut managed_files = Vec::new();
        let mut languages = HashMap::new();
        for channel in channels {
            let (report, files) = self.sync_channel(channel, download_root, &scanner).await;
            let preference = LanguagePreference {
                source_language: channel.source_language.clone(),
                target_language: channel
                    .target_language
                    .clone()
                    .or_else(|| self.config.global.target_language.clone()),
            };
            for file in files {
                languages.insert(file.clone(), preference.clone());
                managed_files.push(file);
            }
            reports.push(report);
        }

        let queue_file = self.paths.tasks_file();
        let existing = TaskQueue::load(&queue_file).map_err(SyncError::Queue)?;
        let (mut queue, merge) = merge_task_queue(&existing, managed_prefix, &managed_files, &languages);
        queue.save(&queue_file).map_err(SyncError::Queue)?;
        info!(
            kept_unmanaged = merge.kept_unmanaged,
            dropped_stale = merge.dropped_stale,
            managed = merge.managed,
            queue = %queue_file.display(),
            "Task queue updated"
        );

        let processing = if self.options.skip_process {
            info!("Processing skipped");
            None
        } else if let Some(pipeline) = self.pipeline.as_deref() {
            let processor = TaskProcessor::new(pipeline, self.paths.input_dir(), &queue_file);
            let stats = processor
                .process(&mut queue, managed_prefix, scope.store())
                .await
                .map_err(SyncError::Queue)?;
            Some(stats)
        } else {
            warn!("No global.pipeline_command configured, skipping processing");
            None
        };

        Ok(SyncReport {
            channels: reports,
            merge,
            processing,
            queue_file,
        })
    }

    async fn sync_channel(
        &self,
        channel: &ChannelConfig,
        download_root: &Path,
        scanner: &MediaScanner,
    ) -> (ChannelReport, Vec<String>) {
        let mut scan_stats = ChannelScanStats::default();
        let mut download = DownloadStats::default();

        let name = if self.options.skip_download {
            let listing = match channel.name {
                Some(_) => ChannelListing::default(),
                None => list_channel(self.platform.as_ref(), channel).await,
            };
            channel_display_name(channel, &listing)
        } else {
            let scan = scan_channel(self.platform.as_ref(), self.metadata.as_deref(), channel).await;
            let channel_dir = download_root.join(&scan.slug);
            download = self.download_channel(&scan.slug, &scan.selected, &channel_dir).await;
            scan_stats = scan.stats;
            scan.name
        };
        let slug = channel_slug(&name);

        let channel_dir = download_root.join(&slug);
        let files = scanner.scan(&channel_dir, Some(channel.since_date));
        info!(
            channel = %name,
            downloaded = download.downloaded,
            failed = download.failed,
            skipped_archived = download.skipped_archived,
            tracked = files.len(),
            "Channel done"
        );

        let report = ChannelReport {
            name,
            slug,
            url: channel.url.clone(),
            scan: scan_stats,
            download,
            tracked: files.len(),
        };
        (report, files)
    }

    async fn download_channel(
        &self,
        slug: &str,
        selected: &[channel_sync_models::VideoEntry],
        channel_dir: &Path,
    ) -> DownloadStats {
        let archive_path = self.paths.archive_file(slug);
        let mut archive = match DownloadArchive::load(&archive_path) {
            Ok(archive) => archive,
            Err(e) => {
                error!(channel = slug, error = %e, "Cannot read download archive, skipping downloads");
                return DownloadStats::default();
            }
        };
        if selected.is_empty() {
            return DownloadStats::default();
        }
        if let Err(e) = std::fs::create_dir_all(channel_dir) {
            error!(dir = %channel_dir.display(), error = %e, "Cannot create channel directory, skipping downloads");
            return DownloadStats::default();
        }
        let format = self.config.global.resolution.format_selector();
        Downloader::new(self.platform.as_ref(), format)
            .download_all(selected, &mut archive, channel_dir)
            .await
    }

    /// Extensions the local scan tracks: run config, then the settings store, then the defaults.
    fn allowed_formats(&self, settings: &dyn SettingsStore) -> Vec<String> {
        self.config
            .global
            .allowed_video_formats
            .clone()
            .filter(|formats| !formats.is_empty())
            .or_else(|| {
                settings
                    .load_string_list(keys::ALLOWED_VIDEO_FORMATS)
                    .filter(|formats| !formats.is_empty())
            })
            .unwrap_or_else(default_allowed_video_formats)
    }
}

fn resolve_against(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

#[cfg(test)]
mod tests;
