use super::load_config;
use crate::output::{Output, OutputFormat};
use channel_sync_config::{PathManager, TomlSettingsStore};
use channel_sync_core::{CommandPipeline, DownloadAbort, SyncOptions, SyncOrchestrator, SyncReport, TaskPipeline};
use channel_sync_sources::{MetadataService, SourceFactory};
use color_eyre::Result;
use comfy_table::{Cell, Color, Table};
use std::path::PathBuf;
use std::time::Instant;

pub async fn run_sync(
    paths: &PathManager,
    config: Option<PathBuf>,
    skip_download: bool,
    skip_process: bool,
    output: &Output,
) -> Result<()> {
    tracing::debug!(workdir = %paths.base_dir().display(), "Sync command started");

    let (config_file, config) = load_config(paths, config)?;
    tracing::info!(config = %config_file.display(), channels = config.channels.len(), "Loaded run configuration");

    let settings_file = paths.settings_file();
    let mut settings = TomlSettingsStore::open(settings_file.clone())
        .map_err(|e| color_eyre::eyre::eyre!("Failed to load settings from {}: {:#}", settings_file.display(), e))?;

    let factory = SourceFactory::new(paths.base_dir());
    let platform = factory.create_platform(&config, &settings);
    let metadata = factory
        .create_metadata_service(&settings)
        .map(|api| Box::new(api) as Box<dyn MetadataService>);

    let pipeline = match config.global.pipeline_command.clone() {
        Some(argv) => {
            let pipeline = CommandPipeline::new(argv, paths.base_dir())
                .map_err(|e| color_eyre::eyre::eyre!("Invalid global.pipeline_command: {:#}", e))?;
            Some(Box::new(pipeline) as Box<dyn TaskPipeline>)
        }
        None => None,
    };

    let orchestrator = SyncOrchestrator::new(config, PathManager::new(paths.base_dir()), Box::new(platform))
        .with_metadata_service(metadata)
        .with_pipeline(pipeline)
        .with_options(SyncOptions {
            skip_download,
            skip_process,
        });

    let started = Instant::now();
    let report = orchestrator
        .run(&mut settings)
        .await
        .map_err(|e| color_eyre::eyre::eyre!("Sync failed: {}", e))?;
    let elapsed = started.elapsed();

    match output.format() {
        OutputFormat::Human => {
            if !output.is_quiet() {
                println!("{}", summary_table(&report));
            }
            output.info(format!("Task queue: {}", report.queue_file.display()));
            for channel in &report.channels {
                if let Some(abort) = channel.download.aborted {
                    output.warn(format!("{}: downloads stopped early ({})", channel.name, abort_reason(abort)));
                }
                if channel.scan.scan_aborted {
                    output.warn(format!(
                        "{}: scan stopped after repeated access blocks, {} entries left unchecked",
                        channel.name, channel.scan.abandoned
                    ));
                }
            }
            let processed = report
                .processing
                .as_ref()
                .map(|p| format!(", {} processed, {} errors", p.done, p.errors))
                .unwrap_or_default();
            output.success(format!(
                "Sync completed: {} downloaded, {} tracked{} in {:?}",
                report.channels.iter().map(|c| c.download.downloaded).sum::<usize>(),
                report.merge.managed,
                processed,
                elapsed
            ));
        }
        OutputFormat::Json | OutputFormat::JsonPretty => {
            let mut value = serde_json::to_value(&report)?;
            if let Some(object) = value.as_object_mut() {
                object.insert("success".to_string(), true.into());
                object.insert("duration_seconds".to_string(), elapsed.as_secs_f64().into());
            }
            output.json(&value);
        }
    }

    Ok(())
}

fn abort_reason(abort: DownloadAbort) -> &'static str {
    match abort {
        DownloadAbort::AuthBlocked => "sign-in required, refresh the cookies",
        DownloadAbort::ChallengeFormat => "repeated format challenges",
    }
}

fn summary_table(report: &SyncReport) -> Table {
    let mut table = Table::new();
    table.set_header(
        [
            "Channel", "Entries", "Mapped", "Older", "No date", "API", "Blocked", "Downloaded", "Failed",
            "Archived", "Tracked",
        ]
        .into_iter()
        .map(|h| Cell::new(h).fg(Color::Cyan).add_attribute(comfy_table::Attribute::Bold))
        .collect::<Vec<_>>(),
    );
    for channel in &report.channels {
        let scan = &channel.scan;
        let download = &channel.download;
        let failed = if download.failed > 0 {
            Cell::new(download.failed).fg(Color::Red)
        } else {
            Cell::new(download.failed)
        };
        table.add_row(vec![
            Cell::new(&channel.name),
            Cell::new(scan.entries),
            Cell::new(scan.mapped),
            Cell::new(scan.skipped_older),
            Cell::new(scan.skipped_unknown_date),
            Cell::new(scan.api_resolved),
            Cell::new(scan.blocked_attempts),
            Cell::new(download.downloaded).fg(Color::Green),
            failed,
            Cell::new(download.skipped_archived),
            Cell::new(channel.tracked),
        ]);
    }
    table.load_preset(comfy_table::presets::UTF8_FULL);
    table.apply_modifier(comfy_table::modifiers::UTF8_ROUND_CORNERS);
    table
}
