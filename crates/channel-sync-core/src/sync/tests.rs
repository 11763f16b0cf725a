use super::*;
use crate::testing::{
    listed, listing, watch_url, CountingNotifier, FakePipeline, FakePlatform, MemorySettingsStore, Shared,
};
use channel_sync_models::VideoMetadata;
use std::sync::Arc;
use tempfile::tempdir;

const CONFIG: &str = r#"
[global]
download_root = "batch/input/channels"
resolution = 720
target_language = "English"
audio_notify_file = "missing.wav"

[global.config_overrides]
"whisper.model" = "large"

[[channels]]
url = "https://www.youtube.com/@example"
since_date = "2024-01-01"
source_language = "ja"
"#;

const NEW_FILE: &str = "2024-01-05__Video new1__[new1].mp4";
const ARCHIVED_FILE: &str = "2024-01-10__Video archived__[archived].mp4";

fn write(path: &Path, content: &str) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, content).unwrap();
}

fn platform() -> FakePlatform {
    FakePlatform::default()
        .with_listing(listing(
            "Example Channel",
            vec![
                listed("new1", Some("20240105")),
                listed("old", Some("20231231")),
                listed("nodate", None),
                listed("archived", Some("20240110")),
            ],
        ))
        .with_download_file(&watch_url("new1"), NEW_FILE)
}

#[tokio::test]
async fn test_full_run() {
    let dir = tempdir().unwrap();
    let paths = PathManager::new(dir.path());
    let channel_dir = paths.input_dir().join("channels").join("Example_Channel");
    write(&paths.archive_file("Example_Channel"), "youtube archived\n");
    write(&channel_dir.join(ARCHIVED_FILE), "media");
    write(
        &paths.tasks_file(),
        "Video File,Source Language,Target Language,Dubbing,Status\n\
         https://www.youtube.com/watch?v=remote,en,fr,1,\n\
         channels/Example_Channel/2023-06-01__gone__[g].mp4,,,0,Done\n\
         channels/Example_Channel/2024-01-10__Video archived__[archived].mp4,ja,English,1,done\n",
    );

    let platform = Arc::new(platform());
    let mut settings = MemorySettingsStore::with(&[("whisper.model", "small"), ("target_language", "Chinese")]);
    let pipeline = Arc::new(FakePipeline::observing(&settings));

    let config = Config::from_toml_str(CONFIG).unwrap();
    let orchestrator = SyncOrchestrator::new(config, PathManager::new(dir.path()), Box::new(Shared(platform.clone())))
        .with_pipeline(Some(Box::new(Shared(pipeline.clone()))));

    let report = orchestrator.run(&mut settings).await.unwrap();

    assert_eq!(platform.downloads(), vec![watch_url("new1")]);
    assert_eq!(platform.metadata_calls(), vec![watch_url("nodate")]);

    let channel = &report.channels[0];
    assert_eq!(channel.slug, "Example_Channel");
    assert_eq!(channel.scan.mapped, 2);
    assert_eq!(channel.scan.skipped_older, 1);
    assert_eq!(channel.scan.skipped_unknown_date, 1);
    assert_eq!(channel.download.downloaded, 1);
    assert_eq!(channel.download.skipped_archived, 1);
    assert_eq!(channel.tracked, 2);

    assert_eq!(report.merge.kept_unmanaged, 1);
    assert_eq!(report.merge.dropped_stale, 1);
    assert_eq!(report.merge.managed, 2);

    let processing = report.processing.unwrap();
    assert_eq!(processing.done, 1);
    assert_eq!(processing.errors, 0);

    let calls = pipeline.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].video_file, format!("channels/Example_Channel/{}", NEW_FILE));
    assert_eq!(calls[0].source_language.as_deref(), Some("ja"));
    assert_eq!(calls[0].target_language.as_deref(), Some("English"));

    // Overrides are gone after the run
    assert_eq!(settings.load_string("whisper.model").as_deref(), Some("small"));
    assert_eq!(settings.load_string("target_language").as_deref(), Some("Chinese"));

    let archive = DownloadArchive::load(&paths.archive_file("Example_Channel")).unwrap();
    assert!(archive.contains("new1"));

    let queue = TaskQueue::load(&paths.tasks_file()).unwrap();
    let rows: Vec<(&str, &str, &str)> = queue
        .rows()
        .iter()
        .map(|r| (r.video_file(), r.get("Dubbing"), r.status()))
        .collect();
    assert_eq!(
        rows,
        vec![
            ("https://www.youtube.com/watch?v=remote", "1", ""),
            ("channels/Example_Channel/2024-01-05__Video new1__[new1].mp4", "0", "Done"),
            ("channels/Example_Channel/2024-01-10__Video archived__[archived].mp4", "0", "Done"),
        ]
    );
}

#[tokio::test]
async fn test_second_run_downloads_nothing() {
    let dir = tempdir().unwrap();
    let platform = Arc::new(platform());
    let mut settings = MemorySettingsStore::default();
    let notifier = CountingNotifier::default();
    let config = Config::from_toml_str(CONFIG).unwrap();
    let orchestrator = SyncOrchestrator::new(config, PathManager::new(dir.path()), Box::new(Shared(platform.clone())))
        .with_notifier(Box::new(notifier.clone()))
        .with_options(SyncOptions {
            skip_download: false,
            skip_process: true,
        });

    orchestrator.run(&mut settings).await.unwrap();
    assert_eq!(notifier.count(), 1);
    let first_queue = std::fs::read_to_string(PathManager::new(dir.path()).tasks_file()).unwrap();
    let report = orchestrator.run(&mut settings).await.unwrap();
    let second_queue = std::fs::read_to_string(PathManager::new(dir.path()).tasks_file()).unwrap();

    assert_eq!(platform.downloads(), vec![watch_url("new1"), watch_url("archived")]);
    assert_eq!(report.channels[0].download.downloaded, 0);
    assert_eq!(report.channels[0].download.skipped_archived, 2);
    assert_eq!(first_queue, second_queue);
    assert!(report.processing.is_none());
    assert!(settings.snapshot().is_empty());
    assert_eq!(notifier.count(), 2);
}

#[tokio::test]
async fn test_invalid_channel_fails_before_any_channel_is_touched() {
    let dir = tempdir().unwrap();
    let config = Config::from_toml_str(
        r#"
[global]
target_language = "English"

[[channels]]
url = "https://www.youtube.com/@first"
since_date = "2024-01-01"

[[channels]]
url = "https://www.youtube.com/@second"
"#,
    )
    .unwrap();
    let platform = Arc::new(platform());
    let mut settings = MemorySettingsStore::default();
    let notifier = CountingNotifier::default();
    let orchestrator = SyncOrchestrator::new(config, PathManager::new(dir.path()), Box::new(Shared(platform.clone())))
        .with_notifier(Box::new(notifier.clone()));

    let err = orchestrator.run(&mut settings).await.unwrap_err();

    assert!(matches!(err, SyncError::Config(ConfigError::MissingSinceDate { .. })));
    assert_eq!(notifier.count(), 0);
    assert!(platform.downloads().is_empty());
    assert!(settings.snapshot().is_empty());
    assert!(!PathManager::new(dir.path()).tasks_file().exists());
}

#[tokio::test]
async fn test_download_root_outside_input_is_rejected() {
    let dir = tempdir().unwrap();
    let config = Config::from_toml_str(
        r#"
[global]
download_root = "batch/input/../outside"

[[channels]]
url = "https://www.youtube.com/@first"
since_date = "2024-01-01"
"#,
    )
    .unwrap();
    let mut settings = MemorySettingsStore::default();
    let notifier = CountingNotifier::default();
    let orchestrator = SyncOrchestrator::new(config, PathManager::new(dir.path()), Box::new(FakePlatform::default()))
        .with_notifier(Box::new(notifier.clone()));

    let err = orchestrator.run(&mut settings).await.unwrap_err();
    assert!(matches!(err, SyncError::Config(ConfigError::DownloadRootOutsideInput { .. })));
    assert_eq!(notifier.count(), 0);
}

#[tokio::test]
async fn test_skip_download_still_tracks_local_files() {
    let dir = tempdir().unwrap();
    let paths = PathManager::new(dir.path());
    let channel_dir = paths.input_dir().join("channels").join("Named");
    write(&channel_dir.join(ARCHIVED_FILE), "media");
    write(&channel_dir.join("2023-12-01__Older__[o].mp4"), "media");

    let config = Config::from_toml_str(
        r#"
[global]
allowed_video_formats = ["mp4"]

[[channels]]
url = "https://www.youtube.com/@example"
since_date = "2024-01-01"
name = "Named"
"#,
    )
    .unwrap();
    let platform = Arc::new(platform());
    let mut settings = MemorySettingsStore::default();
    let orchestrator = SyncOrchestrator::new(config, PathManager::new(dir.path()), Box::new(Shared(platform.clone())))
        .with_options(SyncOptions {
            skip_download: true,
            skip_process: false,
        });

    let report = orchestrator.run(&mut settings).await.unwrap();

    assert!(platform.downloads().is_empty());
    assert_eq!(report.channels[0].tracked, 1);
    assert_eq!(report.merge.managed, 1);
    // No pipeline configured
    assert!(report.processing.is_none());
}

#[tokio::test]
async fn test_short_link_entry_is_downloaded_once_across_runs() {
    let dir = tempdir().unwrap();
    let short_url = "https://www.youtube.com/shorts/SHORT1";
    let short = VideoMetadata {
        url: Some(short_url.to_string()),
        upload_date: Some("20240105".to_string()),
        ..Default::default()
    };
    let platform = Arc::new(
        FakePlatform::default()
            .with_listing(listing("Example Channel", vec![short]))
            .with_download_file(short_url, "2024-01-05__Short__[SHORT1].mp4"),
    );
    let mut settings = MemorySettingsStore::default();
    let config = Config::from_toml_str(CONFIG).unwrap();
    let orchestrator = SyncOrchestrator::new(config, PathManager::new(dir.path()), Box::new(Shared(platform.clone())))
        .with_options(SyncOptions {
            skip_download: false,
            skip_process: true,
        });

    for _ in 0..3 {
        orchestrator.run(&mut settings).await.unwrap();
    }

    assert_eq!(platform.downloads(), vec![short_url.to_string()]);
    let archive = DownloadArchive::load(&PathManager::new(dir.path()).archive_file("Example_Channel")).unwrap();
    assert!(archive.contains("SHORT1"));
}
