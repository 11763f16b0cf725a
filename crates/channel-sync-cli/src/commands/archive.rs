use crate::output::{Output, OutputFormat};
use crate::ArchiveCommands;
use channel_sync_config::PathManager;
use channel_sync_core::{channel_slug, DownloadArchive};
use color_eyre::Result;
use serde_json::json;

pub fn run_archive(cmd: ArchiveCommands, paths: &PathManager, output: &Output) -> Result<()> {
    match cmd {
        ArchiveCommands::List { channel } => list_archive(&channel, paths, output),
    }
}

fn list_archive(channel: &str, paths: &PathManager, output: &Output) -> Result<()> {
    // Accept a display name as well as the directory slug
    let slug = channel_slug(channel);
    let path = paths.archive_file(&slug);
    if !path.exists() {
        output.warn(format!("No download archive for '{}' at {}", channel, path.display()));
        return Ok(());
    }

    let archive = DownloadArchive::load(&path)
        .map_err(|e| color_eyre::eyre::eyre!("Failed to read {}: {:#}", path.display(), e))?;

    match output.format() {
        OutputFormat::Human => {
            output.info(format!("{} ({} videos)", path.display(), archive.len()));
            if !output.is_quiet() {
                for id in archive.ids() {
                    println!("  {}", id);
                }
            }
        }
        OutputFormat::Json | OutputFormat::JsonPretty => {
            output.json(&json!({
                "channel": slug,
                "archive_file": path,
                "count": archive.len(),
                "ids": archive.ids(),
            }));
        }
    }
    Ok(())
}
