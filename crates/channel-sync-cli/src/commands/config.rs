use super::load_config;
use crate::output::{Output, OutputFormat};
use crate::ConfigCommands;
use channel_sync_config::{keys, Config, PathManager, SettingsStore, TomlSettingsStore};
use channel_sync_sources::resolve_data_api_key;
use color_eyre::Result;
use comfy_table::{Cell, Table};
use owo_colors::OwoColorize;
use serde_json::json;

pub fn run_config(cmd: ConfigCommands, paths: &PathManager, output: &Output) -> Result<()> {
    match cmd {
        ConfigCommands::Show { config, full } => show_config(paths, config, full, output),
    }
}

fn show_config(paths: &PathManager, config: Option<std::path::PathBuf>, full: bool, output: &Output) -> Result<()> {
    let (config_file, config) = load_config(paths, config)?;
    let settings = TomlSettingsStore::open(paths.settings_file())
        .map_err(|e| color_eyre::eyre::eyre!("Failed to load settings: {:#}", e))?;

    let api_key = resolve_data_api_key(&settings).map(|key| if full { key } else { mask_string(&key) });
    let cookies = settings.load_string(keys::COOKIES_PATH);
    let download_root = paths
        .resolve_download_root(&config.global.download_root)
        .map(|p| p.display().to_string());

    match output.format() {
        OutputFormat::Human => {
            if output.is_quiet() {
                return Ok(());
            }

            let mut info_table = section("Working Directory");
            info_table.add_row(vec![Cell::new("Config File"), Cell::new(config_file.display())]);
            info_table.add_row(vec![Cell::new("Settings File"), Cell::new(paths.settings_file().display())]);
            info_table.add_row(vec![Cell::new("Task Queue"), Cell::new(paths.tasks_file().display())]);
            info_table.add_row(vec![Cell::new("Archives"), Cell::new(paths.archive_dir().display())]);
            info_table.add_row(vec![
                Cell::new("Download Root"),
                Cell::new(match &download_root {
                    Ok(root) => root.clone(),
                    Err(e) => e.to_string().red().to_string(),
                }),
            ]);
            println!("{}", info_table);
            println!();

            println!("{}", global_table(&config, api_key.as_deref(), cookies.as_deref()));
            println!();

            let mut channels = Table::new();
            channels.set_header(vec!["URL", "Since", "Name", "Source", "Target"]);
            for channel in &config.channels {
                channels.add_row(vec![
                    channel.url.clone().unwrap_or_default(),
                    channel.since_date.clone().unwrap_or_else(|| "<missing>".to_string()),
                    channel.name.clone().unwrap_or_default(),
                    channel.source_language.clone().unwrap_or_default(),
                    channel.target_language.clone().unwrap_or_default(),
                ]);
            }
            channels.load_preset(comfy_table::presets::UTF8_FULL);
            channels.apply_modifier(comfy_table::modifiers::UTF8_ROUND_CORNERS);
            println!("{}", channels);

            match config.validated_channels() {
                Ok(valid) => output.success(format!("{} channel(s) configured", valid.len())),
                Err(e) => output.warn(format!("Configuration will be rejected: {}", e)),
            }
        }
        OutputFormat::Json | OutputFormat::JsonPretty => {
            output.json(&json!({
                "config_file": config_file,
                "settings_file": paths.settings_file(),
                "tasks_file": paths.tasks_file(),
                "archive_dir": paths.archive_dir(),
                "download_root": download_root.as_ref().ok(),
                "config": config,
                "youtube": {
                    "data_api_key": api_key,
                    "cookies_path": cookies,
                },
                "valid": config.validated_channels().is_ok(),
            }));
        }
    }
    Ok(())
}

fn section(title: &str) -> Table {
    let mut table = Table::new();
    table.set_header(vec![Cell::new(title)
        .fg(comfy_table::Color::Cyan)
        .add_attribute(comfy_table::Attribute::Bold)]);
    table.load_preset(comfy_table::presets::UTF8_FULL);
    table.apply_modifier(comfy_table::modifiers::UTF8_ROUND_CORNERS);
    table
}

fn global_table(config: &Config, api_key: Option<&str>, cookies: Option<&str>) -> Table {
    let global = &config.global;
    let mut table = section("Global Options");
    let not_set = || "<not set>".bright_black().to_string();

    table.add_row(vec![Cell::new("Resolution"), Cell::new(global.resolution.format_selector())]);
    table.add_row(vec![
        Cell::new("Target Language"),
        Cell::new(global.target_language.clone().unwrap_or_else(not_set)),
    ]);
    table.add_row(vec![
        Cell::new("Video Formats"),
        Cell::new(
            global
                .allowed_video_formats
                .as_ref()
                .map(|formats| formats.join(", "))
                .unwrap_or_else(not_set),
        ),
    ]);
    table.add_row(vec![
        Cell::new("Pipeline Command"),
        Cell::new(
            global
                .pipeline_command
                .as_ref()
                .map(|argv| argv.join(" "))
                .unwrap_or_else(not_set),
        ),
    ]);
    for (key, value) in &global.config_overrides {
        table.add_row(vec![Cell::new(format!("Override {}", key)), Cell::new(value.to_string())]);
    }
    table.add_row(vec![
        Cell::new("Data API Key"),
        Cell::new(api_key.map(str::to_string).unwrap_or_else(not_set)),
    ]);
    table.add_row(vec![
        Cell::new("Cookies"),
        Cell::new(cookies.map(str::to_string).unwrap_or_else(|| "browser (chrome)".to_string())),
    ]);
    table
}

fn mask_string(s: &str) -> String {
    let chars: Vec<char> = s.chars().collect();
    if chars.len() <= 4 {
        return "*".repeat(chars.len());
    }
    let head: String = chars[..2].iter().collect();
    let tail: String = chars[chars.len() - 2..].iter().collect();
    format!("{}***{}", head, tail)
}
