use clap::{ArgAction, Parser, Subcommand};
use commands::{archive, config, sync};
use std::path::PathBuf;

mod commands;
mod logging;
mod output;

#[derive(Parser)]
#[command(name = "channel-sync")]
#[command(about = "Keep local copies of YouTube channels and queue them for processing")]
#[command(version)]
struct Cli {
    /// Enable verbose output (use multiple times for more verbosity: -v, -vv)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Output format
    #[arg(long, global = true, default_value = "human", value_enum)]
    output: output::OutputFormat,

    /// Write logs to a daily-rotated file instead of stderr
    #[arg(long, global = true, value_name = "PATH")]
    log_file: Option<PathBuf>,

    /// Working directory holding batch/ and settings.toml (defaults to $CHANNEL_SYNC_WORKDIR or the current directory)
    #[arg(long, global = true, value_name = "DIR")]
    workdir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sync every configured channel once
    #[command(long_about = "List each configured channel, download videos published on or after its since_date, add the local files to the task queue and run the processing pipeline over pending rows. Config overrides are applied for the run and restored afterwards.")]
    Sync {
        /// Run configuration file (defaults to batch/channel_auto.toml)
        #[arg(long, value_name = "PATH")]
        config: Option<PathBuf>,

        /// Do not resolve dates or download; only track files already on disk
        #[arg(long, action = ArgAction::SetTrue)]
        skip_download: bool,

        /// Update the task queue but do not run the pipeline
        #[arg(long, action = ArgAction::SetTrue)]
        skip_process: bool,
    },
    /// Inspect the run configuration
    Config {
        #[command(subcommand)]
        cmd: ConfigCommands,
    },
    /// Inspect per-channel download archives
    Archive {
        #[command(subcommand)]
        cmd: ArchiveCommands,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Show the run configuration and effective paths (masks the API key)
    Show {
        /// Run configuration file (defaults to batch/channel_auto.toml)
        #[arg(long, value_name = "PATH")]
        config: Option<PathBuf>,

        /// Show the API key unmasked
        #[arg(long, action = ArgAction::SetTrue)]
        full: bool,
    },
}

#[derive(Subcommand)]
enum ArchiveCommands {
    /// List the video ids recorded as downloaded for a channel
    List {
        /// Channel directory name (slug), as created under the download root
        channel: String,
    },
}

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();

    logging::init_logging_with_file(cli.verbose, cli.quiet, cli.log_file)
        .map_err(|e| color_eyre::eyre::eyre!("{}", e))?;

    let output = output::Output::new(cli.output, cli.quiet);
    let paths = commands::path_manager(cli.workdir);

    match cli.command {
        Commands::Sync {
            config,
            skip_download,
            skip_process,
        } => sync::run_sync(&paths, config, skip_download, skip_process, &output).await,
        Commands::Config { cmd } => config::run_config(cmd, &paths, &output),
        Commands::Archive { cmd } => archive::run_archive(cmd, &paths, &output),
    }
}
