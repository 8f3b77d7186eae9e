//! Trackview replay CLI
//!
//! Replays recorded live feed frames through a track session, or reports
//! statistics for a point file.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};

use trackview_logging::{FileConfig, LogConfig, TrackviewSubscriberBuilder};
use trackview_replay::{ReplayOptions, build_report, read_frames, read_points, read_regions, run_replay};
use trackview_session::SessionConfig;

#[derive(Parser)]
#[command(
    name = "trackview-replay",
    about = "Replay recorded live feed frames through a Trackview session",
    version
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Also write JSONL logs to this directory
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a JSONL file of feed frames into a live session
    Replay {
        /// One wire frame per line
        frames: PathBuf,

        /// Region tree served to the session (JSON)
        #[arg(short, long)]
        regions: Option<PathBuf>,

        /// Session configuration (TOML)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Pause between frames in milliseconds
        #[arg(short, long, default_value = "0")]
        interval_ms: u64,

        /// End the recording after the last frame
        #[arg(short, long)]
        end: bool,

        /// Longest wait for any session reaction in milliseconds
        #[arg(long, default_value = "5000")]
        timeout_ms: u64,
    },

    /// Compute statistics for a JSON array of points
    Stats {
        /// Point file
        points: PathBuf,

        /// Region tree for per-segment figures (JSON)
        #[arg(short, long)]
        regions: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut log_config = if cli.verbose {
        LogConfig::development()
    } else {
        LogConfig {
            default_level: "warn".to_string(),
            ..LogConfig::default()
        }
    };
    if let Some(dir) = &cli.log_dir {
        log_config.file = Some(FileConfig::new(dir).with_prefix("replay"));
    }
    let _guard = TrackviewSubscriberBuilder::new()
        .with_config(log_config)
        .try_init()?;

    match cli.command {
        Commands::Replay {
            frames,
            regions,
            config,
            interval_ms,
            end,
            timeout_ms,
        } => {
            let frames = read_frames(&frames)?;
            let regions = match regions {
                Some(path) => read_regions(&path)?,
                None => Default::default(),
            };
            let config = match config {
                Some(path) => SessionConfig::load(path)?,
                None => SessionConfig::default(),
            };
            let options = ReplayOptions {
                frame_interval: Duration::from_millis(interval_ms),
                end_recording: end,
                update_timeout: Duration::from_millis(timeout_ms),
            };

            let summary = run_replay(&frames, regions, config, &options).await?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        Commands::Stats { points, regions } => {
            let points = read_points(&points)?;
            let regions = regions.map(|path| read_regions(&path)).transpose()?;
            let report = build_report(points, regions.as_ref());
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }

    Ok(())
}
