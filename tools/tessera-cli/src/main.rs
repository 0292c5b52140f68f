//! Tessera CLI: drive the grid mixer from the command line.
//!
//! Usage:
//!   tessera run [OPTIONS]       Mix synthetic participants into Y4M files
//!   tessera layout [OPTIONS]    Print the grid geometry for a participant count

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;
mod y4m_sink;

#[derive(Parser)]
#[command(
    name = "tessera",
    about = "Real-time grid video mixer",
    version,
    author
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a live mixing session with synthetic participants
    Run {
        /// Canvas width
        #[arg(long, default_value = "640")]
        width: u32,

        /// Canvas height
        #[arg(long, default_value = "480")]
        height: u32,

        /// Number of participants, including the local preview
        #[arg(short, long, default_value = "4")]
        participants: usize,

        /// Frames per second emitted by each participant
        #[arg(long, default_value = "15")]
        fps: u32,

        /// Session length in seconds
        #[arg(short, long, default_value = "5.0")]
        duration: f64,

        /// Output directory for Y4M files
        #[arg(short, long, default_value = ".")]
        output: PathBuf,

        /// Change canvas geometry mid-session, e.g. 320x240@2.5
        #[arg(long)]
        resize: Option<String>,
    },

    /// Print the grid geometry for a participant count
    Layout {
        /// Number of participants
        #[arg(short, long)]
        participants: usize,

        /// Canvas width
        #[arg(long, default_value = "640")]
        width: u32,

        /// Canvas height
        #[arg(long, default_value = "480")]
        height: u32,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = tessera_common::config::AppConfig::load();

    let mut logging = config.logging.clone();
    if cli.verbose {
        logging.level = "debug".to_string();
    }
    tessera_common::logging::init_logging(&logging);

    match cli.command {
        Commands::Run {
            width,
            height,
            participants,
            fps,
            duration,
            output,
            resize,
        } => {
            let resize = resize
                .as_deref()
                .map(commands::run::ResizeAt::parse)
                .transpose()?;
            commands::run::run(
                config.mixer,
                commands::run::SessionOptions {
                    width,
                    height,
                    participants,
                    fps,
                    duration_secs: duration,
                    output,
                    resize,
                },
            )
            .await
        }
        Commands::Layout {
            participants,
            width,
            height,
            json,
        } => commands::layout::run(participants, width, height, json),
    }
}
