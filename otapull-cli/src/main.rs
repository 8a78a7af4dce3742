//! otapull command-line interface.
//!
//! Thin front onto the `otapull` library: `init` writes a starter
//! configuration, `update` runs one attempt, `watch` polls on the configured
//! interval until interrupted.

mod commands;
mod error;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::commands::{init, update, watch};
use crate::error::CliError;

#[derive(Parser)]
#[command(name = "otapull", version = otapull::VERSION, about = "OTA firmware update client")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create the configuration file with default settings.
    Init {
        /// Overwrite an existing configuration file.
        #[arg(long)]
        force: bool,
    },
    /// Run one update check now.
    Update {
        /// Update URL (overrides the configured one).
        #[arg(long)]
        url: Option<String>,
        /// Where to stage the downloaded image.
        #[arg(long)]
        output: Option<std::path::PathBuf>,
        /// Commit timeout in seconds (overrides the configured one).
        #[arg(long)]
        commit_timeout: Option<u64>,
        /// Accept an image even if it reports the running version.
        #[arg(long)]
        ignore_same_version: bool,
        /// Print the outcome as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Poll the update server on the configured interval.
    Watch {
        /// Update URL (overrides the configured one).
        #[arg(long)]
        url: Option<String>,
        /// Poll interval in seconds (overrides the configured one).
        #[arg(long)]
        interval: Option<u64>,
        /// Where to stage downloaded images.
        #[arg(long)]
        output: Option<std::path::PathBuf>,
    },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

async fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        Command::Init { force } => init::run(force),
        Command::Update {
            url,
            output,
            commit_timeout,
            ignore_same_version,
            json,
        } => {
            update::run(update::UpdateArgs {
                url,
                output,
                commit_timeout,
                ignore_same_version,
                json,
            })
            .await
        }
        Command::Watch {
            url,
            interval,
            output,
        } => {
            watch::run(watch::WatchArgs {
                url,
                interval,
                output,
            })
            .await
        }
    }
}

#[tokio::main]
async fn main() {
    init_tracing();

    if let Err(error) = run(Cli::parse()).await {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}
