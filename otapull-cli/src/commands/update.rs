//! Update command - run one update check.

use std::path::PathBuf;
use std::time::Duration;

use otapull::config::{ConfigFile, SessionOptions};
use tracing::debug;

use super::build_client;
use crate::error::CliError;

/// Arguments for the update command.
pub struct UpdateArgs {
    pub url: Option<String>,
    pub output: Option<PathBuf>,
    pub commit_timeout: Option<u64>,
    pub ignore_same_version: bool,
    pub json: bool,
}

/// Run the update command.
pub async fn run(args: UpdateArgs) -> Result<(), CliError> {
    let config = ConfigFile::load().unwrap_or_default();

    // CLI > config
    let url = args
        .url
        .or_else(|| config.update.url.clone())
        .ok_or_else(|| {
            CliError::Config(
                "no update URL: pass --url or set url in the [update] section".to_string(),
            )
        })?;
    let output = args
        .output
        .unwrap_or_else(|| PathBuf::from("firmware.bin"));
    let options = SessionOptions {
        ignore_same_version: args.ignore_same_version,
        commit_timeout: args
            .commit_timeout
            .map(Duration::from_secs)
            .unwrap_or(config.update.commit_timeout),
    };

    debug!(url = %url, output = %output.display(), "resolved update settings");
    let client = build_client(&config, &output);
    let outcome = client.update_once(&url, options).await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    } else {
        match &outcome.message {
            Some(message) => println!("Result {}: {message}", outcome.code),
            None => println!("Result {}", outcome.code),
        }
        if outcome.reboot {
            println!(
                "Image staged at {}; deploy it and restart the device to apply.",
                output.display()
            );
        }
    }

    if outcome.is_success() {
        Ok(())
    } else {
        Err(CliError::UpdateFailed(outcome.code))
    }
}
