//! Watch command - poll the update server on an interval.

use std::path::PathBuf;
use std::time::Duration;

use otapull::config::{ConfigFile, ScheduleSettings};
use tokio_util::sync::CancellationToken;

use super::build_client;
use crate::error::CliError;

/// Arguments for the watch command.
pub struct WatchArgs {
    pub url: Option<String>,
    pub interval: Option<u64>,
    pub output: Option<PathBuf>,
}

/// Run the watch command until interrupted.
pub async fn run(args: WatchArgs) -> Result<(), CliError> {
    let config = ConfigFile::load().unwrap_or_default();

    // CLI > config
    let settings = ScheduleSettings {
        url: args.url.or_else(|| config.update.url.clone()),
        interval: args
            .interval
            .map(Duration::from_secs)
            .unwrap_or(config.update.interval),
        commit_timeout: config.update.commit_timeout,
    };
    if !settings.is_enabled() {
        return Err(CliError::Config(
            "scheduled checks need an update URL and a non-zero interval \
             (see the [update] section, or pass --url and --interval)"
                .to_string(),
        ));
    }

    let output = args
        .output
        .unwrap_or_else(|| PathBuf::from("firmware.bin"));
    let client = build_client(&config, &output);

    let shutdown = CancellationToken::new();
    let handler_shutdown = shutdown.clone();
    ctrlc::set_handler(move || {
        handler_shutdown.cancel();
    })?;

    // is_enabled() guarantees both are set.
    let url = settings.url.clone().unwrap_or_default();
    println!(
        "otapull v{} checking {} every {}s",
        otapull::VERSION,
        url,
        settings.interval.as_secs()
    );
    println!("Staging images at {}. Press Ctrl+C to stop.", output.display());

    client.scheduler(settings).run(shutdown).await;
    Ok(())
}
