//! Init command - create the configuration file.

use std::time::Duration;

use otapull::config::{config_file_path, ConfigFile};

use crate::error::CliError;

/// Run the init command.
pub fn run(force: bool) -> Result<(), CliError> {
    let path = config_file_path();
    if path.exists() && !force {
        return Err(CliError::Config(format!(
            "{} already exists (use --force to overwrite)",
            path.display()
        )));
    }

    let mut config = ConfigFile::default();
    config.update.interval = Duration::from_secs(3600);
    config.update.commit_timeout = Duration::from_secs(300);
    config.save()?;

    println!("Configuration file: {}", path.display());
    println!();
    println!("Set the device identity and the update URL in the [update] section,");
    println!("then run 'otapull update' for a one-off check or 'otapull watch'");
    println!("to poll on the configured interval.");
    Ok(())
}
