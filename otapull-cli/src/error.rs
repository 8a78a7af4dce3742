//! CLI error type.

use thiserror::Error;

/// Errors surfaced to the CLI user.
#[derive(Debug, Error)]
pub enum CliError {
    /// Missing or inconsistent settings.
    #[error("{0}")]
    Config(String),

    #[error(transparent)]
    ConfigFile(#[from] otapull::config::ConfigError),

    #[error("could not prepare the firmware writer: {0}")]
    Writer(#[from] otapull::writer::WriterError),

    /// The attempt ran but ended with a failure outcome.
    #[error("update failed with result {0}")]
    UpdateFailed(i32),

    #[error("could not install the shutdown handler: {0}")]
    Shutdown(#[from] ctrlc::Error),

    #[error("could not render outcome as JSON: {0}")]
    Json(#[from] serde_json::Error),
}
