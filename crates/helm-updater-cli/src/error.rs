use thiserror::Error;

use helm_updater::ConfigError;

#[derive(Error, Debug)]
pub enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Logging setup failed: {0}")]
    Logging(String),

    #[error("Update task for '{app}' did not complete: {message}")]
    Task { app: String, message: String },

    #[error("Failed to serialize report: {0}")]
    Report(#[from] serde_json::Error),
}
