//! Log output for the binary.
//!
//! The library logs through the `log` facade. Records are bridged into
//! `tracing` and written to stderr as text or JSON.

use clap::ValueEnum;
use tracing_log::LogTracer;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::EnvFilter;

use crate::error::CliError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Builds the filter: an explicit level wins over `RUST_LOG`, then `info`.
pub fn env_filter(level: Option<&str>) -> Result<EnvFilter, CliError> {
    match level {
        Some(level) => EnvFilter::try_new(level)
            .map_err(|e| CliError::Logging(format!("invalid log level '{}': {}", level, e))),
        None => Ok(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))),
    }
}

/// Installs the global subscriber and the `log` bridge.
pub fn init(level: Option<&str>, format: LogFormat) -> Result<(), CliError> {
    let filter = env_filter(level)?;
    let registry = tracing_subscriber::registry().with(filter);

    let installed = match format {
        LogFormat::Text => tracing::subscriber::set_global_default(
            registry.with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr)),
        ),
        LogFormat::Json => tracing::subscriber::set_global_default(
            registry.with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            ),
        ),
    };
    installed.map_err(|e| CliError::Logging(e.to_string()))?;

    LogTracer::init().map_err(|e| CliError::Logging(e.to_string()))
}
