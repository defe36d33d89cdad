use std::path::PathBuf;
use thiserror::Error;

/// Errors reading or writing a single key of a values document.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("key {key} {reason}")]
    InvalidKey { key: String, reason: String },

    #[error("key {0} not found")]
    KeyNotFound(String),

    #[error("key {0} does not hold a scalar value")]
    NotScalar(String),

    #[error("cannot descend into {segment} of key {key}: not a {expected}")]
    NotAContainer {
        key: String,
        segment: String,
        expected: &'static str,
    },

    #[error("Failed to read file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write file '{path}': {source}")]
    WriteFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse YAML in '{path}': {message}")]
    ParseYaml { path: PathBuf, message: String },

    #[error("Failed to serialize YAML: {0}")]
    SerializeYaml(String),

    #[error("yq failed: {0}")]
    Yq(String),
}

pub type Result<T> = std::result::Result<T, EngineError>;
