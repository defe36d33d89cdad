use std::path::PathBuf;
use thiserror::Error;

use crate::commit::TemplateError;
use crate::gitops::GitOpsError;
use crate::secrets::SecretError;

/// Message carried by [`UpdateError::NothingToUpdate`].
pub const NOTHING_TO_UPDATE: &str = "nothing to update, skipping commit";

/// Errors that abort an update workflow.
#[derive(Error, Debug)]
pub enum UpdateError {
    #[error("unknown repository type for git repository URL {0}")]
    UnknownRepositoryType(String),

    #[error("sshPrivKey not provided for authentication to repository {0}")]
    SshKeyNotProvided(String),

    #[error("no value provided for username and password for authentication to repository {0}")]
    CredentialsNotProvided(String),

    #[error("invalid SSH private key: {0}")]
    InvalidSshKey(String),

    #[error("SSH key file not found: {0}")]
    SshKeyFileNotFound(PathBuf),

    #[error("could not materialize SSH private key: {0}")]
    SshKeyMaterialization(#[source] std::io::Error),

    #[error("could not resolve secret: {0}")]
    Secret(#[from] SecretError),

    #[error("could not create scratch directory: {0}")]
    Scratch(#[source] std::io::Error),

    #[error("could not resolve symbolic ref '{symref}': {message}")]
    BranchResolutionFailed { symref: String, message: String },

    #[error("could not checkout branch '{branch}': {message}")]
    CheckoutFailed { branch: String, message: String },

    #[error("target file '{0}' must be a relative path inside the repository")]
    InvalidTargetPath(PathBuf),

    #[error("target file '{0}' doesn't exist")]
    TargetFileNotFound(PathBuf),

    #[error("{}", NOTHING_TO_UPDATE)]
    NothingToUpdate,

    #[error("could not write commit message to {path}: {source}")]
    CommitMessage {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Git(#[from] GitOpsError),
}

impl UpdateError {
    /// Returns true for errors raised before any network I/O took place.
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            UpdateError::UnknownRepositoryType(_)
                | UpdateError::SshKeyNotProvided(_)
                | UpdateError::CredentialsNotProvided(_)
                | UpdateError::InvalidSshKey(_)
                | UpdateError::SshKeyFileNotFound(_)
                | UpdateError::SshKeyMaterialization(_)
                | UpdateError::Secret(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, UpdateError>;

/// Errors loading or validating a run configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config YAML: {0}")]
    ParseYaml(#[from] serde_yaml::Error),

    #[error("Config validation failed: {message}")]
    Validation { message: String },

    #[error("Invalid application '{name}': {reason}")]
    InvalidApplication { name: String, reason: String },

    #[error("Invalid key/value pair '{0}': expected <key>=<value>")]
    InvalidKeyValue(String),

    #[error("Invalid commit template: {0}")]
    InvalidTemplate(#[from] TemplateError),

    #[error("Failed to resolve {what}: {source}")]
    Secret {
        what: &'static str,
        #[source]
        source: SecretError,
    },
}
