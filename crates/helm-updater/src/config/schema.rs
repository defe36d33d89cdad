use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::values::KeyChange;

/// A run configuration: one repository, one or more applications.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunConfig {
    #[serde(default)]
    pub repository: RepositoryConfig,
    #[serde(default)]
    pub commit: CommitConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub dry_run: bool,
    #[serde(default)]
    pub allow_no_changes: bool,
    #[serde(default)]
    pub engine: EngineKind,
    #[serde(default)]
    pub yq_binary: Option<String>,
    #[serde(default)]
    pub applications: Vec<ApplicationConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepositoryConfig {
    #[serde(default)]
    pub url: String,
    /// Empty or `HEAD` selects the remote's default branch.
    #[serde(default = "default_branch")]
    pub branch: String,
    /// Directory holding one sub-directory per application.
    #[serde(default)]
    pub dir: String,
    /// Values file name inside each application directory.
    #[serde(default = "default_file")]
    pub file: String,
}

fn default_branch() -> String {
    "develop".to_string()
}

fn default_file() -> String {
    "values.yaml".to_string()
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            branch: default_branch(),
            dir: String::new(),
            file: default_file(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CommitConfig {
    #[serde(default)]
    pub user: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub template: Option<String>,
    /// Read the template from this file. `template` wins if both are set.
    #[serde(default)]
    pub template_file: Option<String>,
}

/// Secret sources. Each secret resolves from the direct value, then the
/// file, then the environment variable.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthConfig {
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub password_file: Option<String>,
    #[serde(default)]
    pub password_env: Option<String>,
    /// Inline private key content.
    #[serde(default)]
    pub ssh_private_key: Option<String>,
    /// File holding the private key content.
    #[serde(default)]
    pub ssh_private_key_file: Option<String>,
    #[serde(default)]
    pub ssh_private_key_env: Option<String>,
    /// Existing key file handed to ssh as is. Used when no inline key resolves.
    #[serde(default)]
    pub ssh_private_key_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineKind {
    #[default]
    Yaml,
    Yq,
}

impl FromStr for EngineKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "yaml" => Ok(EngineKind::Yaml),
            "yq" => Ok(EngineKind::Yq),
            other => Err(ConfigError::Validation {
                message: format!("unknown engine '{}', expected 'yaml' or 'yq'", other),
            }),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicationConfig {
    pub name: String,
    /// Values file relative to the repository root. Defaults to
    /// `<repository.dir>/<name>/<repository.file>`.
    #[serde(default)]
    pub file: Option<String>,
    #[serde(default)]
    pub values: Vec<ValueOverride>,
}

/// One `key=value` override.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValueOverride {
    pub key: String,
    pub value: String,
}

impl FromStr for ValueOverride {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (key, value) = s
            .split_once('=')
            .ok_or_else(|| ConfigError::InvalidKeyValue(s.to_string()))?;
        let key = key.trim();
        if key.is_empty() {
            return Err(ConfigError::InvalidKeyValue(s.to_string()));
        }

        Ok(Self {
            key: key.to_string(),
            value: value.to_string(),
        })
    }
}

impl From<ValueOverride> for KeyChange {
    fn from(value: ValueOverride) -> Self {
        KeyChange::new(value.key, value.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_override_from_str() {
        let parsed: ValueOverride = ".image.tag=v1.2.3".parse().unwrap();
        assert_eq!(parsed.key, ".image.tag");
        assert_eq!(parsed.value, "v1.2.3");

        // only the first '=' separates
        let parsed: ValueOverride = ".args=--flag=x".parse().unwrap();
        assert_eq!(parsed.value, "--flag=x");
    }

    #[test]
    fn test_value_override_rejects_missing_separator() {
        assert!(".image.tag".parse::<ValueOverride>().is_err());
        assert!("=1.0".parse::<ValueOverride>().is_err());
    }

    #[test]
    fn test_engine_kind_from_str() {
        assert_eq!("YQ".parse::<EngineKind>().unwrap(), EngineKind::Yq);
        assert_eq!("yaml".parse::<EngineKind>().unwrap(), EngineKind::Yaml);
        assert!("jq".parse::<EngineKind>().is_err());
    }
}
