use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::commit::CommitTemplate;
use crate::config::schema::RunConfig;
use crate::error::ConfigError;

/// File name looked up in the home directory when no config is given.
pub const DEFAULT_CONFIG_FILE: &str = ".helm-updater.yaml";

/// Returns `~/.helm-updater.yaml` if it exists.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::home_dir()
        .map(|home| home.join(DEFAULT_CONFIG_FILE))
        .filter(|path| path.is_file())
}

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<RunConfig, ConfigError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source: e,
    })?;

    load_config_from_str(&content)
}

/// Parses a config document without validating it. Validation runs once
/// command line overrides have been merged in.
pub fn load_config_from_str(content: &str) -> Result<RunConfig, ConfigError> {
    if content.trim().is_empty() {
        return Ok(RunConfig::default());
    }
    Ok(serde_yaml::from_str(content)?)
}

pub fn validate_config(config: &RunConfig) -> Result<(), ConfigError> {
    if config.repository.url.trim().is_empty() {
        return Err(ConfigError::Validation {
            message: "repository url is required".to_string(),
        });
    }

    if config.applications.is_empty() {
        return Err(ConfigError::Validation {
            message: "at least one application is required".to_string(),
        });
    }

    let mut names = HashSet::new();
    for app in &config.applications {
        if app.name.trim().is_empty() {
            return Err(ConfigError::Validation {
                message: "application name must not be empty".to_string(),
            });
        }
        if !names.insert(app.name.as_str()) {
            return Err(ConfigError::InvalidApplication {
                name: app.name.clone(),
                reason: "Duplicate application name".to_string(),
            });
        }
        if app.values.is_empty() {
            return Err(ConfigError::InvalidApplication {
                name: app.name.clone(),
                reason: "no values to update".to_string(),
            });
        }
    }

    if let Some(template) = &config.commit.template {
        CommitTemplate::parse(template)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::EngineKind;

    const CONFIG: &str = r#"
repository:
  url: git@github.com:org/gitops.git
  dir: production
commit:
  user: deploy-bot
  email: deploy-bot@example.com
auth:
  ssh_private_key_path: ~/.ssh/id_ed25519
engine: yq
applications:
  - name: api
    values:
      - key: .image.tag
        value: 1.2.3
  - name: worker
    file: custom/worker.yaml
    values:
      - key: .image.tag
        value: 1.2.3
      - key: .replicas
        value: "4"
"#;

    #[test]
    fn test_load_valid_config() {
        let config = load_config_from_str(CONFIG).unwrap();
        validate_config(&config).unwrap();

        assert_eq!(config.repository.branch, "develop");
        assert_eq!(config.repository.file, "values.yaml");
        assert_eq!(config.engine, EngineKind::Yq);
        assert_eq!(config.applications.len(), 2);
        assert_eq!(config.applications[1].values[1].value, "4");
        assert!(!config.dry_run);
    }

    #[test]
    fn test_load_config_from_file() {
        let file = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(file.path(), CONFIG).unwrap();

        let config = load_config(file.path()).unwrap();
        assert_eq!(config.repository.url, "git@github.com:org/gitops.git");
    }

    #[test]
    fn test_missing_file() {
        let err = load_config("/nonexistent/helm-updater.yaml").unwrap_err();
        assert!(matches!(err, ConfigError::ReadFile { .. }));
    }

    #[test]
    fn test_empty_document_is_default() {
        let config = load_config_from_str("").unwrap();
        assert!(config.applications.is_empty());
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_duplicate_application() {
        let mut config = load_config_from_str(CONFIG).unwrap();
        config.applications[1].name = "api".to_string();

        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("Duplicate application name"));
    }

    #[test]
    fn test_application_without_values() {
        let mut config = load_config_from_str(CONFIG).unwrap();
        config.applications[0].values.clear();

        assert!(matches!(
            validate_config(&config),
            Err(ConfigError::InvalidApplication { .. })
        ));
    }

    #[test]
    fn test_invalid_template() {
        let mut config = load_config_from_str(CONFIG).unwrap();
        config.commit.template = Some("{{unknown}}".to_string());

        assert!(matches!(
            validate_config(&config),
            Err(ConfigError::InvalidTemplate(_))
        ));
    }
}
