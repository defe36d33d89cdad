//! Run configuration: YAML schema, loading and conversion into update
//! requests.

pub mod loader;
pub mod schema;

use std::path::PathBuf;

pub use loader::{default_config_path, load_config, load_config_from_str, validate_config};
pub use schema::{
    ApplicationConfig, AuthConfig, CommitConfig, EngineKind, RepositoryConfig, RunConfig,
    ValueOverride,
};

use crate::credentials::{Credentials, SshKeySource};
use crate::error::ConfigError;
use crate::secrets::{expand_home, resolve_secret_optional};
use crate::updater::UpdateRequest;
use crate::values::KeyChange;

impl RunConfig {
    /// Values file of `app`, relative to the repository root.
    pub fn target_file(&self, app: &ApplicationConfig) -> PathBuf {
        match &app.file {
            Some(file) => PathBuf::from(file),
            None => PathBuf::from(&self.repository.dir)
                .join(&app.name)
                .join(&self.repository.file),
        }
    }

    /// Resolves the commit template, reading `template_file` if needed.
    pub fn commit_template(&self) -> Result<Option<String>, ConfigError> {
        if let Some(template) = &self.commit.template {
            return Ok(Some(template.clone()));
        }

        match &self.commit.template_file {
            Some(path) => {
                let path = PathBuf::from(expand_home(path));
                let template =
                    std::fs::read_to_string(&path).map_err(|e| ConfigError::ReadFile {
                        path,
                        source: e,
                    })?;
                crate::commit::CommitTemplate::parse(&template)?;
                Ok(Some(template))
            }
            None => Ok(None),
        }
    }

    /// Resolves secrets into fresh credentials.
    pub fn credentials(&self) -> Result<Credentials, ConfigError> {
        let auth = &self.auth;

        let password = resolve_secret_optional(
            auth.password.as_deref(),
            auth.password_file.as_deref(),
            auth.password_env.as_deref(),
        )
        .map_err(|source| ConfigError::Secret {
            what: "git password",
            source,
        })?;

        let inline_key = resolve_secret_optional(
            auth.ssh_private_key.as_deref(),
            auth.ssh_private_key_file.as_deref(),
            auth.ssh_private_key_env.as_deref(),
        )
        .map_err(|source| ConfigError::Secret {
            what: "SSH private key",
            source,
        })?;

        let ssh_key = match (inline_key, &auth.ssh_private_key_path) {
            (Some(key), _) => Some(SshKeySource::Inline(key)),
            (None, Some(path)) => Some(SshKeySource::Path(path.clone())),
            (None, None) => None,
        };

        Ok(Credentials {
            username: self.commit.user.clone(),
            email: self.commit.email.clone(),
            password,
            ssh_key,
        })
    }

    /// Validates the config and builds one request per application.
    pub fn build_requests(&self) -> Result<Vec<UpdateRequest>, ConfigError> {
        validate_config(self)?;
        let commit_template = self.commit_template()?;

        self.applications
            .iter()
            .map(|app| {
                Ok(UpdateRequest {
                    app_name: app.name.clone(),
                    file: self.target_file(app),
                    changes: app.values.iter().cloned().map(KeyChange::from).collect(),
                    repo_url: self.repository.url.clone(),
                    branch: self.repository.branch.clone(),
                    credentials: self.credentials()?,
                    dry_run: self.dry_run,
                    allow_no_changes: self.allow_no_changes,
                    commit_template: commit_template.clone(),
                })
            })
            .collect()
    }
}
