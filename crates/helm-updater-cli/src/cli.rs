//! Command line arguments and their merge into a run configuration.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use helm_updater::config::{ApplicationConfig, EngineKind, RunConfig, ValueOverride};
use helm_updater::ConfigError;

use crate::logging::LogFormat;

#[derive(Parser, Debug)]
#[command(
    name = "helm-updater",
    version,
    about = "Update Helm values files in a GitOps repository"
)]
pub struct Cli {
    /// Log level or filter directives (overrides RUST_LOG)
    #[arg(long, alias = "logLevel", global = true, env = "HELM_UPDATER_LOG_LEVEL")]
    pub log_level: Option<String>,

    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text, env = "HELM_UPDATER_LOG_FORMAT")]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Apply value changes, commit and push
    Run(RunArgs),
}

#[derive(Args, Debug, Default)]
pub struct RunArgs {
    /// YAML run configuration (default: ~/.helm-updater.yaml if present)
    #[arg(short, long, env = "HELM_UPDATER_CONFIG")]
    pub config: Option<PathBuf>,

    #[arg(long, env = "HELM_UPDATER_APP_NAME")]
    pub app_name: Option<String>,

    #[arg(long, env = "HELM_UPDATER_GIT_REPO_URL")]
    pub git_repo_url: Option<String>,

    /// Branch to update; empty or HEAD selects the remote default [default: develop]
    #[arg(long, env = "HELM_UPDATER_GIT_BRANCH")]
    pub git_branch: Option<String>,

    /// Directory holding the application directories, e.g. production/charts
    #[arg(long, env = "HELM_UPDATER_GIT_DIR")]
    pub git_dir: Option<String>,

    /// Values file name, e.g. values.yaml
    #[arg(long, env = "HELM_UPDATER_GIT_FILE")]
    pub git_file: Option<String>,

    #[arg(long, env = "HELM_UPDATER_GIT_COMMIT_USER")]
    pub git_commit_user: Option<String>,

    #[arg(long, env = "HELM_UPDATER_GIT_COMMIT_EMAIL")]
    pub git_commit_email: Option<String>,

    #[arg(long, env = "HELM_UPDATER_GIT_PASSWORD", hide_env_values = true)]
    pub git_password: Option<String>,

    /// Read the git password from a file
    #[arg(long, env = "HELM_UPDATER_GIT_PASSWORD_FILE")]
    pub git_password_file: Option<String>,

    /// Inline SSH private key
    #[arg(long, env = "HELM_UPDATER_SSH_PRIVATE_KEY", hide_env_values = true)]
    pub ssh_private_key: Option<String>,

    /// Existing SSH private key file
    #[arg(long, env = "HELM_UPDATER_SSH_PRIVATE_KEY_PATH")]
    pub ssh_private_key_path: Option<PathBuf>,

    /// Report the changes without committing or pushing
    #[arg(long, env = "HELM_UPDATER_DRY_RUN")]
    pub dry_run: bool,

    /// Succeed when no value actually changes
    #[arg(long, env = "HELM_UPDATER_ALLOW_NO_CHANGES")]
    pub allow_no_changes: bool,

    /// Changes as key=value, comma separated or repeated
    #[arg(long, value_delimiter = ',', env = "HELM_UPDATER_HELM_KEY_VALUES")]
    pub helm_key_values: Vec<ValueOverride>,

    #[arg(long, env = "HELM_UPDATER_COMMIT_TEMPLATE")]
    pub commit_template: Option<String>,

    #[arg(long, env = "HELM_UPDATER_COMMIT_TEMPLATE_FILE")]
    pub commit_template_file: Option<String>,

    /// Key engine: yaml (built in) or yq
    #[arg(long, env = "HELM_UPDATER_ENGINE")]
    pub engine: Option<EngineKind>,

    #[arg(long, env = "HELM_UPDATER_YQ_BINARY")]
    pub yq_binary: Option<String>,
}

fn set(target: &mut String, value: Option<String>) {
    if let Some(value) = value {
        *target = value;
    }
}

impl RunArgs {
    /// Overlays the flags on `config`. Flags always win over file values.
    pub fn merge_into(self, config: &mut RunConfig) -> Result<(), ConfigError> {
        set(&mut config.repository.url, self.git_repo_url);
        set(&mut config.repository.branch, self.git_branch);
        set(&mut config.repository.dir, self.git_dir);
        set(&mut config.repository.file, self.git_file);
        set(&mut config.commit.user, self.git_commit_user);
        set(&mut config.commit.email, self.git_commit_email);

        // A flag for one source of a secret or template replaces every file
        // source of the same thing.
        if self.git_password.is_some() || self.git_password_file.is_some() {
            config.auth.password = self.git_password;
            config.auth.password_file = self.git_password_file;
            config.auth.password_env = None;
        }
        if self.ssh_private_key.is_some() || self.ssh_private_key_path.is_some() {
            config.auth.ssh_private_key = self.ssh_private_key;
            config.auth.ssh_private_key_file = None;
            config.auth.ssh_private_key_env = None;
            config.auth.ssh_private_key_path = self.ssh_private_key_path;
        }
        if self.commit_template.is_some() || self.commit_template_file.is_some() {
            config.commit.template = self.commit_template;
            config.commit.template_file = self.commit_template_file;
        }
        if let Some(engine) = self.engine {
            config.engine = engine;
        }
        if self.yq_binary.is_some() {
            config.yq_binary = self.yq_binary;
        }

        config.dry_run |= self.dry_run;
        config.allow_no_changes |= self.allow_no_changes;

        match self.app_name {
            Some(name) => {
                match config.applications.iter_mut().find(|app| app.name == name) {
                    Some(app) => app.values.extend(self.helm_key_values),
                    None => config.applications.push(ApplicationConfig {
                        name,
                        file: None,
                        values: self.helm_key_values,
                    }),
                }
            }
            None if !self.helm_key_values.is_empty() => {
                return Err(ConfigError::Validation {
                    message: "--helm-key-values requires --app-name".to_string(),
                });
            }
            None => {}
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use helm_updater::SshKeySource;
    use secrecy::ExposeSecret;

    fn parse(args: &[&str]) -> RunArgs {
        let mut argv = vec!["helm-updater", "run"];
        argv.extend_from_slice(args);
        match Cli::try_parse_from(argv).unwrap().command {
            Command::Run(args) => args,
        }
    }

    #[test]
    fn test_flags_build_single_application() {
        let args = parse(&[
            "--app-name",
            "example-app",
            "--git-repo-url",
            "git@github.com:org/gitops.git",
            "--git-dir",
            "production",
            "--git-file",
            "values.yaml",
            "--helm-key-values",
            ".image.tag=1.2.3,.replicas=2",
            "--dry-run",
        ]);

        let mut config = RunConfig::default();
        args.merge_into(&mut config).unwrap();

        assert_eq!(config.repository.branch, "develop");
        assert!(config.dry_run);
        assert_eq!(config.applications.len(), 1);
        let app = &config.applications[0];
        assert_eq!(app.values.len(), 2);
        assert_eq!(app.values[1].key, ".replicas");
        assert_eq!(
            config.target_file(app),
            PathBuf::from("production/example-app/values.yaml")
        );
    }

    #[test]
    fn test_flags_override_file_values() {
        let mut config = helm_updater::config::load_config_from_str(
            "repository:\n  url: git@github.com:org/old.git\n  branch: main\nengine: yq\n",
        )
        .unwrap();

        let args = parse(&[
            "--git-repo-url",
            "git@github.com:org/new.git",
            "--engine",
            "yaml",
        ]);
        args.merge_into(&mut config).unwrap();

        assert_eq!(config.repository.url, "git@github.com:org/new.git");
        assert_eq!(config.repository.branch, "main");
        assert_eq!(config.engine, EngineKind::Yaml);
    }

    #[test]
    fn test_template_file_flag_replaces_file_template() {
        let mut config = helm_updater::config::load_config_from_str(
            "commit:\n  template: \"from config file {{app_name}}\"\n",
        )
        .unwrap();
        let template = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(template.path(), "from flag {{app_name}}").unwrap();

        parse(&[
            "--commit-template-file",
            template.path().to_str().unwrap(),
        ])
        .merge_into(&mut config)
        .unwrap();

        assert_eq!(
            config.commit_template().unwrap().as_deref(),
            Some("from flag {{app_name}}")
        );
    }

    #[test]
    fn test_password_file_flag_replaces_file_password() {
        let mut config = helm_updater::config::load_config_from_str(
            "auth:\n  password: from-config\n  password_env: HELM_UPDATER_UNUSED\n",
        )
        .unwrap();
        let secret = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(secret.path(), "from-flag\n").unwrap();

        parse(&["--git-password-file", secret.path().to_str().unwrap()])
            .merge_into(&mut config)
            .unwrap();

        let password = config.credentials().unwrap().password.unwrap();
        assert_eq!(password.expose_secret(), "from-flag");
    }

    #[test]
    fn test_key_path_flag_replaces_inline_key() {
        let mut config = helm_updater::config::load_config_from_str(
            "auth:\n  ssh_private_key: inline-from-config\n",
        )
        .unwrap();

        parse(&["--ssh-private-key-path", "/home/deploy/.ssh/id_ed25519"])
            .merge_into(&mut config)
            .unwrap();

        match config.credentials().unwrap().ssh_key {
            Some(SshKeySource::Path(path)) => {
                assert_eq!(path, PathBuf::from("/home/deploy/.ssh/id_ed25519"))
            }
            other => panic!("expected the flag's key path, got {:?}", other),
        }
    }

    #[test]
    fn test_inline_key_flag_replaces_key_file_sources() {
        let mut config = helm_updater::config::load_config_from_str(
            "auth:\n  ssh_private_key_file: /nonexistent/key\n  ssh_private_key_path: /nonexistent/id_rsa\n",
        )
        .unwrap();

        parse(&["--ssh-private-key", "inline-from-flag"])
            .merge_into(&mut config)
            .unwrap();

        assert!(config.auth.ssh_private_key_file.is_none());
        assert!(config.auth.ssh_private_key_path.is_none());
        match config.credentials().unwrap().ssh_key {
            Some(SshKeySource::Inline(key)) => assert_eq!(key.expose_secret(), "inline-from-flag"),
            other => panic!("expected the flag's inline key, got {:?}", other),
        }
    }

    #[test]
    fn test_key_values_extend_existing_application() {
        let mut config = helm_updater::config::load_config_from_str(
            "applications:\n  - name: api\n    values:\n      - key: .image.tag\n        value: 1.0.0\n",
        )
        .unwrap();

        parse(&["--app-name", "api", "--helm-key-values", ".replicas=3"])
            .merge_into(&mut config)
            .unwrap();

        assert_eq!(config.applications.len(), 1);
        assert_eq!(config.applications[0].values.len(), 2);
    }

    #[test]
    fn test_key_values_without_app_name() {
        let err = parse(&["--helm-key-values", ".image.tag=1"])
            .merge_into(&mut RunConfig::default())
            .unwrap_err();
        assert!(err.to_string().contains("--app-name"));
    }

    #[test]
    fn test_malformed_key_value_is_rejected() {
        let result = Cli::try_parse_from([
            "helm-updater",
            "run",
            "--helm-key-values",
            ".image.tag",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_log_level_alias() {
        let cli = Cli::try_parse_from(["helm-updater", "--logLevel", "debug", "run"]).unwrap();
        assert_eq!(cli.log_level.as_deref(), Some("debug"));
    }
}
