//! Local git remote for end-to-end update tests.
//!
//! The remote is a bare repository whose HEAD points at `main`. Both `main`
//! and `develop` hold `example-app/values.yaml` with `image.tag: 1.0.0`.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::process::Command;

use secrecy::SecretString;
use tempfile::TempDir;

use helm_updater::credentials::AuthMethod;
use helm_updater::gitops::error::Result as GitResult;
use helm_updater::gitops::git::auth::build_auth_env;
use helm_updater::gitops::{GitConnector, GitRepository};
use helm_updater::{Credentials, KeyChange, UpdateRequest};

pub const APP_NAME: &str = "example-app";
pub const TARGET_FILE: &str = "example-app/values.yaml";
/// URL handed to the credential resolver. The connector swaps in the local remote.
pub const REPO_URL: &str = "https://git.example.com/org/gitops.git";

const VALUES: &str = "image:\n  repository: nginx\n  tag: 1.0.0\nreplicas: 2\n";

fn git(dir: &Path, args: &[&str]) -> String {
    let output = Command::new("git")
        .current_dir(dir)
        .args(["-c", "user.name=Seed", "-c", "user.email=seed@example.com"])
        .args(args)
        .output()
        .expect("Failed to run git");
    assert!(
        output.status.success(),
        "git {} failed: {}",
        args.join(" "),
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).into_owned()
}

/// A seeded bare remote in a temporary directory.
pub struct RemoteHarness {
    temp_dir: TempDir,
    pub remote: PathBuf,
}

impl RemoteHarness {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let remote = temp_dir.path().join("remote.git");
        let seed = temp_dir.path().join("seed");

        std::fs::create_dir_all(&remote).expect("Failed to create remote dir");
        git(&remote, &["init", "--bare"]);
        git(&remote, &["symbolic-ref", "HEAD", "refs/heads/main"]);

        std::fs::create_dir_all(seed.join(APP_NAME)).expect("Failed to create seed dir");
        std::fs::write(seed.join(TARGET_FILE), VALUES).expect("Failed to write values");
        git(&seed, &["init"]);
        git(&seed, &["add", "."]);
        git(&seed, &["commit", "-m", "initial values"]);

        let remote_str = remote.to_str().expect("temp path is UTF-8");
        git(&seed, &["push", remote_str, "HEAD:refs/heads/main"]);
        git(&seed, &["push", remote_str, "HEAD:refs/heads/develop"]);

        Self { temp_dir, remote }
    }

    /// Connector bound to this remote.
    pub fn connector(&self) -> LocalConnector {
        LocalConnector {
            remote: self.remote.clone(),
        }
    }

    /// Content of `path` on `branch` in the remote.
    pub fn file_on(&self, branch: &str, path: &str) -> String {
        git(&self.remote, &["show", &format!("{}:{}", branch, path)])
    }

    /// Value of `image.tag` on `branch`.
    pub fn image_tag(&self, branch: &str) -> String {
        let values: serde_yaml::Value =
            serde_yaml::from_str(&self.file_on(branch, TARGET_FILE)).expect("valid YAML");
        match &values["image"]["tag"] {
            serde_yaml::Value::String(s) => s.clone(),
            other => panic!("unexpected image.tag: {:?}", other),
        }
    }

    /// Number of commits on `branch`.
    pub fn commit_count(&self, branch: &str) -> usize {
        git(&self.remote, &["rev-list", "--count", branch])
            .trim()
            .parse()
            .expect("numeric count")
    }

    /// Full message of the latest commit on `branch`.
    pub fn head_message(&self, branch: &str) -> String {
        git(&self.remote, &["log", "-1", "--format=%B", branch])
            .trim_end()
            .to_string()
    }

    pub fn head(&self, branch: &str) -> String {
        git(&self.remote, &["rev-parse", branch]).trim().to_string()
    }
}

/// Runs the real `git` transport against a local remote, whatever URL is requested.
pub struct LocalConnector {
    remote: PathBuf,
}

impl LocalConnector {
    pub fn new(remote: impl Into<PathBuf>) -> Self {
        Self {
            remote: remote.into(),
        }
    }
}

impl GitConnector for LocalConnector {
    type Client = GitRepository;

    fn connect(&self, _repo_url: &str, root: &Path, auth: &AuthMethod) -> GitResult<GitRepository> {
        Ok(GitRepository::new(
            root,
            self.remote.to_string_lossy(),
            build_auth_env(auth)?,
        ))
    }
}

/// A request against [`REPO_URL`] on `develop` with HTTPS credentials.
pub fn request(changes: &[(&str, &str)]) -> UpdateRequest {
    UpdateRequest {
        app_name: APP_NAME.to_string(),
        file: PathBuf::from(TARGET_FILE),
        changes: changes
            .iter()
            .map(|(key, value)| KeyChange::new(*key, *value))
            .collect(),
        repo_url: REPO_URL.to_string(),
        branch: "develop".to_string(),
        credentials: Credentials {
            username: "deploy-bot".to_string(),
            email: "deploy-bot@example.com".to_string(),
            password: Some(SecretString::from("token")),
            ssh_key: None,
        },
        ..Default::default()
    }
}
