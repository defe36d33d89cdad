//! Git repository operations backed by the `git` binary.

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use super::auth::{build_auth_env, AuthEnv};
use super::parse::{format_git_error, parse_symref_branch};
use super::types::{GitClient, GitConnector};
use crate::credentials::AuthMethod;
use crate::gitops::error::{classify_git_error, GitOpsError, Result};

/// A working copy driven through the `git` command line.
pub struct GitRepository {
    /// Path to the working copy.
    repo_path: PathBuf,
    /// URL (or path) registered as `origin`.
    remote_url: String,
    /// Auth environment applied to every git invocation.
    auth: AuthEnv,
}

impl GitRepository {
    /// Creates a repository handle. Nothing is touched on disk until [`GitClient::init`].
    pub fn new(repo_path: impl Into<PathBuf>, remote_url: impl Into<String>, auth: AuthEnv) -> Self {
        Self {
            repo_path: repo_path.into(),
            remote_url: remote_url.into(),
            auth,
        }
    }

    /// Checks if the directory is a git repository.
    pub fn is_git_repo(&self) -> bool {
        self.repo_path.join(".git").exists()
    }

    #[cfg(test)]
    fn current_branch(&self) -> Result<String> {
        let output = self.run_git_checked(&["rev-parse", "--abbrev-ref", "HEAD"])?;
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    /// Runs a git command in the repository directory.
    fn run_git(&self, args: &[&str]) -> Result<Output> {
        log::trace!("git {} (in {})", args.join(" "), self.repo_path.display());

        let mut cmd = Command::new("git");
        cmd.current_dir(&self.repo_path).args(args);
        for (key, value) in &self.auth.env_vars {
            cmd.env(key, value);
        }

        cmd.output().map_err(GitOpsError::Spawn)
    }

    /// Runs a git command and turns a non-zero exit into a classified error.
    fn run_git_checked(&self, args: &[&str]) -> Result<Output> {
        let output = self.run_git(args)?;

        if output.status.success() {
            Ok(output)
        } else {
            Err(classify_git_error(&args.join(" "), &format_git_error(&output)))
        }
    }
}

impl GitClient for GitRepository {
    fn root(&self) -> &Path {
        &self.repo_path
    }

    fn init(&self) -> Result<()> {
        if !self.is_git_repo() {
            self.run_git_checked(&["init"])?;
        }

        let check = self.run_git(&["remote", "get-url", "origin"])?;
        if check.status.success() {
            self.run_git_checked(&["remote", "set-url", "origin", &self.remote_url])?;
        } else {
            self.run_git_checked(&["remote", "add", "origin", &self.remote_url])?;
        }

        Ok(())
    }

    fn fetch_all(&self) -> Result<()> {
        self.run_git_checked(&[
            "fetch",
            "--prune",
            "--force",
            "origin",
            "+refs/heads/*:refs/remotes/origin/*",
        ])?;
        Ok(())
    }

    fn configure_identity(&self, name: &str, email: &str) -> Result<()> {
        self.run_git_checked(&["config", "user.name", name])?;
        self.run_git_checked(&["config", "user.email", email])?;
        Ok(())
    }

    fn resolve_symbolic_ref(&self, symref: &str) -> Result<String> {
        let output = self.run_git_checked(&["ls-remote", "--symref", "origin", symref])?;
        let stdout = String::from_utf8_lossy(&output.stdout);

        parse_symref_branch(&stdout, symref).ok_or_else(|| {
            GitOpsError::UnexpectedOutput(format!(
                "remote symbolic ref '{}' does not point to a branch",
                symref
            ))
        })
    }

    fn checkout(&self, branch: &str) -> Result<()> {
        let remote_ref = format!("origin/{}", branch);
        self.run_git_checked(&["checkout", "--force", "-B", branch, &remote_ref])?;
        Ok(())
    }

    fn add(&self, path: &Path) -> Result<()> {
        let path = path.to_string_lossy();
        self.run_git_checked(&["add", "--", &path])?;
        Ok(())
    }

    fn commit(&self, message_file: &Path) -> Result<String> {
        let message_file = message_file.to_string_lossy();
        self.run_git_checked(&["commit", "-F", &message_file])?;

        let hash_output = self.run_git_checked(&["rev-parse", "--short", "HEAD"])?;
        Ok(String::from_utf8_lossy(&hash_output.stdout).trim().to_string())
    }

    fn push(&self, branch: &str) -> Result<()> {
        let refspec = format!("{0}:refs/heads/{0}", branch);
        self.run_git_checked(&["push", "origin", &refspec])?;
        Ok(())
    }
}

/// Connects to remotes through the `git` binary.
#[derive(Debug, Default, Clone, Copy)]
pub struct GitCliConnector;

impl GitConnector for GitCliConnector {
    type Client = GitRepository;

    fn connect(&self, repo_url: &str, root: &Path, auth: &AuthMethod) -> Result<GitRepository> {
        Ok(GitRepository::new(root, repo_url, build_auth_env(auth)?))
    }
}
