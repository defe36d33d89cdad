//! Transport seams for git operations.
//!
//! The update workflow only ever talks to these traits. [`GitCliConnector`]
//! backs them with the `git` binary; tests plug in local or in-memory remotes.
//!
//! [`GitCliConnector`]: super::repository::GitCliConnector

use std::path::Path;

use crate::credentials::AuthMethod;
use crate::gitops::error::Result;

/// Operations on one local working copy of a remote repository.
pub trait GitClient {
    /// Root directory of the working copy.
    fn root(&self) -> &Path;

    /// Initializes the working copy and registers the remote as `origin`.
    fn init(&self) -> Result<()>;

    /// Fetches every branch of `origin`.
    fn fetch_all(&self) -> Result<()>;

    /// Sets the committer name and email for this working copy only.
    fn configure_identity(&self, name: &str, email: &str) -> Result<()>;

    /// Resolves a symbolic ref on the remote (normally `HEAD`) to a branch name.
    fn resolve_symbolic_ref(&self, symref: &str) -> Result<String>;

    /// Checks out `branch` at the state of `origin/<branch>`.
    fn checkout(&self, branch: &str) -> Result<()>;

    /// Stages a file for the next commit.
    fn add(&self, path: &Path) -> Result<()>;

    /// Commits staged changes with the message read from `message_file`.
    /// Returns the abbreviated commit hash.
    fn commit(&self, message_file: &Path) -> Result<String>;

    /// Pushes `branch` to `origin`.
    fn push(&self, branch: &str) -> Result<()>;
}

/// Opens [`GitClient`]s for remote repositories.
pub trait GitConnector: Send + Sync {
    type Client: GitClient;

    /// Creates a client for `repo_url` whose working copy lives in `root`.
    ///
    /// Implementations must not perform network I/O here.
    fn connect(&self, repo_url: &str, root: &Path, auth: &AuthMethod) -> Result<Self::Client>;
}
