//! Repository synchronization: scratch clone at the requested branch.

use std::path::Path;

use tempfile::TempDir;

use super::git::{GitClient, GitConnector};
use crate::credentials::AuthMethod;
use crate::error::{Result, UpdateError};

/// Symbolic ref resolved when no explicit branch is requested.
pub const DEFAULT_SYMREF: &str = "HEAD";

/// A disposable clone of the remote, checked out at the resolved branch.
///
/// The scratch directory is removed recursively when this value is dropped.
pub struct WorkingCopy<C> {
    client: C,
    branch: String,
    // dropped after `client`
    scratch: TempDir,
}

impl<C: GitClient> WorkingCopy<C> {
    /// Working copy root on disk.
    pub fn root(&self) -> &Path {
        self.client.root()
    }

    /// Branch that was checked out.
    pub fn branch(&self) -> &str {
        &self.branch
    }

    /// Git client bound to this working copy.
    pub fn client(&self) -> &C {
        &self.client
    }

    /// Scratch directory that will be removed on drop.
    pub fn scratch_dir(&self) -> &Path {
        self.scratch.path()
    }
}

/// Returns true when `branch` asks for the remote's default branch.
pub fn wants_default_branch(branch: &str) -> bool {
    branch.is_empty() || branch == DEFAULT_SYMREF
}

/// Clones `repo_url` into a fresh scratch directory and checks out `branch`.
///
/// An empty branch or `HEAD` resolves to the branch the remote HEAD points
/// at. The commit identity is configured when given.
pub fn sync<G: GitConnector>(
    connector: &G,
    app_name: &str,
    repo_url: &str,
    auth: &AuthMethod,
    branch: &str,
    identity: Option<(&str, &str)>,
) -> Result<WorkingCopy<G::Client>> {
    let scratch = tempfile::Builder::new()
        .prefix(&format!("git-{}-", app_name))
        .tempdir()
        .map_err(UpdateError::Scratch)?;

    log::debug!(
        "cloning repository application={} url={} dir={}",
        app_name,
        repo_url,
        scratch.path().display()
    );

    let client = connector.connect(repo_url, scratch.path(), auth)?;
    client.init()?;
    client.fetch_all()?;

    if let Some((name, email)) = identity {
        client.configure_identity(name, email)?;
    }

    log::debug!(
        "target revision for update set application={} revision={}",
        app_name,
        branch
    );

    let branch = if wants_default_branch(branch) {
        let resolved = client.resolve_symbolic_ref(DEFAULT_SYMREF).map_err(|e| {
            UpdateError::BranchResolutionFailed {
                symref: branch.to_string(),
                message: e.to_string(),
            }
        })?;
        log::debug!(
            "resolved remote default branch, using that for operations application={} branch={}",
            app_name,
            resolved
        );
        resolved
    } else {
        branch.to_string()
    };

    client
        .checkout(&branch)
        .map_err(|e| UpdateError::CheckoutFailed {
            branch: branch.clone(),
            message: e.to_string(),
        })?;

    Ok(WorkingCopy {
        client,
        branch,
        scratch,
    })
}
