//! The update workflow: lock, authenticate, sync, apply, commit, push.

pub mod lock;

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use crate::commit;
use crate::credentials::{self, Credentials};
use crate::error::{Result, UpdateError};
use crate::gitops::{self, GitClient, GitConnector};
use crate::values::{self, ChangeEntry, KeyChange, KeyEngine};

pub use lock::RepositoryLocks;

/// One update of one application's values file.
#[derive(Debug, Default)]
pub struct UpdateRequest {
    pub app_name: String,
    /// Values file, relative to the repository root.
    pub file: PathBuf,
    /// Requested changes, in commit message order.
    pub changes: Vec<KeyChange>,
    pub repo_url: String,
    /// Branch to update. Empty or `HEAD` means the remote's default branch.
    pub branch: String,
    pub credentials: Credentials,
    pub dry_run: bool,
    /// Treat "nothing to update" as success.
    pub allow_no_changes: bool,
    pub commit_template: Option<String>,
}

/// Workflow phase, reported when an update fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Locking,
    ResolvingAuth,
    Syncing,
    Applying,
    Committing,
    Pushing,
    Done,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Locking => "locking",
            Phase::ResolvingAuth => "resolving auth",
            Phase::Syncing => "syncing",
            Phase::Applying => "applying",
            Phase::Committing => "committing",
            Phase::Pushing => "pushing",
            Phase::Done => "done",
        };
        f.write_str(name)
    }
}

/// Runs update requests against git remotes.
///
/// Clones of one `Updater` (or updaters built with the same
/// [`RepositoryLocks`]) never touch the same repository at the same time.
pub struct Updater<G, E> {
    locks: Arc<RepositoryLocks>,
    connector: G,
    engine: E,
}

impl<G: GitConnector, E: KeyEngine> Updater<G, E> {
    pub fn new(locks: Arc<RepositoryLocks>, connector: G, engine: E) -> Self {
        Self {
            locks,
            connector,
            engine,
        }
    }

    pub fn locks(&self) -> &Arc<RepositoryLocks> {
        &self.locks
    }

    /// Runs one update and returns the applied changes.
    ///
    /// In dry-run mode nothing is committed or pushed. A request without any
    /// effective change fails with [`UpdateError::NothingToUpdate`] unless
    /// `allow_no_changes` is set, in which case an empty list is returned.
    pub fn run(&self, request: &UpdateRequest) -> Result<Vec<ChangeEntry>> {
        let mut phase = Phase::Locking;
        let result = self.run_phases(request, &mut phase);

        match result {
            Ok(changes) => {
                log::info!(
                    "successfully updated the live application spec application={} changes={}",
                    request.app_name,
                    changes.len()
                );
                Ok(changes)
            }
            Err(UpdateError::NothingToUpdate) if request.allow_no_changes => {
                log::info!(
                    "{} application={}",
                    crate::error::NOTHING_TO_UPDATE,
                    request.app_name
                );
                Ok(Vec::new())
            }
            Err(e) => {
                log::error!(
                    "could not update application spec application={} phase={} error={}",
                    request.app_name,
                    phase,
                    e
                );
                Err(e)
            }
        }
    }

    fn run_phases(&self, request: &UpdateRequest, phase: &mut Phase) -> Result<Vec<ChangeEntry>> {
        let repo_lock = self.locks.get(&request.repo_url);
        let _guard = lock::acquire(&repo_lock);

        *phase = Phase::ResolvingAuth;
        let auth = credentials::resolve(&request.repo_url, &request.credentials)?;

        *phase = Phase::Syncing;
        let copy = gitops::sync(
            &self.connector,
            &request.app_name,
            &request.repo_url,
            &auth,
            &request.branch,
            request.credentials.identity(),
        )?;

        *phase = Phase::Applying;
        let requests = values::dedupe_changes(request.changes.iter().cloned());
        let report = values::apply(
            &self.engine,
            &request.app_name,
            &requests,
            copy.root(),
            &request.file,
        )?;
        let changes = report.into_changes();

        let message = commit::compose(
            &request.app_name,
            &changes,
            request.commit_template.as_deref(),
        );

        if request.dry_run {
            log::info!(
                "dry run, not committing changes application={} branch={}",
                request.app_name,
                copy.branch()
            );
            log::debug!("commit message application={}: {}", request.app_name, message);
            *phase = Phase::Done;
            return Ok(changes);
        }

        *phase = Phase::Committing;
        commit::stage(copy.client(), &request.file)?;
        let message_file = commit::write_message_file(&message)?;
        log::debug!(
            "writing commit message application={} message={}",
            request.app_name,
            message_file.path().display()
        );
        let hash = copy.client().commit(message_file.path())?;

        *phase = Phase::Pushing;
        copy.client().push(copy.branch())?;
        log::info!(
            "pushed commit application={} branch={} commit={}",
            request.app_name,
            copy.branch(),
            hash
        );

        *phase = Phase::Done;
        Ok(changes)
    }
}
