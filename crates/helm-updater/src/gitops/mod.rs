//! Git side of the update workflow.
//!
//! - Transport traits and the `git` CLI implementation
//! - Synchronizing a scratch working copy at the right branch
//! - Git error classification

pub mod error;
pub mod git;
pub mod sync;

pub use error::GitOpsError;
pub use git::{GitCliConnector, GitClient, GitConnector, GitRepository};
pub use sync::{sync, WorkingCopy};
