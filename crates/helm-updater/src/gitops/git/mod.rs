//! Git operations for updating a remote repository.

pub mod auth;
pub mod parse;
pub mod repository;
pub mod types;

pub use repository::{GitCliConnector, GitRepository};
pub use types::{GitClient, GitConnector};
