//! Shared test utilities for helm-updater integration tests.
//!
//! This module provides:
//! - `RemoteHarness`, a local bare git remote seeded with an application
//! - `LocalConnector`, which points the `git` CLI transport at that remote
//! - Builders for update requests

pub mod harness;

pub use harness::{request, LocalConnector, RemoteHarness, APP_NAME, REPO_URL, TARGET_FILE};
