//! Per-repository mutual exclusion.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

/// Registry of one lock per repository URL.
///
/// Locks are created on first use and never removed. Updates against the
/// same URL are serialized; updates against different URLs run in parallel.
#[derive(Debug, Default)]
pub struct RepositoryLocks {
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl RepositoryLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the lock for `repo_url`, creating it if needed.
    pub fn get(&self, repo_url: &str) -> Arc<Mutex<()>> {
        let mut locks = match self.locks.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                log::warn!("Repository lock registry was poisoned, recovering");
                poisoned.into_inner()
            }
        };

        Arc::clone(locks.entry(repo_url.to_string()).or_default())
    }

    /// Number of repositories seen so far.
    pub fn len(&self) -> usize {
        self.locks.lock().map(|l| l.len()).unwrap_or_else(|p| p.into_inner().len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Blocks until `lock` is held.
///
/// The guarded data is `()`, so a lock poisoned by a panicking update is
/// simply taken over.
pub fn acquire(lock: &Mutex<()>) -> MutexGuard<'_, ()> {
    match lock.lock() {
        Ok(guard) => guard,
        Err(poisoned) => {
            log::warn!("Repository lock was poisoned, recovering");
            poisoned.into_inner()
        }
    }
}
