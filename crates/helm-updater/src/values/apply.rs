//! The read / patch / verify loop over a values document.

use std::path::{Component, Path, PathBuf};

use serde::Serialize;

use super::path::KeyPath;
use super::KeyEngine;
use crate::error::{Result, UpdateError};

/// A requested key/value change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyChange {
    pub key: String,
    pub value: String,
}

impl KeyChange {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// One observed change to a values document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeEntry {
    pub key: String,
    pub old_value: String,
    pub new_value: String,
    pub file: String,
}

/// What happened to a single requested change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyOutcome {
    /// The value changed and the change was verified.
    Applied(ChangeEntry),
    /// The document already held the requested value.
    Unchanged(ChangeEntry),
    /// Writing failed; the entry records `new_value == old_value`.
    WriteFailed { entry: ChangeEntry, reason: String },
    /// Re-reading after the write failed; the entry records `new_value == old_value`.
    VerifyFailed { entry: ChangeEntry, reason: String },
    /// The current value could not be read, so the key was skipped.
    Unreadable { key: String, reason: String },
}

/// Per-key classification of an apply run, in request order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplyReport {
    pub outcomes: Vec<KeyOutcome>,
}

impl ApplyReport {
    /// The applied changes, in request order.
    pub fn changes(&self) -> Vec<&ChangeEntry> {
        self.outcomes
            .iter()
            .filter_map(|outcome| match outcome {
                KeyOutcome::Applied(entry) => Some(entry),
                _ => None,
            })
            .collect()
    }

    pub fn into_changes(self) -> Vec<ChangeEntry> {
        self.outcomes
            .into_iter()
            .filter_map(|outcome| match outcome {
                KeyOutcome::Applied(entry) => Some(entry),
                _ => None,
            })
            .collect()
    }

    /// True when at least one key was applied.
    pub fn has_changes(&self) -> bool {
        self.outcomes
            .iter()
            .any(|outcome| matches!(outcome, KeyOutcome::Applied(_)))
    }
}

/// Collapses repeated keys: the first occurrence keeps its position, the
/// last occurrence supplies the value.
pub fn dedupe_changes(changes: impl IntoIterator<Item = KeyChange>) -> Vec<KeyChange> {
    let mut deduped: Vec<KeyChange> = Vec::new();
    for change in changes {
        match deduped.iter_mut().find(|c| c.key == change.key) {
            Some(existing) => existing.value = change.value,
            None => deduped.push(change),
        }
    }
    deduped
}

/// Resolves `target_file` below `root`, refusing absolute paths and `..`.
fn target_path(root: &Path, target_file: &Path) -> Result<PathBuf> {
    let escapes = target_file
        .components()
        .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
    if escapes || target_file.as_os_str().is_empty() {
        return Err(UpdateError::InvalidTargetPath(target_file.to_path_buf()));
    }
    Ok(root.join(target_file))
}

/// Applies `requests` to `target_file` inside the working copy at `root`.
///
/// Keys are processed in order and the file is rewritten after each one.
/// Per-key failures are logged and recorded in the report; only an empty
/// set of applied changes fails the whole call, with
/// [`UpdateError::NothingToUpdate`].
pub fn apply<E: KeyEngine + ?Sized>(
    engine: &E,
    app_name: &str,
    requests: &[KeyChange],
    root: &Path,
    target_file: &Path,
) -> Result<ApplyReport> {
    let path = target_path(root, target_file)?;
    if !path.is_file() {
        log::error!(
            "target file doesn't exist application={} file={}",
            app_name,
            target_file.display()
        );
        return Err(UpdateError::TargetFileNotFound(target_file.to_path_buf()));
    }

    let file = target_file.to_string_lossy().into_owned();
    let mut report = ApplyReport::default();

    for request in requests {
        let outcome = apply_one(engine, app_name, request, &path, &file);
        report.outcomes.push(outcome);
    }

    if !report.has_changes() {
        return Err(UpdateError::NothingToUpdate);
    }

    Ok(report)
}

fn apply_one<E: KeyEngine + ?Sized>(
    engine: &E,
    app_name: &str,
    request: &KeyChange,
    path: &Path,
    file: &str,
) -> KeyOutcome {
    let unreadable = |reason: String| {
        log::warn!(
            "can not read the presented key due to error, skipping change application={} key={} error={}",
            app_name,
            request.key,
            reason
        );
        KeyOutcome::Unreadable {
            key: request.key.clone(),
            reason,
        }
    };

    let key = match KeyPath::parse(&request.key) {
        Ok(key) => key,
        Err(e) => return unreadable(e.to_string()),
    };
    let old_value = match engine.read_key(path, &key) {
        Ok(value) => value,
        Err(e) => return unreadable(e.to_string()),
    };

    let mut entry = ChangeEntry {
        key: request.key.clone(),
        new_value: old_value.clone(),
        old_value,
        file: file.to_string(),
    };

    log::debug!(
        "setting new value application={} key={} value={}",
        app_name,
        request.key,
        request.value
    );

    if let Err(e) = engine.set_key(path, &key, &request.value) {
        log::warn!(
            "failed to update key application={} key={} error={}",
            app_name,
            request.key,
            e
        );
        return KeyOutcome::WriteFailed {
            entry,
            reason: e.to_string(),
        };
    }

    match engine.read_key(path, &key) {
        Ok(value) => entry.new_value = value,
        Err(e) => {
            log::warn!(
                "failed to read the patched key, skipping change application={} key={} error={}",
                app_name,
                request.key,
                e
            );
            return KeyOutcome::VerifyFailed {
                entry,
                reason: e.to_string(),
            };
        }
    }

    if entry.new_value == entry.old_value {
        log::warn!(
            "target for key is the same, skipping change application={} key={}",
            app_name,
            request.key
        );
        return KeyOutcome::Unchanged(entry);
    }

    KeyOutcome::Applied(entry)
}
