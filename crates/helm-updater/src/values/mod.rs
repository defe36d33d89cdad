//! Values document handling: key paths, key engines and the
//! read/patch/verify loop.

pub mod apply;
pub mod error;
mod patch;
pub mod path;
pub mod yaml;
pub mod yq;

use std::path::Path;

pub use apply::{apply, dedupe_changes, ApplyReport, ChangeEntry, KeyChange, KeyOutcome};
pub use error::EngineError;
pub use path::{KeyPath, Segment};
pub use yaml::YamlEngine;
pub use yq::YqEngine;

/// Reads and writes single scalar values inside a structured document.
pub trait KeyEngine: Send + Sync {
    /// Returns the value at `key` rendered as a string. An absent key and an
    /// explicit `null` both yield [`EngineError::KeyNotFound`].
    fn read_key(&self, file: &Path, key: &KeyPath) -> error::Result<String>;

    /// Sets the value at `key` to the string `value`, rewriting `file` in place.
    fn set_key(&self, file: &Path, key: &KeyPath, value: &str) -> error::Result<()>;
}

impl<E: KeyEngine + ?Sized> KeyEngine for Box<E> {
    fn read_key(&self, file: &Path, key: &KeyPath) -> error::Result<String> {
        (**self).read_key(file, key)
    }

    fn set_key(&self, file: &Path, key: &KeyPath, value: &str) -> error::Result<()> {
        (**self).set_key(file, key, value)
    }
}
