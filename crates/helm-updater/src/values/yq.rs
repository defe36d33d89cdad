//! Key engine that shells out to `yq` (v4).
//!
//! Unlike [`super::YamlEngine`], `yq` keeps comments and formatting of the
//! document intact.

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use super::error::{EngineError, Result};
use super::path::KeyPath;
use super::KeyEngine;

/// Environment variable the new value is passed through.
const VALUE_ENV: &str = "HELM_UPDATER_VALUE";

/// Runs `yq eval` for every read and write.
#[derive(Debug, Clone)]
pub struct YqEngine {
    binary: PathBuf,
}

impl Default for YqEngine {
    fn default() -> Self {
        Self::new("yq")
    }
}

impl YqEngine {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    fn run(&self, args: &[&str], value: Option<&str>) -> Result<Output> {
        log::trace!("{} {}", self.binary.display(), args.join(" "));

        let mut cmd = Command::new(&self.binary);
        cmd.args(args);
        if let Some(value) = value {
            cmd.env(VALUE_ENV, value);
        }

        let output = cmd
            .output()
            .map_err(|e| EngineError::Yq(format!("failed to run {}: {}", self.binary.display(), e)))?;

        if output.status.success() {
            Ok(output)
        } else {
            Err(EngineError::Yq(
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ))
        }
    }
}

impl KeyEngine for YqEngine {
    fn read_key(&self, file: &Path, key: &KeyPath) -> Result<String> {
        let file = file.to_string_lossy();
        let output = self.run(&["eval", key.as_str(), &file], None)?;
        let value = String::from_utf8_lossy(&output.stdout).trim_end().to_string();

        // yq prints `null` for absent keys and explicit nulls alike
        if value == "null" {
            return Err(EngineError::KeyNotFound(key.to_string()));
        }
        Ok(value)
    }

    fn set_key(&self, file: &Path, key: &KeyPath, value: &str) -> Result<()> {
        let file = file.to_string_lossy();
        let expression = format!("{} = strenv({})", key.as_str(), VALUE_ENV);
        self.run(&["eval", "-i", &expression, &file], Some(value))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_binary_is_reported() {
        let engine = YqEngine::new("/nonexistent/yq-binary");
        let key = KeyPath::parse(".image.tag").unwrap();
        let err = engine.read_key(Path::new("values.yaml"), &key).unwrap_err();
        assert!(err.to_string().contains("failed to run /nonexistent/yq-binary"));
    }
}
