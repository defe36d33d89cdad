//! Commit composition: message rendering and staging.

pub mod template;

use std::io::Write;
use std::path::Path;

use tempfile::NamedTempFile;

use crate::error::{Result, UpdateError};
use crate::gitops::GitClient;
use crate::values::ChangeEntry;

pub use template::{CommitTemplate, TemplateError, DEFAULT_COMMIT_TEMPLATE};

/// Message used when there is nothing to enumerate or the template fails.
pub fn fallback_message(app_name: &str) -> String {
    format!("update of application {}", app_name)
}

/// Renders the commit message for `changes`.
///
/// Uses `template` when given, otherwise [`DEFAULT_COMMIT_TEMPLATE`]. Template
/// errors are logged and replaced by [`fallback_message`].
pub fn compose(app_name: &str, changes: &[ChangeEntry], template: Option<&str>) -> String {
    if changes.is_empty() {
        return fallback_message(app_name);
    }

    let source = template.unwrap_or(DEFAULT_COMMIT_TEMPLATE);
    match CommitTemplate::parse(source) {
        Ok(template) => template.render(app_name, changes),
        Err(e) => {
            log::error!(
                "could not render commit message template, using fallback application={} error={}",
                app_name,
                e
            );
            fallback_message(app_name)
        }
    }
}

/// Writes `message` to a temporary file for `git commit -F`.
///
/// The file is removed when the returned handle is dropped.
pub fn write_message_file(message: &str) -> Result<NamedTempFile> {
    let mut file = tempfile::Builder::new()
        .prefix(".helm-updater-commit-")
        .tempfile()
        .map_err(|e| UpdateError::CommitMessage {
            path: std::env::temp_dir(),
            source: e,
        })?;

    file.write_all(message.as_bytes())
        .and_then(|_| file.flush())
        .map_err(|e| UpdateError::CommitMessage {
            path: file.path().to_path_buf(),
            source: e,
        })?;

    Ok(file)
}

/// Stages `target_file` (relative to the working copy root).
pub fn stage<C: GitClient>(client: &C, target_file: &Path) -> Result<()> {
    client.add(&client.root().join(target_file))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn change() -> ChangeEntry {
        ChangeEntry {
            key: ".image.tag".into(),
            old_value: "1.0.0".into(),
            new_value: "1.1.0".into(),
            file: "example-app/values.yaml".into(),
        }
    }

    #[test]
    fn test_compose_default_template() {
        let message = compose("example-app", &[change()], None);
        assert_eq!(
            message,
            "automatic update of example-app\nupdates key .image.tag value from '1.0.0' to '1.1.0'\n"
        );
    }

    #[test]
    fn test_compose_custom_template() {
        let message = compose(
            "example-app",
            &[change()],
            Some("deploy {{app_name}} {{#changes}}{{new_value}}{{/changes}}"),
        );
        assert_eq!(message, "deploy example-app 1.1.0");
    }

    #[test]
    fn test_compose_falls_back_on_template_error() {
        let message = compose("example-app", &[change()], Some("{{#changes}}{{nope}}"));
        assert_eq!(message, "update of application example-app");
    }

    #[test]
    fn test_compose_without_changes() {
        assert_eq!(compose("example-app", &[], None), "update of application example-app");
    }

    #[test]
    fn test_write_message_file_is_removed_on_drop() {
        let file = write_message_file("bump\n").unwrap();
        let path = file.path().to_path_buf();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "bump\n");

        drop(file);
        assert!(!path.exists());
    }
}
