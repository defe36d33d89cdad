//! Git transport error types.

use thiserror::Error;

/// Errors raised by git transport operations.
///
/// Messages carry git's own output verbatim so callers see exactly what the
/// remote or the local git binary reported.
#[derive(Error, Debug)]
pub enum GitOpsError {
    #[error("`git {command}` failed: {message}")]
    GitOperation { command: String, message: String },

    #[error("`git {command}` network error: {message}")]
    GitNetworkError { command: String, message: String },

    #[error("`git {command}` authentication failed: {message}")]
    GitAuthFailed { command: String, message: String },

    #[error("failed to spawn git: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("git authentication setup failed: {0}")]
    AuthSetup(String),

    #[error("could not parse git output: {0}")]
    UnexpectedOutput(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Classifies git stderr into a more specific error variant.
pub fn classify_git_error(command: &str, stderr: &str) -> GitOpsError {
    let lower = stderr.to_lowercase();
    let command = command.to_string();
    let message = stderr.trim().to_string();

    if lower.contains("could not resolve host")
        || lower.contains("connection refused")
        || lower.contains("connection timed out")
        || lower.contains("network is unreachable")
        || lower.contains("unable to access")
        || lower.contains("failed to connect")
        || lower.contains("couldn't connect to server")
        || lower.contains("the remote end hung up unexpectedly")
    {
        return GitOpsError::GitNetworkError { command, message };
    }

    if lower.contains("authentication failed")
        || lower.contains("permission denied")
        || lower.contains("invalid credentials")
    {
        return GitOpsError::GitAuthFailed { command, message };
    }

    GitOpsError::GitOperation { command, message }
}

/// Result type for git transport operations.
pub type Result<T> = std::result::Result<T, GitOpsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_network_error() {
        let err = classify_git_error(
            "fetch origin",
            "fatal: unable to access 'https://example.com/repo.git/': Could not resolve host: example.com",
        );
        assert!(matches!(err, GitOpsError::GitNetworkError { .. }));
    }

    #[test]
    fn test_classify_auth_error() {
        let err = classify_git_error(
            "fetch origin",
            "git@localhost: Permission denied (publickey).\nfatal: Could not read from remote repository.",
        );
        assert!(matches!(err, GitOpsError::GitAuthFailed { .. }));
    }

    #[test]
    fn test_io_errors_are_not_reported_as_auth_setup() {
        let err: GitOpsError =
            std::io::Error::new(std::io::ErrorKind::NotFound, "values.yaml missing").into();
        assert!(matches!(err, GitOpsError::Io(_)));
        assert_eq!(err.to_string(), "I/O error: values.yaml missing");
    }

    #[test]
    fn test_classify_keeps_message_verbatim() {
        let err = classify_git_error(
            "checkout --force -B developp origin/developp",
            "fatal: 'origin/developp' is not a commit and a branch 'developp' cannot be created from it\n",
        );
        assert_eq!(
            err.to_string(),
            "`git checkout --force -B developp origin/developp` failed: fatal: 'origin/developp' is not a commit and a branch 'developp' cannot be created from it"
        );
    }
}
