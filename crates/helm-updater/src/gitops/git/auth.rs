//! Git authentication environment.
//!
//! Turns an [`AuthMethod`] into the environment variables git needs: an
//! `GIT_SSH_COMMAND` pointing at the key file for SSH remotes, or a temporary
//! `GIT_ASKPASS` script answering the username/password prompts for HTTPS.

use std::path::{Path, PathBuf};

use secrecy::ExposeSecret;

use crate::credentials::AuthMethod;
use crate::gitops::error::{GitOpsError, Result};

/// Escapes a token for safe use in single-quoted shell strings.
/// Replaces single quotes with '\'' (end quote, escaped quote, start quote).
pub fn shell_escape_token(token: &str) -> String {
    token.replace('\'', "'\\''")
}

/// Escapes a token for safe use in Windows batch scripts.
#[cfg(windows)]
fn escape_token_for_windows_batch(token: &str) -> String {
    let mut escaped = String::with_capacity(token.len() * 2);
    for ch in token.chars() {
        match ch {
            '%' => escaped.push_str("%%"),
            '^' | '&' | '|' | '<' | '>' | '(' | ')' | '"' => {
                escaped.push('^');
                escaped.push(ch);
            }
            _ => escaped.push(ch),
        }
    }
    escaped
}

/// RAII guard for askpass script cleanup.
///
/// Deletes the askpass script when dropped so credentials are not left on
/// disk, whichever way the update ends.
#[derive(Debug)]
pub struct AskpassCleanup {
    path: Option<PathBuf>,
}

impl AskpassCleanup {
    pub(crate) fn new(path: PathBuf) -> Self {
        Self { path: Some(path) }
    }

    pub(crate) fn empty() -> Self {
        Self { path: None }
    }

    /// Path of the guarded script, if any.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }
}

impl Drop for AskpassCleanup {
    fn drop(&mut self) {
        if let Some(path) = self.path.take() {
            if let Err(e) = std::fs::remove_file(&path) {
                log::warn!("Failed to clean up askpass script: {}", e);
            }
        }
    }
}

/// Authentication environment for git commands.
#[derive(Debug)]
pub struct AuthEnv {
    /// Environment variables to set for every git command.
    pub env_vars: Vec<(String, String)>,
    /// Must outlive the git commands that use the askpass script.
    pub _cleanup: AskpassCleanup,
}

/// Builds the git environment for an auth method.
pub fn build_auth_env(auth: &AuthMethod) -> Result<AuthEnv> {
    let mut env = vec![("GIT_TERMINAL_PROMPT".to_string(), "0".to_string())];

    match auth {
        AuthMethod::Ssh { key } => {
            env.push(("GIT_SSH_COMMAND".to_string(), ssh_command(key.path())));

            Ok(AuthEnv {
                env_vars: env,
                _cleanup: AskpassCleanup::empty(),
            })
        }
        AuthMethod::Https { username, password } => {
            let cleanup = write_askpass_script(username, password.expose_secret())?;

            let askpass_path = cleanup
                .path()
                .and_then(Path::to_str)
                .ok_or_else(|| {
                    GitOpsError::AuthSetup(
                        "Temp directory path contains non-UTF8 characters".to_string(),
                    )
                })?
                .to_string();

            env.push(("GIT_ASKPASS".to_string(), askpass_path));

            Ok(AuthEnv {
                env_vars: env,
                _cleanup: cleanup,
            })
        }
    }
}

/// Builds `GIT_SSH_COMMAND` for the given key file.
fn ssh_command(key_path: &Path) -> String {
    let safe_path = {
        let display = key_path.display().to_string();
        let escaped = shell_escape_token(&display);
        if escaped.starts_with('-') {
            format!("'./{}'", escaped)
        } else {
            format!("'{}'", escaped)
        }
    };

    format!(
        "ssh -i {} -o IdentitiesOnly=yes -o StrictHostKeyChecking=accept-new",
        safe_path
    )
}

fn askpass_error(err: std::io::Error) -> GitOpsError {
    GitOpsError::AuthSetup(format!("could not write askpass script: {}", err))
}

/// Writes an askpass script answering git's username and password prompts.
fn write_askpass_script(username: &str, password: &str) -> Result<AskpassCleanup> {
    let temp_dir = std::env::temp_dir();
    let random_suffix = uuid::Uuid::new_v4().to_string();

    #[cfg(unix)]
    let (askpass_path, askpass_script) = {
        let path = temp_dir.join(format!(".git-askpass-{}.sh", random_suffix));
        let script = format!(
            r#"#!/bin/sh
case "$1" in
  Username*) echo '{}' ;;
  *) echo '{}' ;;
esac
"#,
            shell_escape_token(username),
            shell_escape_token(password)
        );
        (path, script)
    };

    #[cfg(windows)]
    let (askpass_path, askpass_script) = {
        let path = temp_dir.join(format!(".git-askpass-{}.bat", random_suffix));
        let script = format!(
            "@echo off\r\necho %~1 | findstr /B /C:\"Username\" >nul && (echo {}) || (echo {})\r\n",
            escape_token_for_windows_batch(username),
            escape_token_for_windows_batch(password)
        );
        (path, script)
    };

    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        let mut file = std::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .mode(0o700)
            .open(&askpass_path)
            .map_err(askpass_error)?;
        std::io::Write::write_all(&mut file, askpass_script.as_bytes()).map_err(askpass_error)?;
    }

    #[cfg(not(unix))]
    {
        std::fs::write(&askpass_path, &askpass_script).map_err(askpass_error)?;
    }

    Ok(AskpassCleanup::new(askpass_path))
}
