//! Credential selection for a repository URL.
//!
//! Decides how git should authenticate against a remote. Nothing here talks
//! to the network: an SSH URL needs key material, an HTTPS URL needs a
//! username and password, and anything else is rejected up front.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use secrecy::{ExposeSecret, SecretString};
use tempfile::NamedTempFile;

use crate::error::{Result, UpdateError};
use crate::secrets::expand_home;

/// Where the SSH private key comes from.
#[derive(Debug)]
pub enum SshKeySource {
    /// Key content, written to a temporary file for the duration of the update.
    Inline(SecretString),
    /// Path to an existing key file. `~` is expanded.
    Path(PathBuf),
}

/// Credential material for one repository.
#[derive(Debug, Default)]
pub struct Credentials {
    /// Commit author name. Also the HTTPS username.
    pub username: String,
    /// Commit author email. Never used for authentication.
    pub email: String,
    /// HTTPS password or token.
    pub password: Option<SecretString>,
    /// SSH private key.
    pub ssh_key: Option<SshKeySource>,
}

impl Credentials {
    /// Returns the commit identity when both name and email are set.
    pub fn identity(&self) -> Option<(&str, &str)> {
        if self.username.is_empty() || self.email.is_empty() {
            None
        } else {
            Some((&self.username, &self.email))
        }
    }
}

/// URL scheme family of a git remote.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepoScheme {
    Ssh,
    Https,
}

static RE_SSH_URL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:ssh://)?[\w.~-]+@[\w.-]+(?::\d+)?[:/]\S+$").unwrap());

/// Classifies a repository URL. Returns None for unsupported forms.
pub fn classify_url(url: &str) -> Option<RepoScheme> {
    if RE_SSH_URL.is_match(url) {
        Some(RepoScheme::Ssh)
    } else if url.to_ascii_lowercase().starts_with("https://") {
        Some(RepoScheme::Https)
    } else {
        None
    }
}

/// SSH key file handed to git.
#[derive(Debug)]
pub enum SshKeyFile {
    /// Inline key written to a temp file, deleted when this value is dropped.
    Materialized(NamedTempFile),
    /// Key file owned by the user.
    Existing(PathBuf),
}

impl SshKeyFile {
    pub fn path(&self) -> &Path {
        match self {
            SshKeyFile::Materialized(file) => file.path(),
            SshKeyFile::Existing(path) => path,
        }
    }
}

/// How git authenticates against the remote.
#[derive(Debug)]
pub enum AuthMethod {
    Ssh { key: SshKeyFile },
    Https { username: String, password: SecretString },
}

/// Picks the auth method for `repo_url` and checks the matching secret is present.
pub fn resolve(repo_url: &str, credentials: &Credentials) -> Result<AuthMethod> {
    match classify_url(repo_url) {
        Some(RepoScheme::Ssh) => resolve_ssh(repo_url, credentials),
        Some(RepoScheme::Https) => resolve_https(repo_url, credentials),
        None => Err(UpdateError::UnknownRepositoryType(repo_url.to_string())),
    }
}

fn resolve_ssh(repo_url: &str, credentials: &Credentials) -> Result<AuthMethod> {
    let key = match &credentials.ssh_key {
        Some(SshKeySource::Inline(content)) if !content.expose_secret().trim().is_empty() => {
            SshKeyFile::Materialized(materialize_key(content.expose_secret())?)
        }
        Some(SshKeySource::Path(path)) if !path.as_os_str().is_empty() => {
            let expanded = PathBuf::from(expand_home(&path.to_string_lossy()));
            if !expanded.is_file() {
                return Err(UpdateError::SshKeyFileNotFound(expanded));
            }
            SshKeyFile::Existing(expanded)
        }
        _ => return Err(UpdateError::SshKeyNotProvided(repo_url.to_string())),
    };

    Ok(AuthMethod::Ssh { key })
}

fn resolve_https(repo_url: &str, credentials: &Credentials) -> Result<AuthMethod> {
    match &credentials.password {
        Some(password)
            if !credentials.username.is_empty() && !password.expose_secret().is_empty() =>
        {
            Ok(AuthMethod::Https {
                username: credentials.username.clone(),
                password: SecretString::from(password.expose_secret().to_string()),
            })
        }
        _ => Err(UpdateError::CredentialsNotProvided(repo_url.to_string())),
    }
}

/// Checks that the content is an armored PEM or OpenSSH private key.
fn validate_private_key(content: &str) -> Result<()> {
    let trimmed = content.trim();
    let first = trimmed.lines().next().unwrap_or_default();
    let last = trimmed.lines().last().unwrap_or_default();

    if !(first.starts_with("-----BEGIN ") && first.ends_with("PRIVATE KEY-----")) {
        return Err(UpdateError::InvalidSshKey(
            "missing private key header".to_string(),
        ));
    }
    if !(last.starts_with("-----END ") && last.ends_with("PRIVATE KEY-----")) {
        return Err(UpdateError::InvalidSshKey(
            "missing private key footer".to_string(),
        ));
    }

    Ok(())
}

/// Writes key content to a temp file readable only by the owner.
fn materialize_key(content: &str) -> Result<NamedTempFile> {
    validate_private_key(content)?;

    let mut file = tempfile::Builder::new()
        .prefix(".helm-updater-key-")
        .tempfile()
        .map_err(UpdateError::SshKeyMaterialization)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(file.path(), std::fs::Permissions::from_mode(0o600))
            .map_err(UpdateError::SshKeyMaterialization)?;
    }

    // ssh refuses keys without a trailing newline
    writeln!(file, "{}", content.trim()).map_err(UpdateError::SshKeyMaterialization)?;
    file.flush().map_err(UpdateError::SshKeyMaterialization)?;

    Ok(file)
}
