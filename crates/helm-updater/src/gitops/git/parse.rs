//! Git output parsing helpers.

use std::process::Output;

/// Formats a git error with both stdout and stderr for better debugging.
pub fn format_git_error(output: &Output) -> String {
    let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
    let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();

    match (stderr.is_empty(), stdout.is_empty()) {
        (true, true) => format!(
            "Command failed with exit code {}",
            output.status.code().unwrap_or(-1)
        ),
        (true, false) => stdout,
        (false, true) => stderr,
        (false, false) => format!("{}\n{}", stderr, stdout),
    }
}

/// Extracts the branch a symbolic ref points to from `git ls-remote --symref` output.
///
/// The interesting line looks like `ref: refs/heads/main\tHEAD`.
pub fn parse_symref_branch(output: &str, symref: &str) -> Option<String> {
    output.lines().find_map(|line| {
        let rest = line.strip_prefix("ref:")?;
        let mut parts = rest.split_whitespace();
        let target = parts.next()?;
        let name = parts.next()?;
        if name != symref {
            return None;
        }
        target
            .strip_prefix("refs/heads/")
            .filter(|branch| !branch.is_empty())
            .map(str::to_string)
    })
}
