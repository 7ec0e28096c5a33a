//! Revision-control metadata for `${gitHash}` and `${gitBranch}`.

use std::{path::Path, process::Command};

use crate::error::{CoreError, Result};

/// The checked-out revision of the project repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Revision {
    /// Full commit hash of `HEAD`.
    pub hash: String,

    /// Current branch name (`HEAD` when detached).
    pub branch: String,
}

impl Revision {
    /// Create a revision from known values.
    #[must_use]
    pub fn new(hash: impl Into<String>, branch: impl Into<String>) -> Self {
        Self {
            hash: hash.into(),
            branch: branch.into(),
        }
    }

    /// Read the revision of the git work tree containing `dir`.
    pub fn detect(dir: &Path) -> Result<Self> {
        let hash = git(dir, &["rev-parse", "HEAD"])?;
        if hash.len() < 7 || hash.len() > 64 || !hash.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(CoreError::revision(format!("unexpected commit hash: {hash}")));
        }

        let branch = git(dir, &["rev-parse", "--abbrev-ref", "HEAD"])?;

        tracing::debug!(%hash, %branch, "detected revision");
        Ok(Self { hash, branch })
    }
}

fn git(dir: &Path, args: &[&str]) -> Result<String> {
    let output = Command::new("git")
        .args(args)
        .current_dir(dir)
        .output()
        .map_err(|e| CoreError::revision(format!("failed to run git {}: {e}", args.join(" "))))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(CoreError::revision(format!(
            "git {} failed in {}: {}",
            args.join(" "),
            dir.display(),
            stderr.trim()
        )));
    }

    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}
