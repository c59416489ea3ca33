//! Version-control capability used by the publication transaction, and the
//! `git` subprocess implementation of it.

use std::path::{Path, PathBuf};
use std::process::Command;

use crate::error::PublishError;

/// The operations the publication transaction needs from a working tree.
pub trait VersionControl {
    /// Working-tree root every payload path is resolved against.
    fn root(&self) -> &Path;
    fn is_repository(&self) -> bool;
    fn is_clean(&self) -> Result<bool, PublishError>;
    fn fetch(&self, remote: &str, branch: &str) -> Result<(), PublishError>;
    fn checkout(&self, branch: &str) -> Result<(), PublishError>;
    fn pull(&self, remote: &str, branch: &str) -> Result<(), PublishError>;
    /// Create `branch` at HEAD, resetting it if it already exists.
    fn reset_branch(&self, branch: &str) -> Result<(), PublishError>;
    fn stage(&self, paths: &[String]) -> Result<(), PublishError>;
    fn has_staged_changes(&self) -> Result<bool, PublishError>;
    /// Commit the index and return the new commit hash.
    fn commit(&self, message: &str) -> Result<String, PublishError>;
    fn push(&self, remote: &str, branch: &str) -> Result<(), PublishError>;
}

/// Commit identity passed as `-c user.name=… -c user.email=…`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitIdentity {
    pub name: String,
    pub email: String,
}

#[derive(Debug, Clone)]
pub struct GitCli {
    root: PathBuf,
    identity: Option<CommitIdentity>,
}

impl GitCli {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            identity: None,
        }
    }

    pub fn with_identity(mut self, identity: Option<CommitIdentity>) -> Self {
        self.identity = identity;
        self
    }

    fn run(&self, args: &[&str]) -> Result<String, PublishError> {
        let command = format!("git {}", args.join(" "));
        let output = Command::new("git")
            .arg("-C")
            .arg(&self.root)
            .args(args)
            .env("GIT_TERMINAL_PROMPT", "0")
            .output()
            .map_err(|e| PublishError::Command {
                command: command.clone(),
                output: format!("failed to spawn git: {e}"),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
            tracing::error!(target: "publish", %command, %stderr, "git command failed");
            return Err(PublishError::Command {
                command,
                output: if stderr.is_empty() { stdout } else { stderr },
            });
        }
        tracing::debug!(target: "publish", %command, "git command ok");
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl VersionControl for GitCli {
    fn root(&self) -> &Path {
        &self.root
    }

    fn is_repository(&self) -> bool {
        self.root.join(".git").exists()
    }

    fn is_clean(&self) -> Result<bool, PublishError> {
        Ok(self.run(&["status", "--porcelain"])?.trim().is_empty())
    }

    fn fetch(&self, remote: &str, branch: &str) -> Result<(), PublishError> {
        self.run(&["fetch", remote, branch]).map(drop)
    }

    fn checkout(&self, branch: &str) -> Result<(), PublishError> {
        self.run(&["checkout", branch]).map(drop)
    }

    fn pull(&self, remote: &str, branch: &str) -> Result<(), PublishError> {
        self.run(&["pull", remote, branch]).map(drop)
    }

    fn reset_branch(&self, branch: &str) -> Result<(), PublishError> {
        self.run(&["checkout", "-B", branch]).map(drop)
    }

    fn stage(&self, paths: &[String]) -> Result<(), PublishError> {
        let mut args = vec!["add", "--"];
        args.extend(paths.iter().map(String::as_str));
        self.run(&args).map(drop)
    }

    fn has_staged_changes(&self) -> Result<bool, PublishError> {
        Ok(!self.run(&["diff", "--cached", "--name-only"])?.trim().is_empty())
    }

    fn commit(&self, message: &str) -> Result<String, PublishError> {
        let mut args: Vec<String> = Vec::new();
        if let Some(id) = &self.identity {
            args.extend([
                "-c".to_string(),
                format!("user.name={}", id.name),
                "-c".to_string(),
                format!("user.email={}", id.email),
            ]);
        }
        args.extend(["commit".to_string(), "-m".to_string(), message.to_string()]);
        self.run(&args.iter().map(String::as_str).collect::<Vec<_>>())?;
        Ok(self.run(&["rev-parse", "HEAD"])?.trim().to_string())
    }

    fn push(&self, remote: &str, branch: &str) -> Result<(), PublishError> {
        self.run(&["push", "-u", remote, branch]).map(drop)
    }
}
