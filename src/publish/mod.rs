//! Publication transaction: apply a `GitCommitPayload` onto a working tree.
//!
//! Steps run in a fixed order and stop at the first failure. Fetch and pull
//! are best-effort; every other VCS failure surfaces as a `PublishError`.
//! Payload paths are checked lexically and then against the real filesystem,
//! so a symlink cannot carry a write out of the repository.

pub mod git;

use std::fs;
use std::path::{Component, Path, PathBuf};

use chrono::{DateTime, Utc};
use metrics::counter;
use serde::Serialize;

use crate::config::DigestConfig;
use crate::error::{io_err, PublishError};
use crate::model::GitCommitPayload;

pub use git::{CommitIdentity, GitCli, VersionControl};

#[derive(Debug, Clone)]
pub struct PublishSettings {
    pub base_branch: String,
    pub remote: String,
    pub push: bool,
    pub allow_dirty: bool,
}

impl PublishSettings {
    pub fn from_config(cfg: &DigestConfig) -> Self {
        Self {
            base_branch: cfg.app.git.main_branch.clone(),
            remote: cfg.publishing.remote.clone(),
            push: cfg.publishing.push,
            allow_dirty: cfg.publishing.allow_dirty,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PublishOutcome {
    pub branch: String,
    /// `None` when nothing was committed.
    pub commit: Option<String>,
    pub files_written: Vec<String>,
    pub pushed: bool,
}

/// `{prefix}/{slug}` with doubled separators collapsed.
pub fn branch_name(prefix: &str, slug: &str) -> String {
    let raw = format!("{}/{}", prefix.trim_matches('/'), slug.trim_matches('/'));
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        if ch == '/' && out.ends_with('/') {
            continue;
        }
        out.push(ch);
    }
    out.trim_start_matches('/').to_string()
}

/// Fill `{date}` (YYYY-MM-DD) and `{slug}` in a commit message template.
pub fn commit_message(template: &str, generated_at: DateTime<Utc>, slug: &str) -> String {
    template
        .replace("{date}", &generated_at.format("%Y-%m-%d").to_string())
        .replace("{slug}", slug)
}

/// Resolve a payload path under `root` without touching the filesystem.
/// Absolute paths and any `..` that climbs above `root` are rejected.
fn resolve_under(root: &Path, rel: &str) -> Result<PathBuf, PublishError> {
    let escape = || PublishError::PathEscape(rel.to_string());
    if rel.trim().is_empty() {
        return Err(escape());
    }
    let mut parts: Vec<&std::ffi::OsStr> = Vec::new();
    for comp in Path::new(rel).components() {
        match comp {
            Component::Normal(p) => parts.push(p),
            Component::CurDir => {}
            Component::ParentDir => {
                if parts.pop().is_none() {
                    return Err(escape());
                }
            }
            Component::RootDir | Component::Prefix(_) => return Err(escape()),
        }
    }
    if parts.is_empty() {
        return Err(escape());
    }
    Ok(parts.into_iter().fold(root.to_path_buf(), |acc, p| acc.join(p)))
}

/// Follow symlinks on the deepest existing ancestor of `abs` and require the
/// real location to stay under `root`, which must already be canonical.
/// Dangling symlinks are rejected.
fn ensure_real_path_inside(root: &Path, abs: &Path, rel: &str) -> Result<(), PublishError> {
    let escape = || PublishError::PathEscape(rel.to_string());
    let mut cursor = abs;
    loop {
        if fs::symlink_metadata(cursor).is_ok() {
            let real = cursor.canonicalize().map_err(|_| escape())?;
            return if real.starts_with(root) {
                Ok(())
            } else {
                Err(escape())
            };
        }
        cursor = cursor.parent().ok_or_else(escape)?;
    }
}

pub struct PublicationTransaction<V: VersionControl> {
    vcs: V,
    settings: PublishSettings,
}

impl<V: VersionControl> PublicationTransaction<V> {
    pub fn new(vcs: V, settings: PublishSettings) -> Self {
        Self { vcs, settings }
    }

    pub fn vcs(&self) -> &V {
        &self.vcs
    }

    /// Sync the base branch, then write and commit `payload`.
    pub fn apply(&self, payload: &GitCommitPayload) -> Result<PublishOutcome, PublishError> {
        self.sync_base()?;
        self.publish_synced(payload)
    }

    /// Steps 1 and 2: check the working tree and bring the base branch up to
    /// date. Callers that derive payload content from tracked files read them
    /// after this returns.
    pub fn sync_base(&self) -> Result<(), PublishError> {
        let result = self.sync_base_inner();
        if let Err(e) = &result {
            counter!("digest_publish_failures_total").increment(1);
            tracing::error!(target: "publish", base = %self.settings.base_branch, error = %e, "base sync failed");
        }
        result
    }

    /// Steps 3 to 8 on a tree already prepared by [`Self::sync_base`].
    pub fn publish_synced(&self, payload: &GitCommitPayload) -> Result<PublishOutcome, PublishError> {
        let result = self.write_and_commit(payload);
        match &result {
            Ok(outcome) => {
                counter!("digest_publish_total").increment(1);
                tracing::info!(
                    target: "publish",
                    branch = %outcome.branch,
                    commit = outcome.commit.as_deref().unwrap_or("-"),
                    files = outcome.files_written.len(),
                    pushed = outcome.pushed,
                    metadata = %serde_json::Value::Object(payload.metadata.clone().into_iter().collect()),
                    "publication complete"
                );
            }
            Err(e) => {
                counter!("digest_publish_failures_total").increment(1);
                tracing::error!(target: "publish", branch = %payload.branch_name, error = %e, "publication failed");
            }
        }
        result
    }

    fn sync_base_inner(&self) -> Result<(), PublishError> {
        let s = &self.settings;

        // 1. preconditions
        if !self.vcs.is_repository() {
            return Err(PublishError::NotARepository(self.vcs.root().to_path_buf()));
        }
        if !s.allow_dirty && !self.vcs.is_clean()? {
            return Err(PublishError::DirtyWorkingTree);
        }

        // 2. sync the base branch
        if let Err(e) = self.vcs.fetch(&s.remote, &s.base_branch) {
            tracing::warn!(target: "publish", remote = %s.remote, branch = %s.base_branch, error = %e, "fetch failed, continuing");
        }
        self.vcs.checkout(&s.base_branch)?;
        if let Err(e) = self.vcs.pull(&s.remote, &s.base_branch) {
            tracing::warn!(target: "publish", remote = %s.remote, branch = %s.base_branch, error = %e, "pull failed, continuing");
        }
        Ok(())
    }

    fn write_and_commit(&self, payload: &GitCommitPayload) -> Result<PublishOutcome, PublishError> {
        let s = &self.settings;
        let branch = payload.branch_name.clone();

        // 3. content branch
        self.vcs.reset_branch(&branch)?;

        // 4. validate every path before writing any of them
        let root = self
            .vcs
            .root()
            .canonicalize()
            .map_err(|e| io_err(self.vcs.root(), e))?;
        let targets = payload
            .files
            .iter()
            .map(|f| {
                let abs = resolve_under(&root, &f.path)?;
                ensure_real_path_inside(&root, &abs, &f.path)?;
                Ok::<_, PublishError>((abs, f))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let mut files_written = Vec::with_capacity(targets.len());
        for (abs, file) in targets {
            if let Some(parent) = abs.parent() {
                fs::create_dir_all(parent).map_err(|e| io_err(parent, e))?;
            }
            fs::write(&abs, &file.content).map_err(|e| io_err(&abs, e))?;
            files_written.push(file.path.clone());
        }

        // 5. nothing to stage
        if files_written.is_empty() {
            tracing::warn!(target: "publish", %branch, "payload has no files, nothing to publish");
            return Ok(PublishOutcome {
                branch,
                ..Default::default()
            });
        }
        self.vcs.stage(&files_written)?;

        // 6. commit preconditions
        if payload.commit_message.trim().is_empty() {
            return Err(PublishError::MissingCommitMessage);
        }
        if !self.vcs.has_staged_changes()? {
            tracing::info!(target: "publish", %branch, "content unchanged, nothing to commit");
            return Ok(PublishOutcome {
                branch,
                files_written,
                ..Default::default()
            });
        }

        // 7. commit
        let commit = self.vcs.commit(&payload.commit_message)?;

        // 8. push
        if s.push {
            self.vcs.push(&s.remote, &branch)?;
        }

        Ok(PublishOutcome {
            branch,
            commit: Some(commit),
            files_written,
            pushed: s.push,
        })
    }
}
