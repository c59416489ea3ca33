//! Error types at the component boundaries.
//!
//! Collaborators (connectors, record store, config file I/O) report through
//! `anyhow`; the parts of the pipeline whose failures a caller must tell apart
//! use the typed enums below.

use std::path::PathBuf;

use thiserror::Error;

/// Fatal configuration problems, raised before any side effect.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("track configuration `{0}` is missing")]
    MissingTrack(String),

    #[error("invalid configuration value for `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Failures of the publication transaction.
#[derive(Debug, Error)]
pub enum PublishError {
    #[error("not a git repository: {0}")]
    NotARepository(PathBuf),

    #[error("working tree is dirty; aborting publishing")]
    DirtyWorkingTree,

    #[error("file path escapes repository: {0}")]
    PathEscape(String),

    #[error("commit message is required for git publishing")]
    MissingCommitMessage,

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A version-control command exited unsuccessfully or could not be spawned.
    #[error("`{command}` failed: {output}")]
    Command { command: String, output: String },
}

pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> PublishError {
    PublishError::Io {
        path: path.into(),
        source,
    }
}

/// Feed serialization failures. Parsing never fails: a malformed feed is
/// replaced by a fresh document.
#[derive(Debug, Error)]
pub enum FeedError {
    #[error("feed XML write failed: {0}")]
    Xml(String),

    #[error("feed date out of range: {0}")]
    Date(String),

    #[error("manifest JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
