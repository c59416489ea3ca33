// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod config;
pub mod error;
pub mod model;
pub mod store;
pub mod telemetry;

// Candidate collection and ranking
pub mod analyze;
pub mod ingest;

// Edition assembly, gating and publication
pub mod enhance;
pub mod feed;
pub mod job;
pub mod publish;
pub mod quality;
pub mod render;

pub mod notify;

// ---- Re-exports for stable public API ----
pub use crate::config::{load_config_default, load_config_from, DigestConfig};
pub use crate::error::{ConfigError, FeedError, PublishError};
pub use crate::job::{DigestJob, JobDeps, RunOutcome, RunReport, RunSummary};
pub use crate::model::{
    Candidate, CommitFile, DigestEdition, DigestItem, GitCommitPayload, QualityReport, SourceLink,
};
