// src/ingest/types.rs
use anyhow::Result;

use crate::model::Candidate;

/// A connector producing normalized candidates for one origin.
#[async_trait::async_trait]
pub trait CandidateSource: Send + Sync {
    async fn fetch_candidates(&self) -> Result<Vec<Candidate>>;
    fn name(&self) -> &'static str;
}
