// src/ingest/providers/manual.rs
use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;

use crate::ingest::types::CandidateSource;
use crate::model::{Candidate, SourceLink, MANUAL_ID_PREFIX};
use crate::store::{ManualInsert, ReviewStore};

/// Pending records of the manual review queue, as candidates.
pub struct ManualSource {
    store: Arc<dyn ReviewStore>,
    track: String,
}

impl ManualSource {
    pub fn new(store: Arc<dyn ReviewStore>, track: impl Into<String>) -> Self {
        Self {
            store,
            track: track.into(),
        }
    }
}

pub fn candidate_from_insert(row: &ManualInsert) -> Candidate {
    let links: Vec<SourceLink> = row
        .source_links
        .iter()
        .map(|url| SourceLink::new(row.title.clone(), url.clone()))
        .collect();
    Candidate {
        id: format!("{MANUAL_ID_PREFIX}{}", row.id),
        title: row.title.clone(),
        summary: row.summary.clone(),
        why_it_matters: row.summary.clone(),
        published_at: row.created_at,
        source: "manual".to_string(),
        url: links.first().map(|l| l.url.clone()).unwrap_or_default(),
        score: 0.0,
        tags: vec!["manual".to_string()],
        corroborating_links: links,
        manual_seed: true,
    }
}

/// Record id behind a `manual:<id>` candidate id.
pub fn record_id(candidate_id: &str) -> Option<&str> {
    candidate_id
        .strip_prefix(MANUAL_ID_PREFIX)
        .filter(|id| !id.is_empty())
}

#[async_trait]
impl CandidateSource for ManualSource {
    async fn fetch_candidates(&self) -> Result<Vec<Candidate>> {
        let rows = self.store.fetch_pending(&self.track)?;
        let out: Vec<Candidate> = rows.iter().map(candidate_from_insert).collect();
        tracing::info!(target: "ingest", count = out.len(), "manual inserts loaded");
        Ok(out)
    }

    fn name(&self) -> &'static str {
        "manual"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{InMemoryReviewStore, InsertStatus};
    use chrono::Utc;

    #[tokio::test]
    async fn pending_records_become_manual_seeds() {
        let store = Arc::new(InMemoryReviewStore::with_inserts(vec![ManualInsert {
            id: "42".into(),
            track: "news".into(),
            title: "Editor pick".into(),
            summary: "Why we picked it".into(),
            source_links: vec!["https://a.example/1".into(), "https://b.example/2".into()],
            priority: 1,
            status: InsertStatus::Pending,
            submitted_by: "editor".into(),
            created_at: Utc::now(),
            decided_at: None,
        }]));
        let source = ManualSource::new(store, "news");
        let out = source.fetch_candidates().await.unwrap();
        assert_eq!(out.len(), 1);
        let c = &out[0];
        assert_eq!(c.id, "manual:42");
        assert!(c.manual_seed);
        assert_eq!(c.url, "https://a.example/1");
        assert_eq!(c.corroborating_links.len(), 2);
        assert_eq!(c.why_it_matters, c.summary);
    }

    #[test]
    fn record_id_strips_prefix() {
        assert_eq!(record_id("manual:42"), Some("42"));
        assert_eq!(record_id("manual:"), None);
        assert_eq!(record_id("rss:42"), None);
    }
}
