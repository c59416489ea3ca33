// src/model.rs
//! Value records shared by every pipeline stage.
//!
//! Records are plain values. Stages that "change" a record consume it and hand
//! back a new one (`with_*` helpers) instead of mutating shared state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Candidate ids coming from the manual review queue carry this prefix.
pub const MANUAL_ID_PREFIX: &str = "manual:";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceLink {
    pub title: String,
    pub url: String,
}

impl SourceLink {
    pub fn new(title: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            url: url.into(),
        }
    }
}

/// A normalized news item proposed by a connector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    /// Unique per origin + natural key, e.g. `manual:<record-id>`, `rss:<link-hash>`.
    pub id: String,
    pub title: String,
    pub summary: String,
    pub why_it_matters: String,
    pub published_at: DateTime<Utc>,
    pub source: String,
    pub url: String,
    #[serde(default)]
    pub score: f64,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub corroborating_links: Vec<SourceLink>,
    #[serde(default)]
    pub manual_seed: bool,
}

impl Candidate {
    /// URL with any `#fragment` removed; the deduplication key.
    pub fn url_key(&self) -> &str {
        self.url.split('#').next().unwrap_or_default()
    }

    pub fn with_score(self, score: f64) -> Self {
        Self { score, ..self }
    }

    pub fn is_manual(&self) -> bool {
        self.manual_seed || self.id.starts_with(MANUAL_ID_PREFIX)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DigestItem {
    /// 1-based publication order.
    pub order: usize,
    pub candidate_id: String,
    pub headline: String,
    pub what_happened: String,
    pub why_it_matters: String,
    pub links: Vec<SourceLink>,
}

impl DigestItem {
    pub fn is_manual(&self) -> bool {
        self.candidate_id.starts_with(MANUAL_ID_PREFIX)
    }
}

/// One run's ordered set of digest items plus locale-rendered text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DigestEdition {
    pub title: String,
    pub slug: String,
    pub track: String,
    pub generated_at: DateTime<Utc>,
    pub locale_outputs: BTreeMap<String, String>,
    pub items: Vec<DigestItem>,
    pub metadata: BTreeMap<String, serde_json::Value>,
}

impl DigestEdition {
    pub fn with_items(self, items: Vec<DigestItem>) -> Self {
        Self { items, ..self }
    }

    pub fn with_locale_outputs(self, locale_outputs: BTreeMap<String, String>) -> Self {
        Self {
            locale_outputs,
            ..self
        }
    }

    pub fn manual_item_ids(&self) -> Vec<String> {
        self.items
            .iter()
            .filter(|i| i.is_manual())
            .map(|i| i.candidate_id.clone())
            .collect()
    }
}

/// Aggregate result of the quality gate. Publishable iff `issues` is empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QualityReport {
    pub readability: f64,
    pub link_health_passed: bool,
    pub duplicate_flag: bool,
    pub translation_ready: bool,
    pub details: BTreeMap<String, serde_json::Value>,
    pub issues: Vec<String>,
}

impl QualityReport {
    pub fn is_publishable(&self) -> bool {
        self.issues.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkdownArtifact {
    pub path: String,
    pub content: String,
    pub locale: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitFile {
    /// Path relative to the repository root.
    pub path: String,
    pub content: String,
}

impl CommitFile {
    pub fn new(path: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            content: content.into(),
        }
    }
}

/// The sole handoff unit from rendering to publication.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GitCommitPayload {
    pub branch_name: String,
    pub commit_message: String,
    pub files: Vec<CommitFile>,
    #[serde(default)]
    pub metadata: BTreeMap<String, serde_json::Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn candidate(id: &str, url: &str) -> Candidate {
        Candidate {
            id: id.into(),
            title: "t".into(),
            summary: "s".into(),
            why_it_matters: String::new(),
            published_at: Utc.with_ymd_and_hms(2025, 10, 1, 7, 0, 0).unwrap(),
            source: "example.org".into(),
            url: url.into(),
            score: 0.0,
            tags: vec![],
            corroborating_links: vec![],
            manual_seed: false,
        }
    }

    #[test]
    fn url_key_strips_fragment() {
        let c = candidate("rss:1", "https://example.org/a#section-2");
        assert_eq!(c.url_key(), "https://example.org/a");
        let blank = candidate("rss:2", "");
        assert_eq!(blank.url_key(), "");
    }

    #[test]
    fn with_score_leaves_original_untouched() {
        let c = candidate("rss:1", "https://example.org/a");
        let scored = c.clone().with_score(0.7);
        assert_eq!(c.score, 0.0);
        assert_eq!(scored.score, 0.7);
        assert_eq!(scored.id, c.id);
    }

    #[test]
    fn manual_prefix_marks_candidate_as_manual() {
        assert!(candidate("manual:42", "").is_manual());
        assert!(!candidate("rss:42", "").is_manual());
    }
}
