// src/ingest/providers/highlights.rs
//! Daily highlights from a third-party JSON API (`{base}/api/highlights`).

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::time::Duration;

use crate::ingest::types::CandidateSource;
use crate::ingest::{link_hash, normalize_text};
use crate::model::{Candidate, SourceLink};

const MAX_HIGHLIGHTS: usize = 20;

#[derive(Debug, Clone, Deserialize)]
struct Highlight {
    title: Option<String>,
    #[serde(alias = "description")]
    summary: Option<String>,
    #[serde(alias = "link")]
    url: Option<String>,
    #[serde(alias = "date")]
    published: Option<String>,
    sme_context: Option<String>,
    #[serde(default)]
    tags: Vec<String>,
}

// The API answers either with a bare list or with `{ "items": [...] }`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum HighlightsAny {
    List(Vec<Highlight>),
    Wrapped {
        #[serde(default)]
        items: Vec<Highlight>,
    },
}

impl HighlightsAny {
    fn into_items(self) -> Vec<Highlight> {
        match self {
            HighlightsAny::List(v) => v,
            HighlightsAny::Wrapped { items } => items,
        }
    }
}

fn parse_datetime(value: Option<&str>, now: DateTime<Utc>) -> DateTime<Utc> {
    value
        .and_then(|v| DateTime::parse_from_rfc3339(v.trim()).ok())
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or(now)
}

/// Convert a highlights payload into candidates.
pub fn parse_highlights(body: &str, now: DateTime<Utc>) -> Result<Vec<Candidate>> {
    let any: HighlightsAny = serde_json::from_str(body).context("parse highlights JSON")?;

    let mut out = Vec::new();
    for h in any.into_items().into_iter().take(MAX_HIGHLIGHTS) {
        let title = h.title.as_deref().unwrap_or_default().trim().to_string();
        let link = h.url.as_deref().unwrap_or_default().trim().to_string();
        if title.is_empty() || link.is_empty() {
            continue;
        }
        let source = url::Url::parse(&link)
            .ok()
            .and_then(|u| u.host_str().map(str::to_string))
            .unwrap_or_default();
        out.push(Candidate {
            id: format!("highlights:{}", link_hash(&link)),
            summary: normalize_text(h.summary.as_deref().unwrap_or_default()),
            why_it_matters: h.sme_context.unwrap_or_default().trim().to_string(),
            published_at: parse_datetime(h.published.as_deref(), now),
            corroborating_links: vec![SourceLink::new(title.clone(), link.clone())],
            title,
            source,
            url: link,
            score: 0.0,
            tags: h.tags,
            manual_seed: false,
        });
    }
    Ok(out)
}

pub struct HighlightsSource {
    base_url: String,
    client: reqwest::Client,
}

impl HighlightsSource {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("building highlights http client")?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }
}

#[async_trait]
impl CandidateSource for HighlightsSource {
    async fn fetch_candidates(&self) -> Result<Vec<Candidate>> {
        let url = format!("{}/api/highlights", self.base_url);
        let body = self
            .client
            .get(&url)
            .send()
            .await
            .context("highlights get()")?
            .error_for_status()
            .context("highlights non-2xx")?
            .text()
            .await
            .context("highlights .text()")?;
        let out = parse_highlights(&body, Utc::now())?;
        tracing::info!(target: "ingest", count = out.len(), "highlights candidates collected");
        Ok(out)
    }

    fn name(&self) -> &'static str {
        "highlights"
    }
}
