//! Link health: probe every distinct http(s) link of an edition.
//!
//! HEAD first, GET when HEAD answers >= 400 or fails. A link is broken when
//! its final status is >= 400 or the request failed (status 0). The check
//! itself never fails.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use metrics::counter;

use crate::config::LinkCheckConfig;
use crate::quality::pool::run_bounded;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeOutcome {
    pub status: u16,
    pub error: Option<String>,
}

impl ProbeOutcome {
    pub fn status(status: u16) -> Self {
        Self {
            status,
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            status: 0,
            error: Some(error.into()),
        }
    }

    pub fn is_broken(&self) -> bool {
        self.status >= 400 || self.status == 0 || self.error.is_some()
    }
}

#[async_trait]
pub trait LinkProbe: Send + Sync {
    async fn probe(&self, url: &str) -> ProbeOutcome;
}

/// Real probe over a shared `reqwest::Client` (redirects followed).
pub struct HttpProbe {
    client: reqwest::Client,
}

impl HttpProbe {
    pub fn new(cfg: &LinkCheckConfig) -> anyhow::Result<Self> {
        Self::from_builder(reqwest::Client::builder(), cfg)
    }

    fn from_builder(builder: reqwest::ClientBuilder, cfg: &LinkCheckConfig) -> anyhow::Result<Self> {
        let client = builder
            .user_agent(cfg.user_agent.clone())
            .timeout(Duration::from_secs_f64(cfg.timeout_secs))
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl LinkProbe for HttpProbe {
    async fn probe(&self, url: &str) -> ProbeOutcome {
        match self.client.head(url).send().await {
            Ok(resp) if resp.status().as_u16() < 400 => {
                return ProbeOutcome::status(resp.status().as_u16());
            }
            Ok(resp) => {
                tracing::debug!(target: "quality", %url, status = resp.status().as_u16(), "HEAD rejected, retrying with GET");
            }
            Err(e) => {
                tracing::debug!(target: "quality", %url, error = %e, "HEAD failed, retrying with GET");
            }
        }
        match self.client.get(url).send().await {
            Ok(resp) => ProbeOutcome::status(resp.status().as_u16()),
            Err(e) => ProbeOutcome::failed(e.to_string()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkHealthReport {
    pub status_map: BTreeMap<String, u16>,
    pub broken_links: Vec<String>,
    pub checked: usize,
}

impl LinkHealthReport {
    pub fn ok(&self) -> bool {
        self.broken_links.is_empty()
    }
}

pub fn is_http_url(link: &str) -> bool {
    url::Url::parse(link)
        .map(|u| matches!(u.scheme(), "http" | "https"))
        .unwrap_or(false)
}

#[derive(Clone)]
pub struct LinkHealthChecker {
    probe: Arc<dyn LinkProbe>,
    max_concurrency: usize,
}

impl LinkHealthChecker {
    pub fn new(probe: Arc<dyn LinkProbe>, max_concurrency: usize) -> Self {
        Self {
            probe,
            max_concurrency: max_concurrency.max(1),
        }
    }

    pub async fn check_links<I, S>(&self, links: I) -> LinkHealthReport
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut seen = HashSet::new();
        let urls: Vec<String> = links
            .into_iter()
            .map(|l| l.as_ref().trim().to_string())
            .filter(|l| is_http_url(l))
            .filter(|l| seen.insert(l.clone()))
            .collect();
        if urls.is_empty() {
            return LinkHealthReport::default();
        }

        let probe = Arc::clone(&self.probe);
        let results = run_bounded(urls.clone(), self.max_concurrency, move |url: String| {
            let probe = Arc::clone(&probe);
            async move { probe.probe(&url).await }
        })
        .await;

        let mut report = LinkHealthReport {
            checked: urls.len(),
            ..Default::default()
        };
        for (url, result) in urls.into_iter().zip(results) {
            let outcome = result.unwrap_or_else(|e| ProbeOutcome::failed(e.to_string()));
            if let Some(err) = &outcome.error {
                tracing::debug!(target: "quality", %url, error = %err, "link check error");
            }
            report.status_map.insert(url.clone(), outcome.status);
            if outcome.is_broken() {
                report.broken_links.push(url);
            }
        }
        counter!("digest_broken_links_total").increment(report.broken_links.len() as u64);
        tracing::info!(
            target: "quality",
            checked = report.checked,
            broken = report.broken_links.len(),
            "link health checked"
        );
        report
    }
}
