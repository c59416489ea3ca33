// src/ingest/providers/rss.rs
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use metrics::histogram;
use quick_xml::de::from_str;
use serde::Deserialize;
use std::time::Duration;
use time::{format_description::well_known::Rfc2822, OffsetDateTime, UtcOffset};

use crate::ingest::types::CandidateSource;
use crate::ingest::{link_hash, normalize_text};
use crate::model::{Candidate, SourceLink};

/// Entries taken from the head of each feed.
pub const MAX_ITEMS_PER_FEED: usize = 20;

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}

#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(rename = "item", default)]
    item: Vec<Item>,
}

#[derive(Debug, Deserialize)]
struct Item {
    title: Option<String>,
    link: Option<String>,
    #[serde(rename = "pubDate")]
    pub_date: Option<String>,
    description: Option<String>,
}

fn parse_rfc2822(ts: &str) -> Option<DateTime<Utc>> {
    OffsetDateTime::parse(ts.trim(), &Rfc2822)
        .ok()
        .map(|dt| dt.to_offset(UtcOffset::UTC).unix_timestamp())
        .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0))
}

/// Host part of a link, used as the candidate source label.
fn link_host(link: &str) -> String {
    url::Url::parse(link)
        .ok()
        .and_then(|u| u.host_str().map(str::to_string))
        .unwrap_or_default()
}

fn scrub_html_entities_for_xml(s: &str) -> String {
    s.replace("&nbsp;", " ")
        .replace("&ndash;", "-")
        .replace("&mdash;", "-")
        .replace("&ldquo;", "\"")
        .replace("&rdquo;", "\"")
        .replace("&lsquo;", "'")
        .replace("&rsquo;", "'")
}

/// Parse one RSS 2.0 document into candidates.
///
/// Entries without a title or link are skipped; a missing or unparsable
/// `pubDate` falls back to `now`.
pub fn parse_feed(xml: &str, now: DateTime<Utc>) -> Result<Vec<Candidate>> {
    let t0 = std::time::Instant::now();
    let xml_clean = scrub_html_entities_for_xml(xml);
    let rss: Rss = from_str(&xml_clean).context("parsing rss xml")?;

    let mut out = Vec::new();
    for it in rss.channel.item.into_iter().take(MAX_ITEMS_PER_FEED) {
        let title = normalize_text(it.title.as_deref().unwrap_or_default());
        let link = it.link.as_deref().unwrap_or_default().trim().to_string();
        if title.is_empty() || link.is_empty() {
            continue;
        }
        let summary = normalize_text(it.description.as_deref().unwrap_or_default());
        let published_at = it
            .pub_date
            .as_deref()
            .and_then(parse_rfc2822)
            .unwrap_or(now);

        out.push(Candidate {
            id: format!("rss:{}", link_hash(&link)),
            corroborating_links: vec![SourceLink::new(title.clone(), link.clone())],
            source: link_host(&link),
            title,
            summary,
            why_it_matters: String::new(),
            published_at,
            url: link,
            score: 0.0,
            tags: Vec::new(),
            manual_seed: false,
        });
    }

    histogram!("digest_rss_parse_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);
    Ok(out)
}

pub struct RssSource {
    mode: Mode,
}

enum Mode {
    Fixture(Vec<String>),
    Http {
        feeds: Vec<String>,
        client: reqwest::Client,
    },
}

impl RssSource {
    /// Serve pre-fetched documents, one per feed.
    pub fn from_fixtures<I, S>(documents: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            mode: Mode::Fixture(documents.into_iter().map(Into::into).collect()),
        }
    }

    pub fn from_urls(feeds: Vec<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("building rss http client")?;
        Ok(Self {
            mode: Mode::Http { feeds, client },
        })
    }
}

#[async_trait]
impl CandidateSource for RssSource {
    async fn fetch_candidates(&self) -> Result<Vec<Candidate>> {
        let now = Utc::now();
        let mut out = Vec::new();
        match &self.mode {
            Mode::Fixture(docs) => {
                for doc in docs {
                    out.extend(parse_feed(doc, now)?);
                }
            }
            Mode::Http { feeds, client } => {
                // One broken feed must not hide the others.
                for feed in feeds {
                    let body = match client.get(feed).send().await {
                        Ok(resp) => match resp.error_for_status() {
                            Ok(resp) => resp.text().await,
                            Err(e) => Err(e),
                        },
                        Err(e) => Err(e),
                    };
                    let parsed = body
                        .context("rss http get()")
                        .and_then(|b| parse_feed(&b, now));
                    match parsed {
                        Ok(mut v) => out.append(&mut v),
                        Err(e) => {
                            tracing::warn!(target: "ingest", error = ?e, feed = %feed, "rss feed skipped");
                        }
                    }
                }
            }
        }
        tracing::info!(target: "ingest", count = out.len(), "rss candidates collected");
        Ok(out)
    }

    fn name(&self) -> &'static str {
        "rss"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0"><channel><title>Example</title>
<item><title>Chip export rules tightened</title><link>https://example.org/chips</link>
<pubDate>Wed, 01 Oct 2025 07:00:00 +0000</pubDate><description>&lt;p&gt;New &amp;amp; stricter rules&lt;/p&gt;</description></item>
<item><title></title><link>https://example.org/untitled</link></item>
<item><title>No date here</title><link>https://news.example.com/nodate</link></item>
</channel></rss>"#;

    #[test]
    fn parses_items_and_skips_untitled() {
        let now = Utc.with_ymd_and_hms(2025, 10, 2, 0, 0, 0).unwrap();
        let items = parse_feed(FEED, now).unwrap();
        assert_eq!(items.len(), 2);

        let first = &items[0];
        assert!(first.id.starts_with("rss:"));
        assert_eq!(first.source, "example.org");
        assert_eq!(first.url, "https://example.org/chips");
        assert_eq!(
            first.published_at,
            Utc.with_ymd_and_hms(2025, 10, 1, 7, 0, 0).unwrap()
        );
        assert_eq!(first.corroborating_links.len(), 1);
        assert!(!first.summary.contains("<p>"));

        assert_eq!(items[1].published_at, now);
    }

    #[test]
    fn empty_channel_is_not_an_error() {
        let xml = "<rss version=\"2.0\"><channel><title>x</title></channel></rss>";
        assert!(parse_feed(xml, Utc::now()).unwrap().is_empty());
    }

    #[tokio::test]
    async fn fixture_source_yields_candidates() {
        let source = RssSource::from_fixtures([FEED]);
        let items = source.fetch_candidates().await.unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(source.name(), "rss");
    }
}
