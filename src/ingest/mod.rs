// src/ingest/mod.rs
pub mod providers;
pub mod types;

use crate::ingest::types::CandidateSource;
use crate::model::Candidate;
use crate::telemetry::ensure_metrics_described;
use metrics::counter;
use once_cell::sync::OnceCell;
use std::collections::{BTreeMap, HashSet};

/// Max summary length kept from a connector, in chars.
const MAX_TEXT_CHARS: usize = 1500;

/// Normalize connector text: decode entities, strip tags, collapse whitespace.
pub fn normalize_text(s: &str) -> String {
    // 1) HTML entity decode
    let mut out = html_escape::decode_html_entities(s).to_string();

    // 2) Strip HTML tags
    static RE_TAGS: OnceCell<regex::Regex> = OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| regex::Regex::new(r"(?is)</?[^>]+>").unwrap());
    out = re_tags.replace_all(&out, " ").to_string();

    // 3) Normalize “ ” ‘ ’ « » to ASCII quotes
    out = out
        .replace(['\u{201C}', '\u{201D}', '\u{00AB}', '\u{00BB}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'");

    // 4) Collapse whitespace
    static RE_WS: OnceCell<regex::Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| regex::Regex::new(r"\s+").unwrap());
    out = re_ws.replace_all(&out, " ").trim().to_string();

    if out.chars().count() > MAX_TEXT_CHARS {
        out = out.chars().take(MAX_TEXT_CHARS).collect();
    }
    out
}

/// Short stable hash of a link, used as the natural key in candidate ids.
pub fn link_hash(link: &str) -> String {
    use sha2::{Digest, Sha256};
    let digest = Sha256::digest(link.as_bytes());
    let mut out = String::with_capacity(16);
    for b in digest.iter().take(8) {
        use std::fmt::Write as _;
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}

/// Collapse candidates pointing at the same resource.
///
/// Keeps first-seen order. Candidates whose URL is blank are never collapsed
/// against each other.
pub fn dedupe_candidates(candidates: Vec<Candidate>) -> Vec<Candidate> {
    let before = candidates.len();
    let mut seen: HashSet<String> = HashSet::new();
    let mut kept = Vec::with_capacity(before);

    for candidate in candidates {
        let key = candidate.url_key().trim();
        if !key.is_empty() && !seen.insert(key.to_string()) {
            continue;
        }
        kept.push(candidate);
    }

    let dropped = before - kept.len();
    counter!("digest_dedup_dropped_total").increment(dropped as u64);
    tracing::info!(target: "ingest", before, after = kept.len(), "candidates deduped");
    kept
}

/// Output of one pass over all connectors.
#[derive(Debug, Default)]
pub struct CollectedCandidates {
    pub candidates: Vec<Candidate>,
    pub counts_by_source: BTreeMap<String, usize>,
    pub failed_sources: Vec<String>,
}

/// Fetch from every connector in order. A failing connector contributes zero
/// candidates and is recorded in `failed_sources`.
pub async fn collect_candidates(sources: &[Box<dyn CandidateSource>]) -> CollectedCandidates {
    ensure_metrics_described();

    let mut out = CollectedCandidates::default();
    for source in sources {
        match source.fetch_candidates().await {
            Ok(mut batch) => {
                counter!("digest_candidates_total", "source" => source.name())
                    .increment(batch.len() as u64);
                *out.counts_by_source.entry(source.name().to_string()).or_default() +=
                    batch.len();
                out.candidates.append(&mut batch);
            }
            Err(e) => {
                tracing::warn!(target: "ingest", error = ?e, source = source.name(), "connector error");
                counter!("digest_connector_errors_total").increment(1);
                out.counts_by_source.entry(source.name().to_string()).or_default();
                out.failed_sources.push(source.name().to_string());
            }
        }
    }
    out
}
