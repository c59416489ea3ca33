//! Cross-source fact check over an edition's items.

use std::collections::{BTreeSet, HashSet};

use crate::model::DigestItem;

const MIN_WHAT_HAPPENED_WORDS: usize = 12;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FactCheckResult {
    pub issues: Vec<String>,
    /// Every host cited anywhere in the edition, sorted.
    pub domains: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct FactChecker {
    min_unique_domains: usize,
}

impl Default for FactChecker {
    fn default() -> Self {
        Self::new(2)
    }
}

/// Lowercased `host[:port]` of an absolute URL, `None` for anything
/// unparsable. A port equal to the scheme default is dropped by the parser,
/// so `https://a.example:443/` and `https://a.example/` share a domain.
pub fn host_of(link: &str) -> Option<String> {
    let url = url::Url::parse(link.trim()).ok()?;
    let host = url.host_str()?.to_ascii_lowercase();
    Some(match url.port() {
        Some(port) => format!("{host}:{port}"),
        None => host,
    })
}

impl FactChecker {
    pub fn new(min_unique_domains: usize) -> Self {
        Self { min_unique_domains }
    }

    pub fn check(&self, items: &[DigestItem]) -> FactCheckResult {
        let mut issues = Vec::new();
        let mut all_domains = BTreeSet::new();

        for item in items {
            let hosts: HashSet<String> = item.links.iter().filter_map(|l| host_of(&l.url)).collect();
            if hosts.len() < self.min_unique_domains {
                issues.push(format!(
                    "{} cites {} unique domain(s), needs {}",
                    item.candidate_id,
                    hosts.len(),
                    self.min_unique_domains
                ));
            }
            let words = item.what_happened.split_whitespace().count();
            if words < MIN_WHAT_HAPPENED_WORDS {
                issues.push(format!(
                    "{} 'what happened' is too short ({words} words, needs {MIN_WHAT_HAPPENED_WORDS})",
                    item.candidate_id
                ));
            }
            if item.why_it_matters.trim().is_empty() {
                issues.push(format!("{} is missing 'why it matters'", item.candidate_id));
            }
            all_domains.extend(hosts);
        }

        FactCheckResult {
            issues,
            domains: all_domains.into_iter().collect(),
        }
    }
}
