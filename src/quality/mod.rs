//! Quality gate: independent checks over a rendered edition, folded into one
//! `QualityReport`. The edition is blocked iff the report carries any issue.

pub mod fact_check;
pub mod link_health;
pub mod pool;
pub mod readability;

use metrics::counter;
use serde_json::json;

use crate::config::QualityConfig;
use crate::model::{DigestEdition, QualityReport};
use crate::render::render_document;

pub use fact_check::FactChecker;
pub use link_health::{HttpProbe, LinkHealthChecker, LinkHealthReport, LinkProbe, ProbeOutcome};

/// Headlines at or above this normalized Levenshtein similarity count as duplicates.
const DUPLICATE_SIMILARITY: f64 = 0.9;

pub struct QualityGate {
    min_readability: Option<f64>,
    min_links_per_item: usize,
    fact_checker: FactChecker,
    link_checker: Option<LinkHealthChecker>,
    primary_locale: String,
    locales: Vec<String>,
}

impl QualityGate {
    pub fn new(cfg: &QualityConfig, link_checker: Option<LinkHealthChecker>) -> Self {
        Self {
            min_readability: cfg.min_readability,
            min_links_per_item: cfg.min_links_per_item.max(1),
            fact_checker: FactChecker::new(cfg.min_unique_domains),
            link_checker,
            primary_locale: "en".into(),
            locales: vec!["en".into()],
        }
    }

    pub fn with_locales(mut self, primary: impl Into<String>, locales: Vec<String>) -> Self {
        self.primary_locale = primary.into();
        self.locales = locales;
        self
    }

    pub async fn evaluate(&self, edition: &DigestEdition) -> QualityReport {
        let mut report = QualityReport::default();

        let primary_text = edition
            .locale_outputs
            .get(&self.primary_locale)
            .cloned()
            .unwrap_or_else(|| render_document(edition));
        report.readability = readability::flesch_reading_ease(&primary_text);
        if let Some(min) = self.min_readability {
            report
                .details
                .insert("readability_min".into(), json!(min));
            if report.readability < min {
                report.issues.push(format!(
                    "readability {:.2} below minimum {min:.2}",
                    report.readability
                ));
            }
        }

        for item in &edition.items {
            let usable = item.links.iter().filter(|l| !l.url.trim().is_empty()).count();
            if usable < self.min_links_per_item {
                report.issues.push(format!(
                    "{} has {usable} link(s), needs {}",
                    item.candidate_id, self.min_links_per_item
                ));
            }
        }

        let links = edition
            .items
            .iter()
            .flat_map(|i| i.links.iter().map(|l| l.url.as_str()));
        let health = match &self.link_checker {
            Some(checker) => checker.check_links(links).await,
            None => LinkHealthReport::default(),
        };
        report.link_health_passed = health.ok();
        if !health.ok() {
            report
                .issues
                .push(format!("broken links: {}", health.broken_links.join(", ")));
        }
        report.details.insert("link_status".into(), json!(health.status_map));
        report.details.insert("broken_links".into(), json!(health.broken_links));
        report.details.insert("links_checked".into(), json!(health.checked));

        let facts = self.fact_checker.check(&edition.items);
        report.issues.extend(facts.issues);
        report.details.insert("unique_domains".into(), json!(facts.domains));

        report.duplicate_flag = has_near_duplicate_headlines(edition);
        report.translation_ready = self.translation_ready(edition, &primary_text);

        if !report.is_publishable() {
            counter!("digest_quality_blocked_total").increment(1);
        }
        tracing::info!(
            target: "quality",
            slug = %edition.slug,
            readability = report.readability,
            link_health_passed = report.link_health_passed,
            duplicate_flag = report.duplicate_flag,
            issues = report.issues.len(),
            "quality gate evaluated"
        );
        report
    }

    fn translation_ready(&self, edition: &DigestEdition, primary_text: &str) -> bool {
        self.locales
            .iter()
            .filter(|l| **l != self.primary_locale)
            .all(|l| {
                edition
                    .locale_outputs
                    .get(l)
                    .is_some_and(|text| text != primary_text)
            })
    }
}

fn has_near_duplicate_headlines(edition: &DigestEdition) -> bool {
    let heads: Vec<String> = edition
        .items
        .iter()
        .map(|i| i.headline.trim().to_lowercase())
        .collect();
    heads.iter().enumerate().any(|(i, a)| {
        heads[i + 1..]
            .iter()
            .any(|b| strsim::normalized_levenshtein(a, b) >= DUPLICATE_SIMILARITY)
    })
}
