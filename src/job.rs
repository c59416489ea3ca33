// src/job.rs
//! One digest run: collect → dedup → score → plan → enhance → render →
//! quality gate → feed merge → publish, followed by a run summary and
//! notifications.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use chrono::{DateTime, Utc};
use metrics::gauge;
use serde::Serialize;
use serde_json::json;

use crate::analyze::scoring::DEFAULT_HALF_LIFE_HOURS;
use crate::analyze::{CandidateScorer, DigestPlanner};
use crate::config::{DigestConfig, TrackConfig};
use crate::enhance::{build_enhancer, enhance_items, DynEnhancer};
use crate::feed::FeedStateMerger;
use crate::ingest::providers::highlights::HighlightsSource;
use crate::ingest::providers::manual::{record_id, ManualSource};
use crate::ingest::providers::rss::RssSource;
use crate::ingest::types::CandidateSource;
use crate::ingest::{collect_candidates, dedupe_candidates};
use crate::model::{CommitFile, DigestEdition, GitCommitPayload, QualityReport};
use crate::notify::{EventKind, NotificationEvent, NotifierMux};
use crate::publish::{
    branch_name, commit_message, CommitIdentity, GitCli, PublicationTransaction, PublishOutcome,
    PublishSettings, VersionControl,
};
use crate::quality::{HttpProbe, LinkHealthChecker, LinkProbe, QualityGate};
use crate::render::DigestWriter;
use crate::store::{AuditEvent, InsertStatus, JsonFileReviewStore, ReviewStore};
use crate::telemetry::ensure_metrics_described;

const DEFAULT_CONNECTOR_TIMEOUT_SECS: u64 = 15;

/// Collaborators of a run. Built from configuration by [`DigestJob::from_config`],
/// or assembled by hand in tests.
pub struct JobDeps {
    pub sources: Vec<Box<dyn CandidateSource>>,
    pub store: Arc<dyn ReviewStore>,
    pub enhancer: DynEnhancer,
    /// `None` disables link probing (link health then passes trivially).
    pub link_probe: Option<Arc<dyn LinkProbe>>,
    pub notifier: NotifierMux,
}

#[derive(Debug)]
pub enum RunOutcome {
    /// Publication ran; `commit` is `None` when nothing changed.
    Published(PublishOutcome),
    Blocked { issues: Vec<String> },
    PublishFailed { error: String },
}

impl RunOutcome {
    fn label(&self) -> &'static str {
        match self {
            RunOutcome::Published(p) if p.commit.is_some() => "published",
            RunOutcome::Published(_) => "unchanged",
            RunOutcome::Blocked { .. } => "blocked",
            RunOutcome::PublishFailed { .. } => "publish_failed",
        }
    }
}

/// Structured end-of-run record, logged once per run.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub track: String,
    pub slug: String,
    pub outcome: &'static str,
    pub counts_by_source: BTreeMap<String, usize>,
    pub failed_sources: Vec<String>,
    pub total_candidates: usize,
    pub deduped_candidates: usize,
    pub selected: usize,
    pub readability: f64,
    pub broken_links: usize,
    pub issues: Vec<String>,
    pub branch: Option<String>,
    pub commit: Option<String>,
    pub pushed: bool,
}

#[derive(Debug)]
pub struct RunReport {
    pub outcome: RunOutcome,
    pub edition: DigestEdition,
    pub quality: QualityReport,
    pub payload: Option<GitCommitPayload>,
    pub summary: RunSummary,
}

pub struct DigestJob<V: VersionControl> {
    config: DigestConfig,
    track: String,
    deps: JobDeps,
    publisher: PublicationTransaction<V>,
    now: Option<DateTime<Utc>>,
}

fn connector_timeout(track: &TrackConfig) -> Duration {
    Duration::from_secs(
        track
            .connector_timeout_secs
            .unwrap_or(DEFAULT_CONNECTOR_TIMEOUT_SECS),
    )
}

impl DigestJob<GitCli> {
    /// Wire every collaborator from configuration. Fails only on invalid
    /// configuration or an HTTP client that cannot be built.
    pub fn from_config(config: DigestConfig, track: &str) -> Result<Self> {
        config.validate(track)?;
        let track_cfg = config.track(track)?.clone();
        let timeout = connector_timeout(&track_cfg);

        let store: Arc<dyn ReviewStore> =
            Arc::new(JsonFileReviewStore::new(config.storage.review_store_path.clone()));

        let mut sources: Vec<Box<dyn CandidateSource>> = Vec::new();
        if track_cfg.allow_manual_inserts {
            sources.push(Box::new(ManualSource::new(Arc::clone(&store), track)));
        }
        if !track_cfg.rss_allowlist.is_empty() {
            sources.push(Box::new(RssSource::from_urls(
                track_cfg.rss_allowlist.clone(),
                timeout,
            )?));
        }
        if let Some(url) = track_cfg.highlights_url.as_deref() {
            sources.push(Box::new(HighlightsSource::new(url, timeout)?));
        }

        let link_probe: Option<Arc<dyn LinkProbe>> = if config.quality.link_check.enabled {
            Some(Arc::new(HttpProbe::new(&config.quality.link_check)?))
        } else {
            None
        };

        let git = &config.app.git;
        let identity = match (&git.author_name, &git.author_email) {
            (Some(name), Some(email)) => Some(CommitIdentity {
                name: name.clone(),
                email: email.clone(),
            }),
            _ => None,
        };
        let vcs = GitCli::new(config.publishing.repo_path.clone()).with_identity(identity);

        let deps = JobDeps {
            sources,
            store,
            enhancer: build_enhancer(config.llm.as_ref()),
            link_probe,
            notifier: NotifierMux::from_config(&config.notifications),
        };
        Ok(Self::new(config, track, deps, vcs))
    }
}

impl<V: VersionControl> DigestJob<V> {
    pub fn new(config: DigestConfig, track: &str, deps: JobDeps, vcs: V) -> Self {
        let settings = PublishSettings::from_config(&config);
        Self {
            config,
            track: track.to_string(),
            deps,
            publisher: PublicationTransaction::new(vcs, settings),
            now: None,
        }
    }

    /// Pin the run clock.
    pub fn at(mut self, now: DateTime<Utc>) -> Self {
        self.now = Some(now);
        self
    }

    pub fn vcs(&self) -> &V {
        self.publisher.vcs()
    }

    /// Execute one run. Only configuration problems are returned as errors;
    /// a blocked edition or a failed publication is reported in the outcome.
    pub async fn run(&self) -> Result<RunReport> {
        ensure_metrics_described();
        self.config.validate(&self.track)?;
        let cfg = &self.config;
        let track_cfg = cfg.track(&self.track)?;
        let now = self.now.unwrap_or_else(Utc::now);

        let collected = collect_candidates(&self.deps.sources).await;
        let total_candidates = collected.candidates.len();
        let deduped = dedupe_candidates(collected.candidates);
        let deduped_count = deduped.len();

        let scorer = CandidateScorer::new(
            track_cfg
                .recency_half_life_hours
                .unwrap_or(DEFAULT_HALF_LIFE_HOURS),
        );
        let ranked = scorer.score(deduped, now);

        let planner = DigestPlanner::new(track_cfg.items_max(), track_cfg.require_corroboration);
        let items = planner.plan(&ranked);
        let considered = ranked.len().min(track_cfg.items_max());
        if items.len() < track_cfg.items_min() {
            tracing::warn!(
                target: "job",
                selected = items.len(),
                items_min = track_cfg.items_min(),
                "edition under-filled"
            );
        }
        gauge!("digest_selected_items").set(items.len() as f64);

        let items = enhance_items(self.deps.enhancer.as_ref(), items).await;

        let slug = format!("{}-{}", track_cfg.slug_prefix(), now.format("%Y%m%d"));
        let manual_selected = items.iter().filter(|i| i.is_manual()).count();
        let mut metadata = BTreeMap::new();
        metadata.insert("track_slug".to_string(), json!(self.track));
        metadata.insert("total_candidates".to_string(), json!(total_candidates));
        metadata.insert("deduped_candidates".to_string(), json!(deduped_count));
        metadata.insert("selected_count".to_string(), json!(items.len()));
        metadata.insert("manual_selected".to_string(), json!(manual_selected));
        metadata.insert("skipped_count".to_string(), json!(considered - items.len()));
        metadata.insert("counts_by_source".to_string(), json!(collected.counts_by_source));

        let edition = DigestEdition {
            title: track_cfg.edition_title().to_string(),
            slug: slug.clone(),
            track: self.track.clone(),
            generated_at: now,
            locale_outputs: BTreeMap::new(),
            items,
            metadata,
        };

        let writer = DigestWriter::new(
            cfg.app.primary_locale.clone(),
            cfg.app.locale_defaults.clone(),
        );
        let outputs = writer.render(&edition);
        let edition = edition.with_locale_outputs(outputs);

        let link_checker = self.deps.link_probe.as_ref().map(|p| {
            LinkHealthChecker::new(Arc::clone(p), cfg.quality.link_check.max_concurrency)
        });
        let gate = QualityGate::new(&cfg.quality, link_checker).with_locales(
            cfg.app.primary_locale.clone(),
            cfg.app.locale_defaults.clone(),
        );
        let quality = gate.evaluate(&edition).await;

        let mut summary = RunSummary {
            track: self.track.clone(),
            slug: slug.clone(),
            outcome: "",
            counts_by_source: collected.counts_by_source,
            failed_sources: collected.failed_sources,
            total_candidates,
            deduped_candidates: deduped_count,
            selected: edition.items.len(),
            readability: quality.readability,
            broken_links: quality
                .details
                .get("broken_links")
                .and_then(|v| v.as_array())
                .map_or(0, Vec::len),
            issues: quality.issues.clone(),
            branch: None,
            commit: None,
            pushed: false,
        };

        if !quality.is_publishable() {
            let outcome = RunOutcome::Blocked {
                issues: quality.issues.clone(),
            };
            return Ok(self
                .finish(outcome, edition, quality, None, summary)
                .await);
        }

        self.accept_manual_inserts(&edition);

        let primary_output = edition
            .locale_outputs
            .get(writer.primary_locale())
            .cloned()
            .unwrap_or_default();
        // Feed state is read from the tree, so the base branch is synced first.
        if let Err(e) = self.publisher.sync_base() {
            let outcome = RunOutcome::PublishFailed {
                error: e.to_string(),
            };
            return Ok(self
                .finish(outcome, edition, quality, None, summary)
                .await);
        }
        let merger = FeedStateMerger::from_config(&cfg.publishing);
        let feed = match merger.merge(&edition, &primary_output, self.vcs().root()) {
            Ok(feed) => feed,
            Err(e) => {
                let outcome = RunOutcome::PublishFailed {
                    error: e.to_string(),
                };
                return Ok(self
                    .finish(outcome, edition, quality, None, summary)
                    .await);
            }
        };

        let mut files: Vec<CommitFile> = writer
            .artifacts(&edition, &cfg.publishing.paths.news)
            .into_iter()
            .map(|a| CommitFile::new(a.path, a.content))
            .collect();
        files.extend(feed.files);

        let mut payload_meta = BTreeMap::new();
        payload_meta.insert("reviewers".to_string(), json!(cfg.publishing.reviewers));
        payload_meta.insert("track".to_string(), json!(self.track));
        payload_meta.insert("slug".to_string(), json!(slug));
        let payload = GitCommitPayload {
            branch_name: branch_name(&cfg.publishing.branch_prefix, &slug),
            commit_message: commit_message(&cfg.publishing.commit_message, now, &slug),
            files,
            metadata: payload_meta,
        };

        let outcome = match self.publisher.publish_synced(&payload) {
            Ok(published) => {
                summary.branch = Some(published.branch.clone());
                summary.commit = published.commit.clone();
                summary.pushed = published.pushed;
                RunOutcome::Published(published)
            }
            Err(e) => {
                summary.branch = Some(payload.branch_name.clone());
                RunOutcome::PublishFailed {
                    error: e.to_string(),
                }
            }
        };
        Ok(self
            .finish(outcome, edition, quality, Some(payload), summary)
            .await)
    }

    /// Record manual picks as accepted. Store failures are logged, not fatal.
    fn accept_manual_inserts(&self, edition: &DigestEdition) {
        let candidate_ids = edition.manual_item_ids();
        let ids: Vec<String> = candidate_ids
            .iter()
            .filter_map(|id| record_id(id))
            .map(str::to_string)
            .collect();
        if ids.is_empty() {
            return;
        }
        match self.deps.store.mark_selected(&ids, InsertStatus::Accepted) {
            Ok(changed) => {
                tracing::info!(target: "job", changed, slug = %edition.slug, "manual inserts accepted")
            }
            Err(e) => {
                tracing::warn!(target: "job", error = ?e, "marking manual inserts failed");
                return;
            }
        }
        for id in &ids {
            let event = AuditEvent::new(
                "manual_insert",
                id,
                "accepted",
                json!({ "slug": edition.slug, "track": edition.track }),
            );
            if let Err(e) = self.deps.store.append_audit(event) {
                tracing::warn!(target: "job", error = ?e, id = %id, "audit append failed");
            }
        }
    }

    async fn finish(
        &self,
        outcome: RunOutcome,
        edition: DigestEdition,
        quality: QualityReport,
        payload: Option<GitCommitPayload>,
        mut summary: RunSummary,
    ) -> RunReport {
        summary.outcome = outcome.label();
        match serde_json::to_string(&summary) {
            Ok(line) => tracing::info!(target: "job", summary = %line, "digest run finished"),
            Err(e) => tracing::warn!(target: "job", error = %e, "run summary not serializable"),
        }

        let (kind, details) = match &outcome {
            RunOutcome::Published(p) if p.commit.is_some() => (EventKind::Published, vec![]),
            RunOutcome::Published(_) => (EventKind::Unchanged, vec![]),
            RunOutcome::Blocked { issues } => (EventKind::Blocked, issues.clone()),
            RunOutcome::PublishFailed { error } => (EventKind::PublishFailed, vec![error.clone()]),
        };
        if !self.deps.notifier.is_empty() {
            let event = NotificationEvent {
                kind,
                track: self.track.clone(),
                slug: edition.slug.clone(),
                headline: format!(
                    "{} item(s), readability {:.2}",
                    edition.items.len(),
                    quality.readability
                ),
                details,
                ts: Utc::now(),
            };
            self.deps.notifier.dispatch(&event).await;
        }

        RunReport {
            outcome,
            edition,
            quality,
            payload,
            summary,
        }
    }
}
