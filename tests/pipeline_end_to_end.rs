// tests/pipeline_end_to_end.rs
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use parking_lot::Mutex;

use digest_publisher::enhance::DisabledEnhancer;
use digest_publisher::ingest::providers::manual::ManualSource;
use digest_publisher::ingest::providers::rss::RssSource;
use digest_publisher::ingest::types::CandidateSource;
use digest_publisher::notify::NotifierMux;
use digest_publisher::publish::VersionControl;
use digest_publisher::store::{InMemoryReviewStore, InsertStatus, ManualInsert, ReviewStore};
use digest_publisher::{DigestConfig, DigestJob, JobDeps, PublishError, RunOutcome};

const CONFIG: &str = r#"
[app]
locale_defaults = ["en"]

[tracks.news]
items_max = 2
items_min = 1
require_corroboration = 1
allow_manual_inserts = true

[publishing]
paths = { news = "content/news" }
public_base_url = "https://example.com/news/"
feed_title = "Weekly Digest"
feed_description = "Curated news"

[quality]
min_unique_domains = 1

[quality.link_check]
enabled = false
"#;

const FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0"><channel><title>Example News</title>
<item>
  <title>Council adopts chip export rules</title>
  <link>https://news.example.org/chips</link>
  <pubDate>Wed, 01 Oct 2025 06:00:00 +0000</pubDate>
  <description>The council adopted new export rules for advanced chips, covering licensing, audits and reporting duties for exporters.</description>
</item>
<item>
  <title>Chip export rules adopted (update)</title>
  <link>https://news.example.org/chips#update</link>
  <pubDate>Wed, 01 Oct 2025 06:30:00 +0000</pubDate>
  <description>Updated coverage of the same decision with more quotes from member states and industry groups.</description>
</item>
</channel></rss>"#;

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 10, 1, 7, 0, 0).unwrap()
}

/// Writes go to a real temp directory; git calls are only recorded.
/// `on_pull` files are written when the base branch is pulled, standing in
/// for commits that arrived upstream.
struct RecordingVcs {
    root: PathBuf,
    calls: Mutex<Vec<String>>,
    on_pull: Vec<(&'static str, &'static str)>,
}

impl RecordingVcs {
    fn new(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
            calls: Mutex::new(vec![]),
            on_pull: vec![],
        }
    }
}

impl VersionControl for RecordingVcs {
    fn root(&self) -> &Path {
        &self.root
    }
    fn is_repository(&self) -> bool {
        true
    }
    fn is_clean(&self) -> Result<bool, PublishError> {
        Ok(true)
    }
    fn fetch(&self, _: &str, _: &str) -> Result<(), PublishError> {
        Ok(())
    }
    fn checkout(&self, branch: &str) -> Result<(), PublishError> {
        self.calls.lock().push(format!("checkout {branch}"));
        Ok(())
    }
    fn pull(&self, _: &str, branch: &str) -> Result<(), PublishError> {
        self.calls.lock().push(format!("pull {branch}"));
        for (rel, content) in &self.on_pull {
            let path = self.root.join(rel);
            std::fs::create_dir_all(path.parent().unwrap()).unwrap();
            std::fs::write(path, content).unwrap();
        }
        Ok(())
    }
    fn reset_branch(&self, branch: &str) -> Result<(), PublishError> {
        self.calls.lock().push(format!("branch {branch}"));
        Ok(())
    }
    fn stage(&self, paths: &[String]) -> Result<(), PublishError> {
        self.calls.lock().push(format!("add {}", paths.join(" ")));
        Ok(())
    }
    fn has_staged_changes(&self) -> Result<bool, PublishError> {
        Ok(true)
    }
    fn commit(&self, message: &str) -> Result<String, PublishError> {
        self.calls.lock().push(format!("commit {message}"));
        Ok("deadbeef".into())
    }
    fn push(&self, _: &str, _: &str) -> Result<(), PublishError> {
        Ok(())
    }
}

fn manual_insert() -> ManualInsert {
    ManualInsert {
        id: "7".into(),
        track: "news".into(),
        title: "EU publishes AI Act guidance".into(),
        summary: "The Commission published guidance explaining how providers document training data and run audits.".into(),
        source_links: vec![
            "https://commission.example.eu/ai-act".into(),
            "https://press.example.com/ai-act".into(),
        ],
        priority: 5,
        status: InsertStatus::Pending,
        submitted_by: "editor".into(),
        created_at: Utc.with_ymd_and_hms(2025, 10, 1, 6, 0, 0).unwrap(),
        decided_at: None,
    }
}

fn job(
    config: &str,
    store: Arc<InMemoryReviewStore>,
    root: &Path,
) -> DigestJob<RecordingVcs> {
    job_with_vcs(config, store, RecordingVcs::new(root))
}

fn job_with_vcs(
    config: &str,
    store: Arc<InMemoryReviewStore>,
    vcs: RecordingVcs,
) -> DigestJob<RecordingVcs> {
    let store: Arc<dyn ReviewStore> = store;
    let sources: Vec<Box<dyn CandidateSource>> = vec![
        Box::new(ManualSource::new(Arc::clone(&store), "news")),
        Box::new(RssSource::from_fixtures([FEED])),
    ];
    let deps = JobDeps {
        sources,
        store,
        enhancer: Arc::new(DisabledEnhancer),
        link_probe: None,
        notifier: NotifierMux::default(),
    };
    let cfg = DigestConfig::from_toml_str(config).unwrap();
    DigestJob::new(cfg, "news", deps, vcs).at(now())
}

#[tokio::test]
async fn manual_seed_leads_and_duplicates_collapse() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(InMemoryReviewStore::with_inserts(vec![manual_insert()]));

    let report = job(CONFIG, Arc::clone(&store), dir.path()).run().await.unwrap();

    assert_eq!(report.summary.total_candidates, 3);
    assert_eq!(report.summary.deduped_candidates, 2);
    let items = &report.edition.items;
    assert_eq!(items.len(), 2);
    assert_eq!(items[0].candidate_id, "manual:7");
    assert_eq!(items[0].order, 1);
    assert_eq!(items[1].order, 2);
    assert_eq!(items[1].links[0].url, "https://news.example.org/chips");

    match &report.outcome {
        RunOutcome::Published(p) => {
            assert_eq!(p.commit.as_deref(), Some("deadbeef"));
            assert_eq!(p.branch, "content/news/weekly-20251001");
        }
        other => panic!("unexpected outcome: {other:?}"),
    }

    let payload = report.payload.as_ref().unwrap();
    let paths: Vec<_> = payload.files.iter().map(|f| f.path.as_str()).collect();
    assert_eq!(
        paths,
        vec![
            "content/news/weekly-20251001/index.en.md",
            "content/news/manifest.json",
            "content/news/rss.xml"
        ]
    );
    assert_eq!(payload.commit_message, "chore(news): publish digest 2025-10-01");
    assert_eq!(payload.metadata["slug"], "weekly-20251001");

    let md = std::fs::read_to_string(dir.path().join("content/news/weekly-20251001/index.en.md")).unwrap();
    assert!(md.contains("manual_item_ids:\n  - \"manual:7\"\n"));
    let rss = std::fs::read_to_string(dir.path().join("content/news/rss.xml")).unwrap();
    assert!(rss.contains("<link>https://example.com/news/weekly-20251001</link>"));

    let (inserts, audit) = store.snapshot();
    assert_eq!(inserts[0].status, InsertStatus::Accepted);
    assert_eq!(audit.len(), 1);
    assert_eq!(audit[0].entity_id, "7");
}

#[tokio::test]
async fn rerunning_the_same_edition_is_byte_identical() {
    let dir = tempfile::tempdir().unwrap();

    let first = job(CONFIG, Arc::new(InMemoryReviewStore::default()), dir.path())
        .run()
        .await
        .unwrap();
    assert!(matches!(first.outcome, RunOutcome::Published(_)));
    let manifest_1 = std::fs::read_to_string(dir.path().join("content/news/manifest.json")).unwrap();
    let rss_1 = std::fs::read_to_string(dir.path().join("content/news/rss.xml")).unwrap();

    job(CONFIG, Arc::new(InMemoryReviewStore::default()), dir.path())
        .run()
        .await
        .unwrap();
    let manifest_2 = std::fs::read_to_string(dir.path().join("content/news/manifest.json")).unwrap();
    let rss_2 = std::fs::read_to_string(dir.path().join("content/news/rss.xml")).unwrap();

    assert_eq!(manifest_1, manifest_2);
    assert_eq!(rss_1, rss_2);
    assert_eq!(rss_2.matches("<item>").count(), 1);
    assert_eq!(manifest_2.matches("weekly-20251001").count(), 1);
}

#[tokio::test]
async fn feed_state_is_read_after_the_base_pull() {
    let dir = tempfile::tempdir().unwrap();
    let mut vcs = RecordingVcs::new(dir.path());
    vcs.on_pull = vec![
        ("content/news/manifest.json", r#"{"slugs": ["weekly-20250924"]}"#),
        (
            "content/news/rss.xml",
            "<rss version=\"2.0\"><channel><item><guid>weekly-20250924</guid></item></channel></rss>",
        ),
    ];

    let j = job_with_vcs(CONFIG, Arc::new(InMemoryReviewStore::default()), vcs);
    let report = j.run().await.unwrap();
    assert!(matches!(report.outcome, RunOutcome::Published(_)));

    let calls = j.vcs().calls.lock().clone();
    assert_eq!(calls.iter().filter(|c| c.starts_with("pull")).count(), 1);
    assert_eq!(calls[0], "checkout main");

    let manifest = std::fs::read_to_string(dir.path().join("content/news/manifest.json")).unwrap();
    let first = manifest.find("weekly-20251001").unwrap();
    let pulled = manifest.find("weekly-20250924").unwrap();
    assert!(first < pulled);
    let rss = std::fs::read_to_string(dir.path().join("content/news/rss.xml")).unwrap();
    assert_eq!(rss.matches("<item>").count(), 2);
}

#[tokio::test]
async fn blocked_edition_touches_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let strict = CONFIG.replace("min_unique_domains = 1", "min_unique_domains = 3");
    let store = Arc::new(InMemoryReviewStore::with_inserts(vec![manual_insert()]));

    let j = job(&strict, Arc::clone(&store), dir.path());
    let report = j.run().await.unwrap();

    let RunOutcome::Blocked { issues } = &report.outcome else {
        panic!("expected a blocked run, got {:?}", report.outcome);
    };
    assert_eq!(issues.len(), 2);
    assert!(issues.iter().any(|i| i.starts_with("manual:7 cites 2 unique domain(s)")));
    assert!(report.payload.is_none());
    assert!(j.vcs().calls.lock().is_empty());
    assert!(!dir.path().join("content").exists());
    assert_eq!(store.snapshot().0[0].status, InsertStatus::Pending);
    assert_eq!(report.summary.outcome, "blocked");
}

#[tokio::test]
async fn missing_track_is_a_config_error() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = DigestConfig::from_toml_str(CONFIG).unwrap();
    let deps = JobDeps {
        sources: vec![],
        store: Arc::new(InMemoryReviewStore::default()),
        enhancer: Arc::new(DisabledEnhancer),
        link_probe: None,
        notifier: NotifierMux::default(),
    };
    let err = DigestJob::new(cfg, "sports", deps, RecordingVcs::new(dir.path()))
        .run()
        .await
        .unwrap_err();
    assert!(err.to_string().contains("sports"));
}
