// tests/feed_state.rs
use std::collections::BTreeMap;
use std::fs;

use chrono::{TimeZone, Utc};
use digest_publisher::config::DigestConfig;
use digest_publisher::feed::{FeedDocument, FeedStateMerger, ManifestState};
use digest_publisher::{DigestEdition, DigestItem, SourceLink};

const CONFIG: &str = r#"
[tracks.news]

[publishing]
paths = { news = "content/news" }
public_base_url = "https://example.com/news"
feed_max_items = 10
feed_title = "Weekly Digest"
"#;

fn merger() -> FeedStateMerger {
    let cfg = DigestConfig::from_toml_str(CONFIG).unwrap();
    FeedStateMerger::from_config(&cfg.publishing)
}

fn edition(slug: &str, day: u32) -> DigestEdition {
    DigestEdition {
        title: "Weekly Digest".into(),
        slug: slug.into(),
        track: "news".into(),
        generated_at: Utc.with_ymd_and_hms(2025, 10, day, 7, 0, 0).unwrap(),
        locale_outputs: BTreeMap::new(),
        items: vec![DigestItem {
            order: 1,
            candidate_id: "rss:1".into(),
            headline: "EU guidance".into(),
            what_happened: "Published.".into(),
            why_it_matters: "Offers clear compliance direction".into(),
            links: vec![SourceLink::new("EU", "https://eu.example/a")],
        }],
        metadata: BTreeMap::new(),
    }
}

fn write_files(root: &std::path::Path, files: &[digest_publisher::CommitFile]) {
    for f in files {
        let p = root.join(&f.path);
        fs::create_dir_all(p.parent().unwrap()).unwrap();
        fs::write(p, &f.content).unwrap();
    }
}

#[test]
fn merging_the_same_slug_twice_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let m = merger();
    let e = edition("weekly-20251001", 1);

    let first = m.merge(&e, "", dir.path()).unwrap();
    write_files(dir.path(), &first.files);
    let second = m.merge(&e, "", dir.path()).unwrap();

    assert_eq!(first.files, second.files);
    assert_eq!(second.manifest.slugs, vec!["weekly-20251001"]);
    assert_eq!(second.feed.entries.len(), 1);

    let entry = &second.feed.entries[0];
    assert_eq!(entry.guid, "weekly-20251001");
    assert_eq!(entry.link, "https://example.com/news/weekly-20251001");
    assert_eq!(entry.pub_date, "Wed, 01 Oct 2025 07:00:00 +0000");
    assert!(entry.description.contains("Offers clear compliance direction"));
}

#[test]
fn existing_history_is_kept_newest_first_and_bounded() {
    let dir = tempfile::tempdir().unwrap();
    let feed_dir = dir.path().join("content/news");
    fs::create_dir_all(&feed_dir).unwrap();

    let mut xml = String::from("<?xml version=\"1.0\"?><rss version=\"2.0\"><channel><title>Old</title>");
    for i in 0..30 {
        xml.push_str(&format!("<item><guid>weekly-{i:02}</guid></item>"));
    }
    xml.push_str("</channel></rss>");
    fs::write(feed_dir.join("rss.xml"), xml).unwrap();
    fs::write(
        feed_dir.join("manifest.json"),
        r#"{"slugs": ["weekly-00", "weekly-01", "weekly-00"]}"#,
    )
    .unwrap();

    let update = merger().merge(&edition("weekly-20251002", 2), "", dir.path()).unwrap();

    assert_eq!(update.feed.entries.len(), 10);
    assert_eq!(update.feed.entries[0].guid, "weekly-20251002");
    assert_eq!(update.feed.entries[1].guid, "weekly-00");
    assert_eq!(update.feed.channel.title, "Weekly Digest");
    assert_eq!(update.feed.last_build_date, "Thu, 02 Oct 2025 07:00:00 +0000");
    assert_eq!(
        update.manifest.slugs,
        vec!["weekly-20251002", "weekly-00", "weekly-01"]
    );

    let reparsed = FeedDocument::parse(&update.files[1].content);
    assert_eq!(reparsed, update.feed);
    assert_eq!(ManifestState::from_json_str(&update.files[0].content), update.manifest);
}

#[test]
fn corrupt_state_files_start_fresh() {
    let dir = tempfile::tempdir().unwrap();
    let feed_dir = dir.path().join("content/news");
    fs::create_dir_all(&feed_dir).unwrap();
    fs::write(feed_dir.join("rss.xml"), "<rss><channel><item>").unwrap();
    fs::write(feed_dir.join("manifest.json"), "not json").unwrap();

    let update = merger().merge(&edition("weekly-20251001", 1), "", dir.path()).unwrap();
    assert_eq!(update.feed.entries.len(), 1);
    assert_eq!(update.manifest.slugs, vec!["weekly-20251001"]);
    assert!(update.files[1].content.ends_with("</rss>\n"));
}
