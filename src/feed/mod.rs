//! Manifest and RSS feed state for the publish directory.
//!
//! Both files are read from the repository working tree, merged with the new
//! edition and handed back as commit files. Rerunning the same edition yields
//! byte-identical content.

pub mod manifest;
pub mod rss;

use std::path::Path;

use crate::config::PublishingConfig;
use crate::error::FeedError;
use crate::model::{CommitFile, DigestEdition};
use crate::render::strip_front_matter;

pub use manifest::ManifestState;
pub use rss::{ChannelMeta, FeedDocument, FeedEntry};

pub const MANIFEST_FILE: &str = "manifest.json";
pub const FEED_FILE: &str = "rss.xml";
const PLACEHOLDER_DESCRIPTION: &str = "New digest edition available.";

#[derive(Debug, Clone)]
pub struct FeedStateMerger {
    publish_dir: String,
    base_url: String,
    max_items: usize,
    channel: ChannelMeta,
}

/// Merged state plus the files to commit.
#[derive(Debug, Clone)]
pub struct FeedUpdate {
    pub manifest: ManifestState,
    pub feed: FeedDocument,
    pub files: Vec<CommitFile>,
}

impl FeedStateMerger {
    pub fn from_config(cfg: &PublishingConfig) -> Self {
        let base_url = cfg.public_base_url.trim_end_matches('/').to_string();
        Self {
            publish_dir: cfg.paths.news.trim_end_matches('/').to_string(),
            max_items: cfg.feed_max_items.max(1),
            channel: ChannelMeta {
                title: cfg.feed_title.clone(),
                link: base_url.clone(),
                description: cfg.feed_description.clone(),
                language: cfg.feed_language.clone(),
            },
            base_url,
        }
    }

    pub fn manifest_path(&self) -> String {
        format!("{}/{MANIFEST_FILE}", self.publish_dir)
    }

    pub fn feed_path(&self) -> String {
        format!("{}/{FEED_FILE}", self.publish_dir)
    }

    /// Merge `edition` into the state found under `repo_root`.
    /// `primary_output` is the rendered body used when items lack text.
    pub fn merge(
        &self,
        edition: &DigestEdition,
        primary_output: &str,
        repo_root: &Path,
    ) -> Result<FeedUpdate, FeedError> {
        let manifest = ManifestState::load(&repo_root.join(self.manifest_path())).merge(&edition.slug);

        let pub_date = rss::rfc822(edition.generated_at)?;
        let entry = FeedEntry {
            guid: edition.slug.clone(),
            title: edition.title.clone(),
            link: format!("{}/{}", self.base_url, edition.slug),
            pub_date: pub_date.clone(),
            description: entry_description(edition, primary_output),
        };
        let feed = FeedDocument::load(&repo_root.join(self.feed_path())).merge(
            self.channel.clone(),
            entry,
            pub_date,
            self.max_items,
        );

        let files = vec![
            CommitFile::new(self.manifest_path(), manifest.to_json()?),
            CommitFile::new(self.feed_path(), feed.to_xml()?),
        ];
        tracing::info!(
            target: "feed",
            slug = %edition.slug,
            manifest_len = manifest.slugs.len(),
            feed_entries = feed.entries.len(),
            "feed state merged"
        );
        Ok(FeedUpdate {
            manifest,
            feed,
            files,
        })
    }
}

fn entry_description(edition: &DigestEdition, primary_output: &str) -> String {
    let lines: Vec<String> = edition
        .items
        .iter()
        .filter(|i| !i.headline.trim().is_empty() && !i.why_it_matters.trim().is_empty())
        .map(|i| format!("{}: {}", i.headline.trim(), i.why_it_matters.trim()))
        .collect();
    if !lines.is_empty() {
        return lines.join("\n");
    }
    let body = strip_front_matter(primary_output).trim();
    if !body.is_empty() {
        return body.to_string();
    }
    PLACEHOLDER_DESCRIPTION.to_string()
}
