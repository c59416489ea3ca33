// src/config/mod.rs
//! TOML configuration for the digest job.

pub mod llm;

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::llm::LlmConfig;
use crate::error::ConfigError;

pub const ENV_CONFIG_PATH: &str = "DIGEST_CONFIG_PATH";
pub const DEFAULT_CONFIG_PATH: &str = "config/digest.toml";
pub const NEWS_TRACK: &str = "news";

#[derive(Debug, Clone, Deserialize)]
pub struct DigestConfig {
    #[serde(default)]
    pub app: AppConfig,
    #[serde(default)]
    pub tracks: BTreeMap<String, TrackConfig>,
    pub publishing: PublishingConfig,
    #[serde(default)]
    pub quality: QualityConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub llm: Option<LlmConfig>,
    #[serde(default)]
    pub notifications: NotificationsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_locales")]
    pub locale_defaults: Vec<String>,
    #[serde(default = "default_primary_locale")]
    pub primary_locale: String,
    #[serde(default)]
    pub git: GitConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            locale_defaults: default_locales(),
            primary_locale: default_primary_locale(),
            git: GitConfig::default(),
        }
    }
}

fn default_locales() -> Vec<String> {
    vec!["en".into(), "es".into(), "fr".into()]
}
fn default_primary_locale() -> String {
    "en".into()
}

#[derive(Debug, Clone, Deserialize)]
pub struct GitConfig {
    #[serde(default = "default_main_branch")]
    pub main_branch: String,
    #[serde(default)]
    pub author_name: Option<String>,
    #[serde(default)]
    pub author_email: Option<String>,
}

impl Default for GitConfig {
    fn default() -> Self {
        Self {
            main_branch: default_main_branch(),
            author_name: None,
            author_email: None,
        }
    }
}

fn default_main_branch() -> String {
    "main".into()
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TrackConfig {
    #[serde(default)]
    pub items_min: Option<usize>,
    #[serde(default)]
    pub items_max: Option<usize>,
    #[serde(default)]
    pub require_corroboration: Option<usize>,
    #[serde(default)]
    pub rss_allowlist: Vec<String>,
    #[serde(default)]
    pub highlights_url: Option<String>,
    #[serde(default)]
    pub allow_manual_inserts: bool,
    #[serde(default)]
    pub edition_title: Option<String>,
    #[serde(default)]
    pub slug_prefix: Option<String>,
    #[serde(default)]
    pub recency_half_life_hours: Option<f64>,
    #[serde(default)]
    pub connector_timeout_secs: Option<u64>,
}

impl TrackConfig {
    pub fn items_max(&self) -> usize {
        self.items_max.unwrap_or(8)
    }
    pub fn items_min(&self) -> usize {
        self.items_min.unwrap_or(4)
    }
    pub fn edition_title(&self) -> &str {
        self.edition_title.as_deref().unwrap_or("Weekly Digest")
    }
    pub fn slug_prefix(&self) -> &str {
        self.slug_prefix.as_deref().unwrap_or("weekly")
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PublishingPaths {
    pub news: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PublishingConfig {
    pub paths: PublishingPaths,
    pub public_base_url: String,
    #[serde(default = "default_feed_max_items")]
    pub feed_max_items: usize,
    #[serde(default = "default_feed_title")]
    pub feed_title: String,
    #[serde(default)]
    pub feed_description: String,
    #[serde(default = "default_primary_locale")]
    pub feed_language: String,
    #[serde(default = "default_branch_prefix")]
    pub branch_prefix: String,
    #[serde(default = "default_commit_message")]
    pub commit_message: String,
    #[serde(default = "default_repo_path")]
    pub repo_path: PathBuf,
    #[serde(default = "default_remote")]
    pub remote: String,
    #[serde(default)]
    pub push: bool,
    #[serde(default)]
    pub allow_dirty: bool,
    #[serde(default)]
    pub reviewers: Vec<String>,
}

fn default_feed_max_items() -> usize {
    20
}
fn default_feed_title() -> String {
    "Weekly Digest".into()
}
fn default_branch_prefix() -> String {
    "content/news".into()
}
fn default_commit_message() -> String {
    "chore(news): publish digest {date}".into()
}
fn default_repo_path() -> PathBuf {
    PathBuf::from(".")
}
fn default_remote() -> String {
    "origin".into()
}

#[derive(Debug, Clone, Deserialize)]
pub struct QualityConfig {
    #[serde(default)]
    pub min_readability: Option<f64>,
    #[serde(default = "default_min_links_per_item")]
    pub min_links_per_item: usize,
    #[serde(default = "default_min_unique_domains")]
    pub min_unique_domains: usize,
    #[serde(default)]
    pub link_check: LinkCheckConfig,
}

impl Default for QualityConfig {
    fn default() -> Self {
        Self {
            min_readability: None,
            min_links_per_item: default_min_links_per_item(),
            min_unique_domains: default_min_unique_domains(),
            link_check: LinkCheckConfig::default(),
        }
    }
}

fn default_min_links_per_item() -> usize {
    1
}
fn default_min_unique_domains() -> usize {
    2
}

#[derive(Debug, Clone, Deserialize)]
pub struct LinkCheckConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_link_timeout")]
    pub timeout_secs: f64,
    #[serde(default = "default_link_concurrency")]
    pub max_concurrency: usize,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for LinkCheckConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            timeout_secs: default_link_timeout(),
            max_concurrency: default_link_concurrency(),
            user_agent: default_user_agent(),
        }
    }
}

fn default_true() -> bool {
    true
}
fn default_link_timeout() -> f64 {
    6.0
}
fn default_link_concurrency() -> usize {
    5
}
fn default_user_agent() -> String {
    concat!("digest-publisher-linkcheck/", env!("CARGO_PKG_VERSION")).into()
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_review_store_path")]
    pub review_store_path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            review_store_path: default_review_store_path(),
        }
    }
}

fn default_review_store_path() -> PathBuf {
    PathBuf::from("state/review_queue.json")
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NotificationsConfig {
    #[serde(default)]
    pub webhook_url: Option<String>,
    #[serde(default)]
    pub email: Option<EmailConfig>,
}

/// SMTP credentials come from `SMTP_USER` / `SMTP_PASS`.
#[derive(Debug, Clone, Deserialize)]
pub struct EmailConfig {
    pub smtp_host: String,
    pub from: String,
    pub to: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

fn default_log_level() -> String {
    "info".into()
}

impl DigestConfig {
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let mut cfg: DigestConfig = toml::from_str(s).context("parsing digest config")?;
        if let Some(llm) = cfg.llm.take() {
            cfg.llm = Some(llm.resolve()?);
        }
        Ok(cfg)
    }

    pub fn track(&self, name: &str) -> Result<&TrackConfig, ConfigError> {
        self.tracks
            .get(name)
            .ok_or_else(|| ConfigError::MissingTrack(name.to_string()))
    }

    /// Check everything the job relies on before it touches anything.
    pub fn validate(&self, track: &str) -> Result<(), ConfigError> {
        let t = self.track(track)?;
        if t.items_max() == 0 {
            return Err(invalid("tracks.items_max", "must be at least 1"));
        }
        if t.items_min() > t.items_max() {
            return Err(invalid("tracks.items_min", "must not exceed items_max"));
        }
        if self.publishing.paths.news.trim().is_empty() {
            return Err(invalid("publishing.paths.news", "must not be empty"));
        }
        if url::Url::parse(&self.publishing.public_base_url).is_err() {
            return Err(invalid("publishing.public_base_url", "must be an absolute URL"));
        }
        if self.publishing.feed_max_items == 0 {
            return Err(invalid("publishing.feed_max_items", "must be at least 1"));
        }
        if self.publishing.commit_message.trim().is_empty() {
            return Err(invalid("publishing.commit_message", "must not be empty"));
        }
        let lc = &self.quality.link_check;
        if lc.max_concurrency == 0 {
            return Err(invalid("quality.link_check.max_concurrency", "must be at least 1"));
        }
        if !(lc.timeout_secs.is_finite() && lc.timeout_secs > 0.0) {
            return Err(invalid("quality.link_check.timeout_secs", "must be positive"));
        }
        if self.app.locale_defaults.is_empty() {
            return Err(invalid("app.locale_defaults", "must list at least one locale"));
        }
        Ok(())
    }
}

fn invalid(field: &'static str, reason: &str) -> ConfigError {
    ConfigError::Invalid {
        field,
        reason: reason.to_string(),
    }
}

/// Load configuration from an explicit path.
pub fn load_config_from(path: &Path) -> Result<DigestConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("reading digest config from {}", path.display()))?;
    DigestConfig::from_toml_str(&content)
}

/// Load configuration using env var + fallback:
/// 1) $DIGEST_CONFIG_PATH
/// 2) config/digest.toml
pub fn load_config_default() -> Result<DigestConfig> {
    if let Ok(p) = std::env::var(ENV_CONFIG_PATH) {
        let pb = PathBuf::from(p);
        if !pb.exists() {
            return Err(anyhow!("{ENV_CONFIG_PATH} points to non-existent path"));
        }
        return load_config_from(&pb);
    }
    load_config_from(Path::new(DEFAULT_CONFIG_PATH))
}
