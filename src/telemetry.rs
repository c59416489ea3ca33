// src/telemetry.rs
//! Tracing subscriber setup (binary only) and metric descriptions.
//!
//! Library components only emit `tracing` events and `metrics` updates; no
//! global subscriber or recorder is installed from library code.

use metrics::{describe_counter, describe_gauge, describe_histogram};
use once_cell::sync::OnceCell;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::LoggingConfig;

/// Install the global subscriber. `RUST_LOG` wins over the configured level.
pub fn init(cfg: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{},hyper=warn,reqwest=warn", cfg.level)));

    let registry = tracing_subscriber::registry().with(filter);
    let result = if cfg.json {
        registry.with(fmt::layer().json().flatten_event(true)).try_init()
    } else {
        registry.with(fmt::layer().compact()).try_init()
    };
    if let Err(e) = result {
        eprintln!("tracing already initialized: {e}");
    }
}

/// One-time metrics registration (so series carry descriptions once a recorder exists).
pub fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("digest_candidates_total", "Candidates fetched, by source.");
        describe_counter!("digest_connector_errors_total", "Connector fetch/parse errors.");
        describe_counter!(
            "digest_dedup_dropped_total",
            "Candidates dropped because their URL was already seen."
        );
        describe_gauge!("digest_selected_items", "Items selected for the last edition.");
        describe_counter!(
            "digest_quality_blocked_total",
            "Editions withheld by the quality gate."
        );
        describe_counter!("digest_broken_links_total", "Broken links found by link health.");
        describe_counter!("digest_publish_total", "Successful publication transactions.");
        describe_counter!(
            "digest_publish_failures_total",
            "Publication transactions that ended in an error."
        );
        describe_histogram!("digest_rss_parse_ms", "RSS parse time in milliseconds.");
    });
}
