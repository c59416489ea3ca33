//! Digest publisher: binary entrypoint.
//! Runs one digest edition for a track and exits.
//!
//! Usage: `digest-publisher [CONFIG_PATH] [TRACK]`
//! Without a path, `$DIGEST_CONFIG_PATH` and then `config/digest.toml` are tried.

use std::path::PathBuf;
use std::process::ExitCode;

use digest_publisher::config::{load_config_default, load_config_from, NEWS_TRACK};
use digest_publisher::{telemetry, DigestJob, RunOutcome};

#[tokio::main]
async fn main() -> ExitCode {
    // Load .env in local/dev; no-op when absent.
    let _ = dotenvy::dotenv();

    let mut args = std::env::args().skip(1);
    let config_path = args.next().map(PathBuf::from);
    let track = args.next().unwrap_or_else(|| NEWS_TRACK.to_string());

    let config = match config_path {
        Some(p) => load_config_from(&p),
        None => load_config_default(),
    };
    let config = match config {
        Ok(c) => c,
        Err(e) => {
            eprintln!("failed to load configuration: {e:#}");
            return ExitCode::from(2);
        }
    };

    telemetry::init(&config.logging);

    let job = match DigestJob::from_config(config, &track) {
        Ok(job) => job,
        Err(e) => {
            tracing::error!(target: "job", error = ?e, %track, "job setup failed");
            return ExitCode::from(2);
        }
    };

    match job.run().await {
        Ok(report) => match report.outcome {
            RunOutcome::Published(_) => ExitCode::SUCCESS,
            RunOutcome::Blocked { .. } => ExitCode::from(3),
            RunOutcome::PublishFailed { .. } => ExitCode::FAILURE,
        },
        Err(e) => {
            tracing::error!(target: "job", error = ?e, "digest run failed");
            ExitCode::from(2)
        }
    }
}
