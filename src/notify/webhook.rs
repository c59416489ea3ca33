use anyhow::{anyhow, Result};
use reqwest::Client;
use std::time::Duration;

use super::{NotificationEvent, Notifier};

/// Slack-compatible incoming webhook (`{"text": ...}`), retried with
/// exponential backoff.
#[derive(Clone)]
pub struct WebhookNotifier {
    url: String,
    client: Client,
    timeout: Duration,
    max_retries: u8,
}

impl WebhookNotifier {
    pub fn new(url: String) -> Self {
        Self {
            url,
            client: Client::new(),
            timeout: Duration::from_secs(5),
            max_retries: 3,
        }
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout = Duration::from_secs(secs);
        self
    }

    pub fn with_retries(mut self, retries: u8) -> Self {
        self.max_retries = retries.max(1);
        self
    }
}

#[async_trait::async_trait]
impl Notifier for WebhookNotifier {
    async fn send(&self, ev: &NotificationEvent) -> Result<()> {
        let body = serde_json::json!({ "text": ev.body(), "event": ev });

        let mut attempt: u8 = 0;
        loop {
            attempt += 1;
            let res = self
                .client
                .post(&self.url)
                .timeout(self.timeout)
                .json(&body)
                .send()
                .await;

            let err = match res {
                Ok(rsp) => match rsp.error_for_status_ref() {
                    Ok(_) => return Ok(()),
                    Err(e) => anyhow!("webhook HTTP error: {e}"),
                },
                Err(e) => anyhow!("webhook request failed: {e}"),
            };
            if attempt >= self.max_retries {
                return Err(err);
            }
            tracing::debug!(target: "notify", attempt, error = %err, "webhook retry");
            tokio::time::sleep(Duration::from_millis(500u64 << (attempt - 1))).await;
        }
    }

    fn name(&self) -> &'static str {
        "webhook"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::EventKind;
    use chrono::Utc;

    #[tokio::test]
    async fn unreachable_webhook_reports_error_after_retries() {
        let n = WebhookNotifier::new("http://127.0.0.1:9/hook".into())
            .with_timeout(1)
            .with_retries(1);
        let ev = NotificationEvent {
            kind: EventKind::Published,
            track: "news".into(),
            slug: "weekly-1".into(),
            headline: "ok".into(),
            details: vec![],
            ts: Utc::now(),
        };
        assert!(n.send(&ev).await.is_err());
    }
}
