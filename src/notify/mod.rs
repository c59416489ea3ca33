//! Run notifications. Delivery is best-effort: failures are logged and never
//! change the run outcome.

pub mod email;
pub mod webhook;

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::config::NotificationsConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Published,
    Unchanged,
    Blocked,
    PublishFailed,
}

#[derive(Debug, Clone, Serialize)]
pub struct NotificationEvent {
    pub kind: EventKind,
    pub track: String,
    pub slug: String,
    pub headline: String,
    /// Issues for a blocked run, the error for a failed publish, else empty.
    pub details: Vec<String>,
    pub ts: DateTime<Utc>,
}

impl NotificationEvent {
    pub fn subject(&self) -> String {
        let what = match self.kind {
            EventKind::Published => "published",
            EventKind::Unchanged => "unchanged",
            EventKind::Blocked => "blocked by quality gate",
            EventKind::PublishFailed => "publish failed",
        };
        format!("Digest {} ({}): {what}", self.slug, self.track)
    }

    pub fn body(&self) -> String {
        let mut out = format!("{}\n{}\n", self.subject(), self.headline);
        for d in &self.details {
            out.push_str("- ");
            out.push_str(d);
            out.push('\n');
        }
        out.push_str(&format!("@ {}\n", self.ts.to_rfc3339()));
        out
    }
}

#[async_trait::async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, ev: &NotificationEvent) -> Result<()>;
    fn name(&self) -> &'static str;
}

/// Fan an event out to every configured notifier.
#[derive(Default)]
pub struct NotifierMux {
    notifiers: Vec<Box<dyn Notifier>>,
}

impl NotifierMux {
    pub fn new(notifiers: Vec<Box<dyn Notifier>>) -> Self {
        Self { notifiers }
    }

    /// Webhook and/or email from configuration; a misconfigured channel is
    /// skipped with a warning.
    pub fn from_config(cfg: &NotificationsConfig) -> Self {
        let mut notifiers: Vec<Box<dyn Notifier>> = Vec::new();
        if let Some(url) = cfg.webhook_url.as_deref().filter(|u| !u.trim().is_empty()) {
            notifiers.push(Box::new(webhook::WebhookNotifier::new(url.to_string())));
        }
        if let Some(email_cfg) = &cfg.email {
            match email::EmailNotifier::from_config(email_cfg) {
                Ok(n) => notifiers.push(Box::new(n)),
                Err(e) => tracing::warn!(target: "notify", error = %e, "email notifier disabled"),
            }
        }
        Self { notifiers }
    }

    pub fn is_empty(&self) -> bool {
        self.notifiers.is_empty()
    }

    /// Returns how many notifiers delivered the event.
    pub async fn dispatch(&self, ev: &NotificationEvent) -> usize {
        let mut delivered = 0;
        for n in &self.notifiers {
            match n.send(ev).await {
                Ok(()) => delivered += 1,
                Err(e) => {
                    tracing::warn!(target: "notify", notifier = n.name(), error = %e, "notification failed")
                }
            }
        }
        delivered
    }
}
