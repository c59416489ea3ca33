//! Optional text enhancement through an OpenAI-compatible chat endpoint.
//!
//! An enhancer either returns an improved string or nothing; callers keep the
//! original text whenever nothing comes back.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::llm::LlmConfig;
use crate::model::DigestItem;

pub trait TextEnhancer: Send + Sync {
    /// Rewrite `text` (the `field` of a digest item). `None` means "keep the original".
    fn enhance<'a>(
        &'a self,
        field: &'a str,
        text: &'a str,
    ) -> Pin<Box<dyn Future<Output = Option<String>> + Send + 'a>>;
    fn provider_name(&self) -> &'static str;
}

pub type DynEnhancer = Arc<dyn TextEnhancer>;

/// Build an enhancer from optional configuration; disabled when absent.
pub fn build_enhancer(config: Option<&LlmConfig>) -> DynEnhancer {
    match config {
        Some(cfg) if cfg.enabled => Arc::new(ChatCompletionEnhancer::new(cfg)),
        _ => Arc::new(DisabledEnhancer),
    }
}

/// Returns `None` always; used when enhancement is not configured.
pub struct DisabledEnhancer;

impl TextEnhancer for DisabledEnhancer {
    fn enhance<'a>(
        &'a self,
        _field: &'a str,
        _text: &'a str,
    ) -> Pin<Box<dyn Future<Output = Option<String>> + Send + 'a>> {
        Box::pin(async { None })
    }
    fn provider_name(&self) -> &'static str {
        "disabled"
    }
}

pub struct ChatCompletionEnhancer {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
    temperature: f32,
}

impl ChatCompletionEnhancer {
    pub fn new(cfg: &LlmConfig) -> Self {
        // Falls back to a default client if the builder rejects the settings.
        let http = reqwest::Client::builder()
            .user_agent(concat!("digest-publisher/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(Duration::from_secs(4))
            .timeout(Duration::from_secs_f64(cfg.timeout_secs))
            .build()
            .unwrap_or_default();
        Self {
            http,
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
            api_key: cfg.api_key.clone().filter(|k| !k.is_empty()),
            model: cfg.model.clone(),
            temperature: cfg.temperature,
        }
    }

    async fn complete(&self, field: &str, text: &str) -> Option<String> {
        #[derive(Serialize)]
        struct Msg<'a> {
            role: &'a str,
            content: &'a str,
        }
        #[derive(Serialize)]
        struct Req<'a> {
            model: &'a str,
            messages: Vec<Msg<'a>>,
            temperature: f32,
        }
        #[derive(Deserialize)]
        struct Resp {
            #[serde(default)]
            choices: Vec<Choice>,
        }
        #[derive(Deserialize)]
        struct Choice {
            message: ChoiceMsg,
        }
        #[derive(Deserialize)]
        struct ChoiceMsg {
            content: Option<String>,
        }

        let sys = "You edit news digest copy for a business audience. Keep facts unchanged, \
                   use plain language, answer with the rewritten text only.";
        let user = format!("Rewrite the `{field}` paragraph:\n\n{text}");
        let req = Req {
            model: &self.model,
            messages: vec![
                Msg {
                    role: "system",
                    content: sys,
                },
                Msg {
                    role: "user",
                    content: &user,
                },
            ],
            temperature: self.temperature,
        };

        let url = format!("{}/v1/chat/completions", self.base_url);
        let mut call = self.http.post(&url).json(&req);
        if let Some(key) = &self.api_key {
            call = call.bearer_auth(key);
        }
        let resp = match call.send().await {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!(target: "enhance", error = %e, "llm completion failed");
                return None;
            }
        };
        if !resp.status().is_success() {
            tracing::warn!(target: "enhance", status = %resp.status(), "llm completion non-2xx");
            return None;
        }
        let body: Resp = resp.json().await.ok()?;
        let content = body.choices.into_iter().next()?.message.content?;
        let cleaned = sanitize_completion(&content);
        (!cleaned.is_empty()).then_some(cleaned)
    }
}

impl TextEnhancer for ChatCompletionEnhancer {
    fn enhance<'a>(
        &'a self,
        field: &'a str,
        text: &'a str,
    ) -> Pin<Box<dyn Future<Output = Option<String>> + Send + 'a>> {
        Box::pin(self.complete(field, text))
    }
    fn provider_name(&self) -> &'static str {
        "chat-completions"
    }
}

/// Single paragraph, collapsed whitespace, surrounding quotes removed.
pub fn sanitize_completion(input: &str) -> String {
    let collapsed = input.split_whitespace().collect::<Vec<_>>().join(" ");
    collapsed
        .trim_matches(|c| c == '"' || c == '\'')
        .trim()
        .to_string()
}

/// Run the enhancer over every item's `why_it_matters`; failures keep the original.
pub async fn enhance_items(enhancer: &dyn TextEnhancer, items: Vec<DigestItem>) -> Vec<DigestItem> {
    let mut out = Vec::with_capacity(items.len());
    let mut improved = 0usize;
    for item in items {
        if item.why_it_matters.trim().is_empty() {
            out.push(item);
            continue;
        }
        match enhancer.enhance("why_it_matters", &item.why_it_matters).await {
            Some(text) => {
                improved += 1;
                out.push(DigestItem {
                    why_it_matters: text,
                    ..item
                });
            }
            None => out.push(item),
        }
    }
    tracing::info!(
        target: "enhance",
        provider = enhancer.provider_name(),
        improved,
        total = out.len(),
        "items enhanced"
    );
    out
}
