// src/config/llm.rs
use serde::{Deserialize, Serialize};
use std::env;

pub const ENV_LLM_API_KEY: &str = "LLM_API_KEY";

fn default_enabled() -> bool {
    true
}
fn default_model() -> String {
    "gpt-4o-mini".to_string()
}
fn default_temperature() -> f32 {
    0.3
}
fn default_timeout_secs() -> f64 {
    30.0
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Base URL of an OpenAI-compatible API, without the `/v1/...` suffix.
    pub base_url: String,
    #[serde(default = "default_model")]
    pub model: String,
    /// `"ENV"` means: read from `LLM_API_KEY`.
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: f64,
}

impl LlmConfig {
    /// Resolve `"ENV"` placeholders and sanitize numeric fields.
    pub fn resolve(mut self) -> anyhow::Result<Self> {
        let wants_env = self
            .api_key
            .as_deref()
            .is_some_and(|k| k.trim().eq_ignore_ascii_case("env"));
        if wants_env {
            self.api_key = Some(
                env::var(ENV_LLM_API_KEY)
                    .map_err(|_| anyhow::anyhow!("Missing {ENV_LLM_API_KEY} env var"))?,
            );
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            self.temperature = default_temperature();
        }
        if !(self.timeout_secs.is_finite() && self.timeout_secs > 0.0) {
            self.timeout_secs = default_timeout_secs();
        }
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg(api_key: Option<&str>) -> LlmConfig {
        LlmConfig {
            enabled: true,
            base_url: "http://localhost:8080".into(),
            model: default_model(),
            api_key: api_key.map(str::to_string),
            temperature: 7.0,
            timeout_secs: -1.0,
        }
    }

    #[serial_test::serial]
    #[test]
    fn env_placeholder_is_resolved() {
        env::set_var(ENV_LLM_API_KEY, "sk-test");
        let out = cfg(Some("ENV")).resolve().unwrap();
        assert_eq!(out.api_key.as_deref(), Some("sk-test"));
        assert_eq!(out.temperature, default_temperature());
        assert_eq!(out.timeout_secs, default_timeout_secs());

        env::remove_var(ENV_LLM_API_KEY);
        assert!(cfg(Some("env")).resolve().is_err());
    }

    #[test]
    fn literal_key_is_kept() {
        let out = cfg(Some("literal")).resolve().unwrap();
        assert_eq!(out.api_key.as_deref(), Some("literal"));
    }
}
