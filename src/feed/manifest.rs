//! `manifest.json`: the ordered list of published slugs, newest first.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::FeedError;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestState {
    #[serde(default)]
    pub slugs: Vec<String>,
}

impl ManifestState {
    /// Parse manifest JSON; anything unreadable starts an empty manifest.
    /// Repeated slugs in a hand-edited file keep their first occurrence.
    pub fn from_json_str(raw: &str) -> Self {
        match serde_json::from_str::<ManifestState>(raw) {
            Ok(state) => {
                let mut slugs: Vec<String> = Vec::with_capacity(state.slugs.len());
                for slug in state.slugs {
                    if !slugs.contains(&slug) {
                        slugs.push(slug);
                    }
                }
                Self { slugs }
            }
            Err(e) => {
                tracing::warn!(target: "feed", error = %e, "manifest unreadable, starting fresh");
                Self::default()
            }
        }
    }

    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(raw) => Self::from_json_str(&raw),
            Err(_) => Self::default(),
        }
    }

    /// Move (or add) `slug` to the front.
    pub fn merge(&self, slug: &str) -> Self {
        let mut slugs = Vec::with_capacity(self.slugs.len() + 1);
        slugs.push(slug.to_string());
        slugs.extend(self.slugs.iter().filter(|s| *s != slug).cloned());
        Self { slugs }
    }

    pub fn to_json(&self) -> Result<String, FeedError> {
        let mut out = serde_json::to_string_pretty(self)?;
        out.push('\n');
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_or_invalid_manifest_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(ManifestState::load(&dir.path().join("manifest.json")), ManifestState::default());
        assert!(ManifestState::from_json_str("{not json").slugs.is_empty());
        assert!(ManifestState::from_json_str(r#"{"slugs": "oops"}"#).slugs.is_empty());
    }

    #[test]
    fn duplicates_collapse_to_first_occurrence() {
        let m = ManifestState::from_json_str(r#"{"slugs": ["b", "a", "b", "c", "a"]}"#);
        assert_eq!(m.slugs, vec!["b", "a", "c"]);
    }

    #[test]
    fn merge_moves_slug_to_front_once() {
        let m = ManifestState {
            slugs: vec!["a".into(), "b".into(), "c".into()],
        };
        let merged = m.merge("b");
        assert_eq!(merged.slugs, vec!["b", "a", "c"]);
        assert_eq!(merged.merge("b"), merged);
        assert_eq!(m.merge("z").slugs, vec!["z", "a", "b", "c"]);
    }

    #[test]
    fn serializes_pretty_with_trailing_newline() {
        let m = ManifestState::default().merge("weekly-20251001");
        assert_eq!(m.to_json().unwrap(), "{\n  \"slugs\": [\n    \"weekly-20251001\"\n  ]\n}\n");
    }
}
