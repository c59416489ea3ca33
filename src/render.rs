//! Markdown rendering of an edition, one document per locale.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use crate::model::{DigestEdition, MarkdownArtifact};

#[derive(Debug, Clone)]
pub struct DigestWriter {
    primary_locale: String,
    locales: Vec<String>,
}

/// YAML double-quoted scalar; line breaks and other control characters are
/// escaped so a value never spills onto the next line.
fn yaml_quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for ch in s.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c.is_control() => {
                let _ = write!(out, "\\u{:04x}", c as u32);
            }
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

fn yaml_list(out: &mut String, key: &str, values: &[String]) {
    if values.is_empty() {
        let _ = writeln!(out, "{key}: []");
        return;
    }
    let _ = writeln!(out, "{key}:");
    for v in values {
        let _ = writeln!(out, "  - {}", yaml_quote(v));
    }
}

impl DigestWriter {
    pub fn new(primary_locale: impl Into<String>, locales: Vec<String>) -> Self {
        Self {
            primary_locale: primary_locale.into(),
            locales,
        }
    }

    pub fn primary_locale(&self) -> &str {
        &self.primary_locale
    }

    /// Render the primary document and a copy for every other locale.
    // TODO: swap the secondary-locale copies for a translation step once one exists.
    pub fn render(&self, edition: &DigestEdition) -> BTreeMap<String, String> {
        let primary = render_document(edition);
        let mut outputs = BTreeMap::new();
        for locale in &self.locales {
            outputs.insert(locale.clone(), primary.clone());
        }
        outputs.insert(self.primary_locale.clone(), primary);
        tracing::info!(
            target: "render",
            locales = ?outputs.keys().collect::<Vec<_>>(),
            "digest rendered"
        );
        outputs
    }

    /// `{publish_dir}/{slug}/index.{locale}.md` for every rendered locale.
    pub fn artifacts(&self, edition: &DigestEdition, publish_dir: &str) -> Vec<MarkdownArtifact> {
        let dir = publish_dir.trim_end_matches('/');
        edition
            .locale_outputs
            .iter()
            .map(|(locale, content)| MarkdownArtifact {
                path: format!("{dir}/{}/index.{locale}.md", edition.slug),
                content: format!("{}\n", content.trim()),
                locale: locale.clone(),
            })
            .collect()
    }
}

pub fn render_document(edition: &DigestEdition) -> String {
    let mut out = String::new();
    let seed_ids: Vec<String> = edition.items.iter().map(|i| i.candidate_id.clone()).collect();
    let itinerary: Vec<String> = edition.items.iter().map(|i| i.headline.clone()).collect();

    out.push_str("---\n");
    let _ = writeln!(out, "track: {}", yaml_quote(&edition.track));
    let _ = writeln!(out, "title: {}", yaml_quote(&edition.title));
    let _ = writeln!(out, "slug: {}", yaml_quote(&edition.slug));
    let _ = writeln!(
        out,
        "generated_at: {}",
        yaml_quote(&edition.generated_at.to_rfc3339())
    );
    yaml_list(&mut out, "manual_item_ids", &edition.manual_item_ids());
    yaml_list(&mut out, "seed_ids", &seed_ids);
    yaml_list(&mut out, "itinerary", &itinerary);
    out.push_str("---\n\n");

    let _ = writeln!(out, "# {}\n", edition.title);
    for item in &edition.items {
        let _ = writeln!(out, "## {}\n", item.headline);
        let _ = writeln!(out, "**What happened:** {}\n", item.what_happened);
        let _ = writeln!(out, "**Why it matters:** {}\n", item.why_it_matters);
        out.push_str("**Further reading:**\n");
        for link in &item.links {
            let _ = writeln!(out, "- [{}]({})", link.title, link.url);
        }
        out.push('\n');
    }
    out
}

/// Body text without the front matter block.
pub fn strip_front_matter(doc: &str) -> &str {
    let Some(rest) = doc.strip_prefix("---\n") else {
        return doc;
    };
    match rest.find("\n---\n") {
        Some(end) => &rest[end + 5..],
        None => doc,
    }
}
