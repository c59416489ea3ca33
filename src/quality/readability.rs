//! Flesch reading ease over rendered markdown.
//!
//! `206.835 - 1.015 * (words / sentences) - 84.6 * (syllables / words)`

use once_cell::sync::OnceCell;
use regex::Regex;

use crate::render::strip_front_matter;

fn re(cell: &'static OnceCell<Regex>, pattern: &str) -> &'static Regex {
    cell.get_or_init(|| Regex::new(pattern).expect("static regex"))
}

/// Drop front matter, markdown link targets and markup characters.
pub fn plain_text(markdown: &str) -> String {
    static RE_LINK: OnceCell<Regex> = OnceCell::new();
    static RE_MARKUP: OnceCell<Regex> = OnceCell::new();

    let body = strip_front_matter(markdown);
    let no_links = re(&RE_LINK, r"\[([^\]]*)\]\([^)]*\)").replace_all(body, "$1");
    re(&RE_MARKUP, r"[#*_`>|]+")
        .replace_all(&no_links, " ")
        .to_string()
}

fn words(text: &str) -> Vec<&str> {
    text.split_whitespace()
        .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()))
        .filter(|w| w.chars().any(char::is_alphabetic))
        .collect()
}

fn sentence_count(text: &str) -> usize {
    static RE_SENT: OnceCell<Regex> = OnceCell::new();
    // Headings and list entries end without punctuation; count them as sentences too.
    let terminal = re(&RE_SENT, r"[.!?]+(\s|$)").find_iter(text).count();
    let bare_lines = text
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.ends_with(['.', '!', '?']))
        .filter(|l| !words(l).is_empty())
        .count();
    (terminal + bare_lines).max(1)
}

/// Vowel-group heuristic with a silent trailing `e`; at least one per word.
pub fn syllables(word: &str) -> usize {
    let w = word.to_lowercase();
    let mut count = 0usize;
    let mut prev_vowel = false;
    for ch in w.chars() {
        let vowel = matches!(ch, 'a' | 'e' | 'i' | 'o' | 'u' | 'y');
        if vowel && !prev_vowel {
            count += 1;
        }
        prev_vowel = vowel;
    }
    if w.ends_with('e') && !w.ends_with("le") && count > 1 {
        count -= 1;
    }
    count.max(1)
}

/// Flesch reading ease of rendered markdown; `0.0` for text without words.
pub fn flesch_reading_ease(markdown: &str) -> f64 {
    let text = plain_text(markdown);
    let ws = words(&text);
    if ws.is_empty() {
        return 0.0;
    }
    let word_count = ws.len() as f64;
    let sentences = sentence_count(&text) as f64;
    let syllable_count: usize = ws.iter().map(|w| syllables(w)).sum();
    let score = 206.835 - 1.015 * (word_count / sentences) - 84.6 * (syllable_count as f64 / word_count);
    (score * 100.0).round() / 100.0
}
