//! Topical relevance matching for candidate articles.
//!
//! Two strategies are OR-ed together. A compiled pattern recognizes
//! morphological variants of the AI vocabulary in Portuguese and English
//! with word-boundary anchoring, so `IA` matches as a word but not inside
//! `media`. A literal case-folded substring test against a configurable
//! phrase list lets operators extend coverage without touching the pattern;
//! the substring test carries no boundaries, which is loose for short
//! phrases but kept compatible with the rows historical runs accumulated.

use once_cell::sync::Lazy;
use regex::Regex;

/// Default phrase list for the substring fallback. Operators can replace it
/// with the `KEYWORDS` option.
pub const DEFAULT_KEYWORDS: [&str; 13] = [
    "IA",
    "inteligência artificial",
    "inteligencia artificial",
    "AI",
    "A.I.",
    "machine learning",
    "aprendizado de máquina",
    "aprendizagem automática",
    "LLM",
    "GenAI",
    "modelos de linguagem",
    "large language model",
    "modelo de linguagem",
];

static TOPIC_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)(\bi\.?a\.?\b|\ba\.?i\.?\b|intelig[eê]ncia\s+artificial|artificial\s+intelligence|machine\s+learning|aprendizado\s+de\s+m[áa]quina|aprendizagem\s+(?:de\s+m[áa]quina|autom[áa]tica)|\bllms?\b|\bgen\s?ai\b|generative\s+ai|ia\s+generativa|(?:large\s+)?language\s+models?|modelos?\s+de\s+linguagem)",
    )
    .expect("topic pattern is a valid regex")
});

/// Decides whether a blob of text is about the watched topic.
///
/// Pure and stateless; construct once per run and call it against the
/// header signals and the body text of each candidate.
#[derive(Debug, Clone)]
pub struct KeywordMatcher {
    phrases: Vec<String>,
}

impl KeywordMatcher {
    /// Build a matcher from an optional operator-supplied phrase list.
    /// `None` keeps the built-in defaults; blank entries are ignored.
    pub fn new(phrases: Option<Vec<String>>) -> Self {
        let source: Vec<String> = match phrases {
            Some(list) => list,
            None => DEFAULT_KEYWORDS.iter().map(|s| s.to_string()).collect(),
        };
        let phrases = source
            .iter()
            .map(|p| p.trim().to_lowercase())
            .filter(|p| !p.is_empty())
            .collect();
        Self { phrases }
    }

    /// True when either the compiled pattern or the case-folded substring
    /// list matches. Empty input never matches.
    pub fn matches(&self, text: &str) -> bool {
        if text.trim().is_empty() {
            return false;
        }
        if TOPIC_PATTERN.is_match(text) {
            return true;
        }
        let folded = text.to_lowercase();
        self.phrases.iter().any(|phrase| folded.contains(phrase.as_str()))
    }
}

impl Default for KeywordMatcher {
    fn default() -> Self {
        Self::new(None)
    }
}
