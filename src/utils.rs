//! Small string helpers shared across the pipeline.
//!
//! - Accent-folded header keys for matching worksheet column names
//! - Character-budget truncation for summaries

/// Fold a worksheet header name into a comparison key.
///
/// Lower-cases the name, strips surrounding whitespace, and replaces the
/// accented characters that appear in the Portuguese column names
/// (`Título`, `Capturado em`, ...) with their plain ASCII equivalents, so
/// header matching survives operators retyping headers without accents.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(fold_header_key(" Título "), "titulo");
/// assert_eq!(fold_header_key("Link"), "link");
/// ```
pub fn fold_header_key(name: &str) -> String {
    name.trim()
        .to_lowercase()
        .chars()
        .map(|c| match c {
            'á' | 'ã' | 'â' | 'à' => 'a',
            'é' | 'ê' => 'e',
            'í' => 'i',
            'ó' | 'ô' | 'õ' => 'o',
            'ú' => 'u',
            'ç' => 'c',
            other => other,
        })
        .collect()
}

/// Truncate a string to a character budget, appending an ellipsis marker
/// when truncation occurred.
///
/// The marker counts against the budget, so the result never exceeds
/// `budget` characters.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(truncate_chars("short", 600), "short");
/// assert!(truncate_chars(&"a".repeat(700), 600).ends_with('…'));
/// ```
pub fn truncate_chars(s: &str, budget: usize) -> String {
    if s.chars().count() <= budget {
        return s.to_string();
    }
    let mut out: String = s.chars().take(budget.saturating_sub(1)).collect();
    out.push('…');
    out
}
