//! URL canonicalization for identity comparison.
//!
//! Two links point at the same article iff their canonical forms are equal.
//! The canonical form is derived and never navigated: fragment stripped,
//! tracking query parameters stripped, remaining query pairs re-encoded in
//! their original order, the whole serialization lower-cased, and a single
//! trailing slash removed.

use url::Url;

/// Query keys starting with one of these (case-insensitively) are dropped.
/// `utm_` covers the usual campaign tags; `hs_`/`hss_` cover the analytics
/// parameters the target blog platform appends to its own links.
const TRACKING_PREFIXES: [&str; 3] = ["utm_", "hs_", "hss_"];

/// Canonicalize a URL for identity comparison.
///
/// Never fails: when the URL cannot be parsed, degrades to trimming
/// whitespace, stripping one trailing slash, and lower-casing the raw
/// string, so one malformed link can never abort a discovery run.
///
/// Idempotent: `canonical_url(&canonical_url(u)) == canonical_url(u)`.
pub fn canonical_url(raw: &str) -> String {
    let trimmed = raw.trim();
    match Url::parse(trimmed) {
        Ok(mut url) => {
            url.set_fragment(None);

            let kept: Vec<(String, String)> = url
                .query_pairs()
                .filter(|(key, _)| !is_tracking_key(key))
                .map(|(k, v)| (k.into_owned(), v.into_owned()))
                .collect();
            if kept.is_empty() {
                url.set_query(None);
            } else {
                let mut pairs = url.query_pairs_mut();
                pairs.clear();
                for (key, value) in &kept {
                    pairs.append_pair(key, value);
                }
            }

            strip_one_trailing_slash(&url.to_string()).to_lowercase()
        }
        Err(_) => strip_one_trailing_slash(trimmed).to_lowercase(),
    }
}

fn is_tracking_key(key: &str) -> bool {
    let key = key.to_lowercase();
    TRACKING_PREFIXES
        .iter()
        .any(|prefix| key.starts_with(prefix))
}

fn strip_one_trailing_slash(s: &str) -> &str {
    s.strip_suffix('/').unwrap_or(s)
}
