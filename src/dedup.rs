//! Dedup index over the persisted table's current snapshot.

use std::collections::HashSet;

use crate::normalize::canonical_url;

/// The set of already-known article identities, in canonical-URL space.
///
/// Rebuilt from the table at the start of every run, grown as records are
/// accepted within the run, and discarded at run end; the table itself is
/// the only cross-run memory.
#[derive(Debug, Default)]
pub struct KnownSet {
    inner: HashSet<String>,
}

impl KnownSet {
    /// Build the set from table rows, reading the link cell at `link_col`.
    /// Rows with a missing or blank link are skipped.
    pub fn build(rows: &[Vec<String>], link_col: usize) -> Self {
        let inner = rows
            .iter()
            .filter_map(|row| row.get(link_col))
            .map(|link| link.trim())
            .filter(|link| !link.is_empty())
            .map(canonical_url)
            .collect();
        Self { inner }
    }

    pub fn contains(&self, url: &str) -> bool {
        self.inner.contains(&canonical_url(url))
    }

    /// Record an accepted URL. Returns false when it was already known.
    pub fn record(&mut self, url: &str) -> bool {
        self.inner.insert(canonical_url(url))
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}
