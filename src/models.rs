//! Data models for discovered articles and the worksheet column contract.
//!
//! The persisted table is a worksheet whose first row carries column names.
//! All row access goes through [`ColumnMap`], which resolves the expected
//! names case-insensitively with accent folding and supplies a blank default
//! for absent cells; nothing in the pipeline indexes rows positionally
//! without it.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::utils::fold_header_key;

pub const COL_DATE: &str = "Data";
pub const COL_TITLE: &str = "Título";
pub const COL_LINK: &str = "Link";
pub const COL_SUMMARY: &str = "Resumo";
pub const COL_GENERATED: &str = "Prompt personalizado";
pub const COL_CAPTURED: &str = "Capturado em";

/// Expected worksheet columns, in their fixed order. Missing columns are
/// appended to the header (in this order) before any merge.
pub const EXPECTED_COLUMNS: [&str; 6] = [
    COL_DATE,
    COL_TITLE,
    COL_LINK,
    COL_SUMMARY,
    COL_GENERATED,
    COL_CAPTURED,
];

/// One discovered article, destined for the persisted table.
///
/// `link` is the record's natural identity; uniqueness is enforced under
/// canonical comparison, not raw-string comparison. `generated_text` stays
/// empty here; the augmentation stage fills it later and the discovery
/// pipeline never touches the field on already-known records.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArticleRecord {
    pub publish_date: NaiveDate,
    pub title: String,
    pub link: String,
    pub summary: String,
    pub generated_text: String,
    pub captured_at: DateTime<Utc>,
}

impl ArticleRecord {
    /// Render the record as a worksheet row laid out by `columns`.
    ///
    /// Cells without a mapped column are left blank; the row is wide enough
    /// for every mapped column.
    pub fn to_row(&self, columns: &ColumnMap) -> Vec<String> {
        let width = columns.width().max(EXPECTED_COLUMNS.len());
        let mut row = vec![String::new(); width];
        let mut set = |name: &str, value: String| {
            if let Some(idx) = columns.get(name) {
                if idx < row.len() {
                    row[idx] = value;
                }
            }
        };
        set(COL_DATE, self.publish_date.format("%Y-%m-%d").to_string());
        set(COL_TITLE, self.title.clone());
        set(COL_LINK, self.link.clone());
        set(COL_SUMMARY, self.summary.clone());
        set(COL_GENERATED, self.generated_text.clone());
        set(
            COL_CAPTURED,
            self.captured_at.format("%Y-%m-%d %H:%M:%S").to_string(),
        );
        row
    }
}

/// Header-name to 0-based column-index resolution for one worksheet.
#[derive(Debug, Clone)]
pub struct ColumnMap {
    index: HashMap<String, usize>,
    width: usize,
}

impl ColumnMap {
    /// Build the map from a header row. When two columns fold to the same
    /// key the first one wins, matching how the sheet is read by eye.
    pub fn from_header(header: &[String]) -> Self {
        let mut index = HashMap::new();
        for (idx, name) in header.iter().enumerate() {
            index.entry(fold_header_key(name)).or_insert(idx);
        }
        Self {
            index,
            width: header.len(),
        }
    }

    pub fn get(&self, name: &str) -> Option<usize> {
        self.index.get(&fold_header_key(name)).copied()
    }

    /// Read a cell by column name, defaulting to blank for absent columns
    /// and ragged rows.
    pub fn cell<'a>(&self, row: &'a [String], name: &str) -> &'a str {
        self.get(name)
            .and_then(|idx| row.get(idx))
            .map(String::as_str)
            .unwrap_or("")
    }

    /// Expected columns absent from this header, in their fixed order.
    pub fn missing_expected(&self) -> Vec<&'static str> {
        EXPECTED_COLUMNS
            .iter()
            .filter(|name| self.get(name).is_none())
            .copied()
            .collect()
    }

    pub fn width(&self) -> usize {
        self.width
    }
}

/// Per-run counters reported when discovery finishes. `skipped` aggregates
/// already-known links, fetch failures, and keyword rejections; the split
/// is visible in the logs only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub accepted: usize,
    pub skipped: usize,
}
