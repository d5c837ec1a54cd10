//! Augmentation pass: fill the generated-text column from stored summaries.
//!
//! Scans the worksheet and, for every row with a usable summary and an
//! empty generated-text cell, asks the generator for the text and writes it
//! back. A non-empty cell is never overwritten, so the pass is idempotent
//! and safe to re-run after partial failures. Writes are buffered and
//! flushed in small batches to keep one slow row from holding back the
//! rest.

use std::time::Duration;

use tokio::time::sleep;
use tracing::{debug, error, info};

use crate::api::Generate;
use crate::error::{Error, Result};
use crate::models::{COL_GENERATED, COL_SUMMARY, ColumnMap};
use crate::sheets::{CellUpdate, SheetStore};

/// Cell writes buffered before a flush.
const FLUSH_EVERY: usize = 5;

/// Pause between flushes, easy on the write quota.
const FLUSH_PAUSE: Duration = Duration::from_millis(300);

/// Counters reported when the augmentation pass finishes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AugmentSummary {
    pub processed: usize,
    pub skipped: usize,
}

/// Read-only processing report for the worksheet.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TableStatus {
    pub total: usize,
    pub with_summary: usize,
    pub with_generated: usize,
    pub ready: usize,
}

/// Run the augmentation pass.
///
/// Rows are skipped when the summary is blank or shorter than
/// `min_summary_len` characters, or when the generated-text cell already
/// has content. A generation failure skips that row and moves on; it never
/// aborts the pass.
pub async fn run<S, G>(store: &S, generator: &G, min_summary_len: usize) -> Result<AugmentSummary>
where
    S: SheetStore + ?Sized,
    G: Generate + ?Sized,
{
    let mut header = store.read_header().await?;
    let mut columns = ColumnMap::from_header(&header);

    let summary_col = columns.get(COL_SUMMARY).ok_or_else(|| {
        Error::Config(format!("column '{COL_SUMMARY}' not found in the sheet header"))
    })?;
    if columns.get(COL_GENERATED).is_none() {
        header.push(COL_GENERATED.to_string());
        store.update_header(header.clone()).await?;
        columns = ColumnMap::from_header(&header);
        info!(column = COL_GENERATED, "added missing column to header");
    }
    let generated_col = columns.get(COL_GENERATED).ok_or_else(|| {
        Error::Config(format!("column '{COL_GENERATED}' not found after header update"))
    })?;

    let rows = store.read_all_rows().await?;
    info!(rows = rows.len(), "augmentation pass starting");

    let mut summary = AugmentSummary::default();
    let mut pending: Vec<CellUpdate> = Vec::new();

    for (idx, row) in rows.iter().enumerate() {
        // 1-based worksheet row, header on row 1.
        let sheet_row = idx + 2;
        let resumo = row.get(summary_col).map(|s| s.trim()).unwrap_or("");
        let existing = row.get(generated_col).map(|s| s.trim()).unwrap_or("");

        if resumo.is_empty() || resumo.chars().count() < min_summary_len || !existing.is_empty() {
            debug!(row = sheet_row, "nothing to do; skipping");
            summary.skipped += 1;
            continue;
        }

        match generator.generate(resumo).await {
            Ok(text) => {
                pending.push(CellUpdate {
                    row: sheet_row,
                    col: generated_col + 1,
                    value: text,
                });
                summary.processed += 1;
            }
            Err(e) => {
                error!(row = sheet_row, error = %e, "generation failed; leaving cell empty");
                summary.skipped += 1;
            }
        }

        if pending.len() >= FLUSH_EVERY {
            store.update_cells(std::mem::take(&mut pending)).await?;
            sleep(FLUSH_PAUSE).await;
        }
    }

    if !pending.is_empty() {
        store.update_cells(pending).await?;
    }

    info!(
        processed = summary.processed,
        skipped = summary.skipped,
        "augmentation pass complete"
    );
    Ok(summary)
}

/// Build the read-only table report: how many rows exist, how many carry a
/// summary, how many already have generated text, and how many are ready
/// for the next augmentation pass.
pub async fn table_status<S>(store: &S) -> Result<TableStatus>
where
    S: SheetStore + ?Sized,
{
    let header = store.read_header().await?;
    let columns = ColumnMap::from_header(&header);
    let rows = store.read_all_rows().await?;

    let mut status = TableStatus {
        total: rows.len(),
        ..TableStatus::default()
    };
    for row in &rows {
        let resumo = columns.cell(row, COL_SUMMARY).trim();
        let generated = columns.cell(row, COL_GENERATED).trim();
        if !resumo.is_empty() {
            status.with_summary += 1;
        }
        if !generated.is_empty() {
            status.with_generated += 1;
        }
        if !resumo.is_empty() && generated.is_empty() {
            status.ready += 1;
        }
    }
    Ok(status)
}
