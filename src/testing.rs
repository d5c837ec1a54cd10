//! In-memory capability implementations for tests.
//!
//! `MemoryStore` stands in for the worksheet and `StaticFetcher` for the
//! browsing layer, so pipeline behavior is exercised deterministically with
//! no network.

use std::collections::HashMap;
use std::sync::Mutex as StdMutex;

use async_trait::async_trait;
use tokio::sync::Mutex;
use url::Url;

use crate::error::{Error, Result};
use crate::fetch::{PageFetcher, Readiness, RenderedPage};
use crate::sheets::{CellUpdate, SheetStore};

#[derive(Debug, Default)]
struct MemoryInner {
    header: Vec<String>,
    rows: Vec<Vec<String>>,
}

/// Worksheet stand-in holding the header and data rows in memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<MemoryInner>,
    fail_appends: bool,
}

impl MemoryStore {
    pub fn with_rows(header: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self {
            inner: Mutex::new(MemoryInner { header, rows }),
            fail_appends: false,
        }
    }

    /// A store whose `append_rows` always fails, for merge-failure paths.
    pub fn failing_appends(header: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self {
            inner: Mutex::new(MemoryInner { header, rows }),
            fail_appends: true,
        }
    }

    pub async fn snapshot(&self) -> (Vec<String>, Vec<Vec<String>>) {
        let inner = self.inner.lock().await;
        (inner.header.clone(), inner.rows.clone())
    }
}

#[async_trait]
impl SheetStore for MemoryStore {
    async fn read_header(&self) -> Result<Vec<String>> {
        Ok(self.inner.lock().await.header.clone())
    }

    async fn read_all_rows(&self) -> Result<Vec<Vec<String>>> {
        Ok(self.inner.lock().await.rows.clone())
    }

    async fn append_rows(&self, rows: Vec<Vec<String>>) -> Result<()> {
        if self.fail_appends {
            return Err(Error::Sheet {
                status: 503,
                message: "append unavailable".to_string(),
            });
        }
        self.inner.lock().await.rows.extend(rows);
        Ok(())
    }

    async fn update_header(&self, header: Vec<String>) -> Result<()> {
        self.inner.lock().await.header = header;
        Ok(())
    }

    async fn update_cells(&self, updates: Vec<CellUpdate>) -> Result<()> {
        let mut inner = self.inner.lock().await;
        for update in updates {
            if update.row < 2 || update.col < 1 {
                return Err(Error::Sheet {
                    status: 400,
                    message: format!("bad cell reference {}:{}", update.row, update.col),
                });
            }
            let row_idx = update.row - 2;
            let col_idx = update.col - 1;
            while inner.rows.len() <= row_idx {
                inner.rows.push(Vec::new());
            }
            let row = &mut inner.rows[row_idx];
            if row.len() <= col_idx {
                row.resize(col_idx + 1, String::new());
            }
            row[col_idx] = update.value;
        }
        Ok(())
    }
}

/// Canned fetcher mapping URLs to fixed HTML; unknown URLs fail the way a
/// dead page would. Every fetch is logged so tests can assert how often a
/// URL was visited.
#[derive(Debug, Default)]
pub struct StaticFetcher {
    pages: HashMap<String, String>,
    log: StdMutex<Vec<String>>,
}

impl StaticFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(mut self, url: &str, html: &str) -> Self {
        self.pages.insert(url.to_string(), html.to_string());
        self
    }

    pub fn fetch_count(&self, url: &str) -> usize {
        self.log
            .lock()
            .expect("fetch log lock")
            .iter()
            .filter(|u| u.as_str() == url)
            .count()
    }

    pub fn total_fetches(&self) -> usize {
        self.log.lock().expect("fetch log lock").len()
    }
}

#[async_trait]
impl PageFetcher for StaticFetcher {
    async fn fetch(
        &self,
        url: &str,
        _readiness: Readiness,
        _timeout: std::time::Duration,
    ) -> Result<RenderedPage> {
        self.log.lock().expect("fetch log lock").push(url.to_string());
        let html = self.pages.get(url).cloned().ok_or_else(|| Error::Fetch {
            url: url.to_string(),
            reason: "no such page".to_string(),
        })?;
        let parsed = Url::parse(url).map_err(|e| Error::Fetch {
            url: url.to_string(),
            reason: e.to_string(),
        })?;
        Ok(RenderedPage::new(parsed, html))
    }
}
