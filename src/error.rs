//! Error taxonomy for the discovery and augmentation pipelines.
//!
//! Configuration and credential problems are fatal and surface before any
//! network activity. Fetch failures are transient and handled locally by the
//! pipeline's retry ladder. A failed batch merge carries every record that
//! was not confirmed written, so nothing is lost silently.

use thiserror::Error;

use crate::models::ArticleRecord;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("credential error: {0}")]
    Credentials(String),

    #[error("fetch failed for {url}: {reason}")]
    Fetch { url: String, reason: String },

    #[error("sheet API error (status {status}): {message}")]
    Sheet { status: u16, message: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("text generation failed: {0}")]
    Generation(String),

    /// The batch append did not complete. The records were assembled but are
    /// not confirmed written; the caller decides whether to retry or inspect.
    #[error("batch merge failed; {} record(s) not confirmed written", records.len())]
    Merge {
        records: Vec<ArticleRecord>,
        #[source]
        source: Box<Error>,
    },
}
