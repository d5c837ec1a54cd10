//! # IA Radar
//!
//! A discovery-and-augmentation pipeline that watches a marketing blog for
//! AI-related posts, records them in a shared spreadsheet, and later fills
//! each row with generated social-media text.
//!
//! ## Architecture
//!
//! The `discover` run walks a fixed pipeline:
//! 1. **Listing fetch**: render the configured blog listing page
//! 2. **Link extraction**: collect candidate article links, deduplicated
//!    by canonical URL against the rows already in the sheet
//! 3. **Per-link processing**: fetch each article, extract publish date,
//!    title, and summary, and keep it only when the keyword matcher accepts
//!    the header signals or the body text
//! 4. **Batch merge**: append every accepted record in one call
//!
//! The `augment` run scans stored rows and fills the generated-text column
//! from each summary through an OpenAI-compatible API. The browsing layer,
//! the worksheet, and the generator are all capabilities constructed here
//! and handed to the pipelines; loading this binary has no side effects.

use std::time::Duration;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod api;
mod augment;
mod cli;
mod dedup;
mod error;
mod extract;
mod fetch;
mod keywords;
mod models;
mod normalize;
mod pipeline;
mod sheets;
#[cfg(test)]
mod testing;
mod utils;

use api::{ChatClient, RetryGenerate};
use cli::{AugmentArgs, Cli, Command, DiscoverArgs, SheetArgs};
use error::{Error, Result};
use fetch::{BrowserlessFetcher, HttpFetcher};
use keywords::KeywordMatcher;
use pipeline::DiscoveryConfig;
use sheets::GoogleSheets;

#[tokio::main]
async fn main() -> Result<()> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("ia_radar starting up");

    let args = Cli::parse();
    let result = match args.command {
        Command::Discover(args) => run_discover(args).await,
        Command::Augment(args) => run_augment(args).await,
        Command::Status(args) => run_status(args).await,
    };

    let elapsed = start_time.elapsed();
    match &result {
        Ok(()) => info!(
            ?elapsed,
            secs = elapsed.as_secs(),
            "execution complete"
        ),
        Err(e) => error!(?elapsed, error = %e, "execution failed"),
    }
    result
}

async fn connect_store(sheet: &SheetArgs) -> Result<GoogleSheets> {
    GoogleSheets::connect(&sheet.credentials_b64, &sheet.sheet_name, &sheet.sheet_tab).await
}

async fn run_discover(args: DiscoverArgs) -> Result<()> {
    let store = connect_store(&args.sheet).await?;
    let matcher = KeywordMatcher::new(args.keywords);
    let config = DiscoveryConfig {
        listing_url: args.listing_url,
        max_links: args.max_links,
    };

    let outcome = match args.browserless_url.as_deref() {
        Some(base) => {
            info!(endpoint = base, "using rendered fetches via browserless");
            let fetcher = BrowserlessFetcher::new(base, args.browserless_token.as_deref())?;
            pipeline::run(&fetcher, &store, &matcher, &config).await
        }
        None => {
            let fetcher = HttpFetcher::new()?;
            pipeline::run(&fetcher, &store, &matcher, &config).await
        }
    };

    match outcome {
        Ok(summary) => {
            info!(
                accepted = summary.accepted,
                skipped = summary.skipped,
                "discovery complete"
            );
            Ok(())
        }
        Err(Error::Merge { records, source }) => {
            error!(
                unwritten = records.len(),
                error = %source,
                "batch merge failed; listing the records that were not confirmed written"
            );
            for record in &records {
                error!(link = %record.link, title = %record.title, "not written");
            }
            Err(Error::Merge { records, source })
        }
        Err(e) => Err(e),
    }
}

async fn run_augment(args: AugmentArgs) -> Result<()> {
    let store = connect_store(&args.sheet).await?;
    let client = ChatClient::new(&args.api_key, &args.model, &args.api_base)?;
    let generator = RetryGenerate::new(client, 5, Duration::from_secs(1));

    let summary = augment::run(&store, &generator, args.min_summary_len).await?;
    info!(
        processed = summary.processed,
        skipped = summary.skipped,
        "augmentation complete"
    );
    Ok(())
}

async fn run_status(args: SheetArgs) -> Result<()> {
    let store = connect_store(&args).await?;
    let status = augment::table_status(&store).await?;
    info!(
        total = status.total,
        with_summary = status.with_summary,
        with_generated = status.with_generated,
        ready = status.ready,
        "worksheet status"
    );
    Ok(())
}
