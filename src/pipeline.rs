//! Discovery pipeline: listing traversal, per-link filtering, batched merge.
//!
//! One run walks a fixed sequence of states: fetch the listing page,
//! extract candidate links, then for each surviving link fetch the article,
//! extract its fields, and filter by keyword relevance; accepted records
//! are merged into the worksheet with a single batched append. The run is
//! strictly sequential, which bounds load on the target site and keeps the
//! known-set free of concurrent writers.
//!
//! Failure policy per state: the listing fetch gets one relaxed-readiness
//! retry and aborts the run on a second failure; a per-article fetch gets
//! one shorter relaxed retry and then counts as skipped; extraction never
//! fails; a failed batch merge returns the assembled records together with
//! the error so nothing is lost silently.

use std::time::Duration;

use chrono::Utc;
use itertools::Itertools;
use tracing::{debug, info, instrument, warn};
use url::Url;

use crate::dedup::KnownSet;
use crate::error::{Error, Result};
use crate::extract::extract_article;
use crate::fetch::{PageFetcher, Readiness, RenderedPage};
use crate::keywords::KeywordMatcher;
use crate::models::{ArticleRecord, COL_LINK, ColumnMap, RunSummary};
use crate::normalize::canonical_url;
use crate::sheets::SheetStore;

/// Navigation timeout for the listing and the first article attempt.
const FETCH_TIMEOUT: Duration = Duration::from_secs(45);

/// Shorter timeout for the relaxed per-article retry.
const RETRY_TIMEOUT: Duration = Duration::from_secs(20);

/// Default cap on candidate links per run.
pub const DEFAULT_MAX_LINKS: usize = 20;

/// Anchor patterns that identify article links on a blog listing, tried in
/// order. The markup of the target site drifts over time; a selector that
/// stops matching just finds fewer links instead of breaking the run.
const LINK_SELECTORS: [&str; 4] = [
    "article a[href]",
    "h2 a[href], h3 a[href]",
    "a[href*='/blog/']",
    ".blog-post-card a[href]",
];

#[derive(Debug, Clone)]
pub struct DiscoveryConfig {
    pub listing_url: String,
    pub max_links: usize,
}

/// Run one discovery pass and merge accepted records into the store.
///
/// Returns the run counters. On a failed batch merge the error carries
/// every record that was not confirmed written.
#[instrument(level = "info", skip_all, fields(listing = %config.listing_url))]
pub async fn run<F, S>(
    fetcher: &F,
    store: &S,
    matcher: &KeywordMatcher,
    config: &DiscoveryConfig,
) -> Result<RunSummary>
where
    F: PageFetcher + ?Sized,
    S: SheetStore + ?Sized,
{
    // Listing fetch, with one relaxed retry before giving up on the run.
    let listing = match fetcher
        .fetch(&config.listing_url, Readiness::NetworkIdle, FETCH_TIMEOUT)
        .await
    {
        Ok(page) => page,
        Err(first) => {
            warn!(error = %first, "listing fetch failed; retrying with relaxed readiness");
            fetcher
                .fetch(&config.listing_url, Readiness::ContentLoaded, FETCH_TIMEOUT)
                .await?
        }
    };

    // Column contract, self-healing missing columns before any merge.
    let mut header = store.read_header().await?;
    let mut columns = ColumnMap::from_header(&header);
    let missing = columns.missing_expected();
    if !missing.is_empty() {
        info!(?missing, "appending missing columns to header");
        header.extend(missing.iter().map(|name| name.to_string()));
        store.update_header(header.clone()).await?;
        columns = ColumnMap::from_header(&header);
    }
    let link_col = columns
        .get(COL_LINK)
        .ok_or_else(|| Error::Config(format!("column '{COL_LINK}' missing after header update")))?;

    // Known identities from the current table snapshot.
    let rows = store.read_all_rows().await?;
    let mut known = KnownSet::build(&rows, link_col);
    info!(existing = known.len(), "dedup index built");

    // Candidate links from the listing.
    let links = extract_listing_links(&listing, config.max_links);
    info!(count = links.len(), "candidate links extracted");

    let mut accepted: Vec<ArticleRecord> = Vec::new();
    let mut skipped = 0usize;

    for link in &links {
        if known.contains(link.as_str()) {
            debug!(%link, "already known; skipping");
            skipped += 1;
            continue;
        }

        let Some(page) = fetch_article(fetcher, link.as_str()).await else {
            skipped += 1;
            continue;
        };

        let extracted = extract_article(&page);
        if !matcher.matches(&extracted.header_text) && !matcher.matches(&extracted.body_text) {
            debug!(%link, "no keyword match; skipping");
            skipped += 1;
            continue;
        }

        // Record the identity immediately so a later link in this run that
        // canonicalizes the same way is rejected as already known.
        known.record(link.as_str());
        info!(%link, title = %extracted.title, "article accepted");
        accepted.push(ArticleRecord {
            publish_date: extracted.publish_date,
            title: extracted.title,
            link: link.to_string(),
            summary: extracted.summary,
            generated_text: String::new(),
            captured_at: Utc::now(),
        });
    }

    let summary = RunSummary {
        accepted: accepted.len(),
        skipped,
    };

    if !accepted.is_empty() {
        let batch: Vec<Vec<String>> = accepted.iter().map(|r| r.to_row(&columns)).collect();
        if let Err(e) = store.append_rows(batch).await {
            return Err(Error::Merge {
                records: accepted,
                source: Box::new(e),
            });
        }
        info!(count = summary.accepted, "batch merged");
    }

    info!(
        accepted = summary.accepted,
        skipped = summary.skipped,
        "discovery run finished"
    );
    Ok(summary)
}

/// Fetch one article page; a failure gets one shorter relaxed retry, a
/// second failure means the link is skipped.
async fn fetch_article<F>(fetcher: &F, url: &str) -> Option<RenderedPage>
where
    F: PageFetcher + ?Sized,
{
    match fetcher.fetch(url, Readiness::NetworkIdle, FETCH_TIMEOUT).await {
        Ok(page) => Some(page),
        Err(first) => {
            warn!(%url, error = %first, "article fetch failed; retrying with relaxed readiness");
            match fetcher
                .fetch(url, Readiness::ContentLoaded, RETRY_TIMEOUT)
                .await
            {
                Ok(page) => Some(page),
                Err(second) => {
                    warn!(%url, error = %second, "article fetch failed twice; skipping");
                    None
                }
            }
        }
    }
}

/// Collect candidate article links from a listing page.
///
/// Hrefs from each selector strategy are resolved against the listing's own
/// URL, same-page anchors and off-site hosts are discarded, duplicates are
/// collapsed by canonical URL keeping first occurrence, and the result is
/// capped.
pub fn extract_listing_links(listing: &RenderedPage, cap: usize) -> Vec<Url> {
    let Some(listing_host) = listing.url().host_str().map(str::to_string) else {
        return Vec::new();
    };

    let mut found: Vec<Url> = Vec::new();
    for selector in LINK_SELECTORS {
        for href in listing.attrs(selector, "href") {
            if href.starts_with('#') {
                continue;
            }
            let Ok(resolved) = listing.url().join(&href) else {
                debug!(href = %href, "unresolvable href; skipping");
                continue;
            };
            if !matches!(resolved.scheme(), "http" | "https") {
                continue;
            }
            let Some(host) = resolved.host_str() else {
                continue;
            };
            if !same_site(host, &listing_host) {
                continue;
            }
            found.push(resolved);
        }
    }

    found
        .into_iter()
        .unique_by(|url| canonical_url(url.as_str()))
        .take(cap)
        .collect()
}

/// Hosts belong to the same site when they are equal after dropping a
/// leading `www.`, or when one is a subdomain of the other (the listing
/// often lives on `blog.example.com` while articles link to
/// `www.example.com` paths and vice versa).
fn same_site(host: &str, listing_host: &str) -> bool {
    let host = host.strip_prefix("www.").unwrap_or(host);
    let listing = listing_host.strip_prefix("www.").unwrap_or(listing_host);
    host == listing
        || host.ends_with(&format!(".{listing}"))
        || listing.ends_with(&format!(".{host}"))
}
