//! Command-line interface definitions.
//!
//! Every option can be provided as a flag or through the environment
//! variable the original deployment scripts used, so scheduled jobs keep
//! working with their existing configuration.

use clap::{Args, Parser, Subcommand};

/// Watch a marketing blog for AI-related posts and feed them into a shared
/// content spreadsheet.
///
/// # Examples
///
/// ```sh
/// # Discover new posts from the configured listing page
/// ia_radar discover --listing-url https://blog.example.com/marketing
///
/// # Fill the generated-text column for rows with a summary
/// ia_radar augment
///
/// # Report the worksheet's processing state
/// ia_radar status
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Crawl the blog listing and merge new AI-related posts into the sheet
    Discover(DiscoverArgs),
    /// Generate text for rows that have a summary and an empty output cell
    Augment(AugmentArgs),
    /// Print a read-only report of the sheet's processing state
    Status(SheetArgs),
}

/// Options selecting the persisted worksheet.
#[derive(Args, Debug, Clone)]
pub struct SheetArgs {
    /// Base64-encoded service-account credentials JSON
    #[arg(long, env = "GSHEETS_KEY_B64", hide_env_values = true)]
    pub credentials_b64: String,

    /// Spreadsheet name as shown in Drive
    #[arg(long, env = "SHEET_NAME", default_value = "HubspotIA")]
    pub sheet_name: String,

    /// Worksheet tab holding the article rows
    #[arg(long, env = "SHEET_TAB", default_value = "dados")]
    pub sheet_tab: String,
}

#[derive(Args, Debug)]
pub struct DiscoverArgs {
    #[command(flatten)]
    pub sheet: SheetArgs,

    /// Blog listing URL to crawl for candidate links
    #[arg(long, env = "BLOG_URL")]
    pub listing_url: String,

    /// Comma-separated keyword phrases, replacing the built-in set
    #[arg(long, env = "KEYWORDS", value_delimiter = ',')]
    pub keywords: Option<Vec<String>>,

    /// Maximum candidate links processed per run
    #[arg(long, env = "MAX_LINKS", default_value_t = crate::pipeline::DEFAULT_MAX_LINKS)]
    pub max_links: usize,

    /// Browserless endpoint for rendered fetches; plain HTTP when absent
    #[arg(long, env = "BROWSERLESS_URL")]
    pub browserless_url: Option<String>,

    /// Token for the Browserless endpoint
    #[arg(long, env = "BROWSERLESS_TOKEN", hide_env_values = true)]
    pub browserless_token: Option<String>,
}

#[derive(Args, Debug)]
pub struct AugmentArgs {
    #[command(flatten)]
    pub sheet: SheetArgs,

    /// API key for the OpenAI-compatible generation endpoint
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    pub api_key: String,

    /// Model requested from the generation endpoint
    #[arg(long, env = "MODEL", default_value = "gpt-4o-mini")]
    pub model: String,

    /// Base URL of the generation endpoint
    #[arg(long, env = "OPENAI_API_BASE", default_value = "https://api.openai.com/v1")]
    pub api_base: String,

    /// Minimum summary length (in characters) eligible for generation
    #[arg(long, default_value_t = 50)]
    pub min_summary_len: usize,
}
