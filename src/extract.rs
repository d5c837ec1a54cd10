//! Field extraction from a fetched article page.
//!
//! Everything here is best-effort over markup the target site is free to
//! change: each field falls through an ordered list of extraction
//! strategies and lands on a default instead of failing, so markup drift
//! degrades to fewer fields found rather than a crashed run.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde_json::Value;

use crate::fetch::RenderedPage;
use crate::utils::truncate_chars;

/// Character budget for stored summaries, ellipsis marker included.
pub const SUMMARY_BUDGET: usize = 600;

/// Body blocks that feed the stored summary.
const SUMMARY_BLOCKS: usize = 8;

/// Body blocks that feed keyword matching.
const MATCH_BLOCKS: usize = 60;

/// Meta tags commonly carrying the publish timestamp, tried in order.
const DATE_META_SELECTORS: [&str; 4] = [
    "meta[property='article:published_time']",
    "meta[name='article:published_time']",
    "meta[itemprop='datePublished']",
    "meta[name='date']",
];

/// JSON-LD `@type` values treated as articles.
const ARTICLE_TYPES: [&str; 4] = ["Article", "NewsArticle", "BlogPosting", "TechArticle"];

/// The fields extracted from one article page, plus the two text blobs the
/// keyword matcher is run against.
#[derive(Debug)]
pub struct ExtractedArticle {
    pub publish_date: NaiveDate,
    pub title: String,
    pub summary: String,
    /// Title metadata, first heading, and meta description concatenated.
    pub header_text: String,
    /// First body blocks concatenated, for matching only.
    pub body_text: String,
}

/// Extract publish date, title, and summary from a fetched page.
///
/// Never fails; every parsing problem falls through to the next candidate
/// or a default (today's UTC date, the link as title, an empty summary).
pub fn extract_article(page: &RenderedPage) -> ExtractedArticle {
    let heading = page.first_text("h1").unwrap_or_default();
    let doc_title = page.first_text("title").unwrap_or_default();
    let meta_desc = meta_description(page).unwrap_or_default();
    let blocks = body_blocks(page);

    let title = if !heading.trim().is_empty() {
        heading.trim().to_string()
    } else if !doc_title.trim().is_empty() {
        doc_title.trim().to_string()
    } else {
        page.url().to_string()
    };

    let summary = if !meta_desc.is_empty() {
        truncate_chars(&meta_desc, SUMMARY_BUDGET)
    } else {
        let joined = blocks
            .iter()
            .take(SUMMARY_BLOCKS)
            .cloned()
            .collect::<Vec<_>>()
            .join(" ");
        truncate_chars(&joined, SUMMARY_BUDGET)
    };

    let publish_date = publish_date(page).unwrap_or_else(|| Utc::now().date_naive());

    ExtractedArticle {
        publish_date,
        title,
        summary,
        header_text: format!("{doc_title} {heading} {meta_desc}"),
        body_text: blocks.join("\n"),
    }
}

fn meta_description(page: &RenderedPage) -> Option<String> {
    page.attr("meta[name='description']", "content")
        .or_else(|| page.attr("meta[property='og:description']", "content"))
}

fn body_blocks(page: &RenderedPage) -> Vec<String> {
    let blocks = page.texts("article p, article li", MATCH_BLOCKS);
    if !blocks.is_empty() {
        return blocks;
    }
    page.texts("main p, main li", MATCH_BLOCKS)
}

/// Publish-date candidates in preference order: meta tags, a
/// machine-readable `<time>` element, then JSON-LD article blocks.
fn publish_date(page: &RenderedPage) -> Option<NaiveDate> {
    for selector in DATE_META_SELECTORS {
        if let Some(date) = page.attr(selector, "content").as_deref().and_then(parse_datish) {
            return Some(date);
        }
    }

    if let Some(date) = page.attr("time[datetime]", "datetime").as_deref().and_then(parse_datish) {
        return Some(date);
    }

    for script in page.texts("script[type='application/ld+json']", usize::MAX) {
        if let Ok(json) = serde_json::from_str::<Value>(script.trim()) {
            if let Some(date) = jsonld_article_date(&json) {
                return Some(date);
            }
        }
    }

    None
}

/// Walk a JSON-LD value (including top-level arrays and `@graph` wrappers)
/// looking for an article-like node with a parsable `datePublished` or
/// `dateCreated`.
fn jsonld_article_date(value: &Value) -> Option<NaiveDate> {
    match value {
        Value::Array(items) => items.iter().find_map(jsonld_article_date),
        Value::Object(obj) => {
            if let Some(graph) = obj.get("@graph") {
                if let Some(date) = jsonld_article_date(graph) {
                    return Some(date);
                }
            }
            if !obj.get("@type").is_some_and(is_article_type) {
                return None;
            }
            ["datePublished", "dateCreated"].iter().find_map(|key| {
                obj.get(*key)
                    .and_then(Value::as_str)
                    .and_then(parse_datish)
            })
        }
        _ => None,
    }
}

fn is_article_type(declared: &Value) -> bool {
    match declared {
        Value::String(s) => ARTICLE_TYPES.iter().any(|t| s.eq_ignore_ascii_case(t)),
        Value::Array(items) => items.iter().any(is_article_type),
        _ => false,
    }
}

/// Parse an ISO-8601-ish timestamp down to a calendar date. Tolerates a
/// trailing `Z`, a space separator, and bare dates.
fn parse_datish(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.date_naive());
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
        return Some(dt.date());
    }
    raw.get(..10)
        .and_then(|prefix| NaiveDate::parse_from_str(prefix, "%Y-%m-%d").ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use url::Url;

    fn page(html: &str) -> RenderedPage {
        RenderedPage::new(
            Url::parse("https://blog.example.com/blog/post").unwrap(),
            html.to_string(),
        )
    }

    #[test]
    fn test_title_prefers_heading_over_title_tag() {
        let extracted = extract_article(&page(
            "<title>Meta Title</title><h1>Body Heading</h1>",
        ));
        assert_eq!(extracted.title, "Body Heading");
    }

    #[test]
    fn test_title_falls_back_to_title_tag_then_link() {
        let extracted = extract_article(&page("<title>Meta Title</title>"));
        assert_eq!(extracted.title, "Meta Title");

        let extracted = extract_article(&page("<p>no headings here</p>"));
        assert_eq!(extracted.title, "https://blog.example.com/blog/post");
    }

    #[test]
    fn test_date_from_meta_tag() {
        let extracted = extract_article(&page(
            r#"<meta property="article:published_time" content="2025-03-09T12:15:00Z"><h1>t</h1>"#,
        ));
        assert_eq!(
            extracted.publish_date,
            NaiveDate::from_ymd_opt(2025, 3, 9).unwrap()
        );
    }

    #[test]
    fn test_date_from_time_element() {
        let extracted = extract_article(&page(
            r#"<h1>t</h1><time datetime="2024-11-30">30 de novembro</time>"#,
        ));
        assert_eq!(
            extracted.publish_date,
            NaiveDate::from_ymd_opt(2024, 11, 30).unwrap()
        );
    }

    #[test]
    fn test_date_from_jsonld_blog_posting() {
        let html = r#"<h1>t</h1>
            <script type="application/ld+json">
            {"@context":"https://schema.org","@graph":[
              {"@type":"WebSite","name":"blog"},
              {"@type":"BlogPosting","datePublished":"2025-01-20T08:00:00-03:00"}
            ]}
            </script>"#;
        let extracted = extract_article(&page(html));
        assert_eq!(
            extracted.publish_date,
            NaiveDate::from_ymd_opt(2025, 1, 20).unwrap()
        );
    }

    #[test]
    fn test_malformed_date_candidates_fall_through() {
        let html = r#"
            <meta property="article:published_time" content="yesterday">
            <time datetime="???"></time>
            <script type="application/ld+json">{"@type":"BlogPosting","datePublished":"2023-06-01"}</script>
            <h1>t</h1>"#;
        let extracted = extract_article(&page(html));
        assert_eq!(
            extracted.publish_date,
            NaiveDate::from_ymd_opt(2023, 6, 1).unwrap()
        );
    }

    #[test]
    fn test_no_parsable_date_defaults_to_today() {
        let extracted = extract_article(&page("<h1>t</h1><p>body</p>"));
        assert_eq!(extracted.publish_date, Utc::now().date_naive());
    }

    #[test]
    fn test_summary_prefers_meta_description() {
        let extracted = extract_article(&page(
            r#"<meta name="description" content="A short description."><h1>t</h1><p>body text</p>"#,
        ));
        assert_eq!(extracted.summary, "A short description.");
    }

    #[test]
    fn test_summary_from_body_is_truncated_with_marker() {
        let paragraphs: String = (0..7)
            .map(|i| format!("<p>{}</p>", format!("paragraph {i} ").repeat(10)))
            .collect();
        let extracted = extract_article(&page(&format!("<h1>t</h1><article>{paragraphs}</article>")));
        assert!(extracted.summary.chars().count() <= SUMMARY_BUDGET);
        assert!(extracted.summary.ends_with('…'));
    }

    #[test]
    fn test_summary_empty_without_body_and_description() {
        let extracted = extract_article(&page("<div>nothing structured</div>"));
        assert_eq!(extracted.summary, "");
    }

    #[test]
    fn test_body_text_falls_back_to_main() {
        let extracted = extract_article(&page(
            "<h1>t</h1><main><p>first</p><li>second</li></main>",
        ));
        assert_eq!(extracted.body_text, "first\nsecond");
    }

    #[test]
    fn test_header_text_concatenates_signals() {
        let extracted = extract_article(&page(
            r#"<title>Doc</title><h1>Heading</h1><meta name="description" content="Desc">"#,
        ));
        assert!(extracted.header_text.contains("Doc"));
        assert!(extracted.header_text.contains("Heading"));
        assert!(extracted.header_text.contains("Desc"));
    }

    #[test]
    fn test_parse_datish_variants() {
        let expected = NaiveDate::from_ymd_opt(2025, 2, 3).unwrap();
        assert_eq!(parse_datish("2025-02-03T10:00:00Z"), Some(expected));
        assert_eq!(parse_datish("2025-02-03T10:00:00+02:00"), Some(expected));
        assert_eq!(parse_datish("2025-02-03 10:00:00"), Some(expected));
        assert_eq!(parse_datish("2025-02-03"), Some(expected));
        assert_eq!(parse_datish("03/02/2025"), None);
        assert_eq!(parse_datish(""), None);
    }
}
