//! Rendered-page fetching behind a capability trait.
//!
//! The pipeline only ever asks for "the rendered page at this URL" and then
//! queries it by CSS selector, so the browsing layer stays swappable:
//! [`HttpFetcher`] does a plain GET (enough for server-rendered listings),
//! [`BrowserlessFetcher`] asks a Browserless service to run a headless
//! browser and return the rendered HTML, and tests substitute a canned
//! fetcher. One fetcher, one browsing session; pages are owned values that
//! drop on every exit path.

use std::time::Duration;

use async_trait::async_trait;
use scraper::{Html, Selector};
use url::Url;

use crate::error::{Error, Result};

/// Browser user agent sent on plain HTTP fetches.
const USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36";

/// How long to wait before a navigation counts as done.
///
/// `NetworkIdle` waits for the network to settle; `ContentLoaded` is the
/// relaxed fallback used on retry, satisfied as soon as the document content
/// is present.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    NetworkIdle,
    ContentLoaded,
}

/// A fetched page: final URL plus rendered HTML, queryable by selector.
#[derive(Debug)]
pub struct RenderedPage {
    url: Url,
    html: String,
}

impl RenderedPage {
    pub fn new(url: Url, html: String) -> Self {
        Self { url, html }
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Text of the first element matching `selector` that has any,
    /// whitespace-trimmed.
    pub fn first_text(&self, selector: &str) -> Option<String> {
        let sel = Selector::parse(selector).ok()?;
        let doc = Html::parse_document(&self.html);
        doc.select(&sel).find_map(|el| {
            let text = el.text().collect::<Vec<_>>().join(" ");
            let text = text.trim();
            (!text.is_empty()).then(|| text.to_string())
        })
    }

    /// Trimmed, non-empty texts of up to `cap` elements matching `selector`.
    pub fn texts(&self, selector: &str, cap: usize) -> Vec<String> {
        let Ok(sel) = Selector::parse(selector) else {
            return Vec::new();
        };
        let doc = Html::parse_document(&self.html);
        doc.select(&sel)
            .map(|el| el.text().collect::<Vec<_>>().join(" ").trim().to_string())
            .filter(|text| !text.is_empty())
            .take(cap)
            .collect()
    }

    /// Value of `name` on the first matching element that carries it
    /// non-blank.
    pub fn attr(&self, selector: &str, name: &str) -> Option<String> {
        let sel = Selector::parse(selector).ok()?;
        let doc = Html::parse_document(&self.html);
        doc.select(&sel).find_map(|el| {
            el.value()
                .attr(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        })
    }

    /// Values of `name` across every matching element, blanks skipped.
    pub fn attrs(&self, selector: &str, name: &str) -> Vec<String> {
        let Ok(sel) = Selector::parse(selector) else {
            return Vec::new();
        };
        let doc = Html::parse_document(&self.html);
        doc.select(&sel)
            .filter_map(|el| el.value().attr(name))
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .collect()
    }
}

/// Capability consumed by the pipeline: fetch the rendered page at a URL.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(
        &self,
        url: &str,
        readiness: Readiness,
        timeout: Duration,
    ) -> Result<RenderedPage>;
}

/// Plain HTTP fetcher. Readiness is meaningless for a single GET and is
/// ignored; the timeout bounds the whole request.
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .connect_timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(
        &self,
        url: &str,
        _readiness: Readiness,
        timeout: Duration,
    ) -> Result<RenderedPage> {
        let response = self
            .client
            .get(url)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| Error::Fetch {
                url: url.to_string(),
                reason: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Fetch {
                url: url.to_string(),
                reason: format!("status {status}"),
            });
        }

        let final_url = response.url().clone();
        let html = response.text().await.map_err(|e| Error::Fetch {
            url: url.to_string(),
            reason: e.to_string(),
        })?;
        Ok(RenderedPage::new(final_url, html))
    }
}

/// Fetcher backed by a Browserless `/content` endpoint: the service runs a
/// headless browser, navigates with the given readiness condition, and
/// returns the fully rendered HTML.
pub struct BrowserlessFetcher {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl BrowserlessFetcher {
    pub fn new(base_url: &str, token: Option<&str>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.map(String::from),
        })
    }

    fn wait_until(readiness: Readiness) -> &'static str {
        match readiness {
            Readiness::NetworkIdle => "networkidle2",
            Readiness::ContentLoaded => "domcontentloaded",
        }
    }
}

#[async_trait]
impl PageFetcher for BrowserlessFetcher {
    async fn fetch(
        &self,
        url: &str,
        readiness: Readiness,
        timeout: Duration,
    ) -> Result<RenderedPage> {
        let mut endpoint = format!("{}/content", self.base_url);
        if let Some(ref token) = self.token {
            endpoint.push_str(&format!("?token={token}"));
        }

        let body = serde_json::json!({
            "url": url,
            "gotoOptions": {
                "waitUntil": Self::wait_until(readiness),
                "timeout": timeout.as_millis() as u64,
            },
        });

        let response = self
            .client
            .post(&endpoint)
            .json(&body)
            // Leave the navigation timeout to the browser; pad the HTTP
            // request so it does not race it.
            .timeout(timeout + Duration::from_secs(5))
            .send()
            .await
            .map_err(|e| Error::Fetch {
                url: url.to_string(),
                reason: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(Error::Fetch {
                url: url.to_string(),
                reason: format!("browserless status {status}: {message}"),
            });
        }

        let html = response.text().await.map_err(|e| Error::Fetch {
            url: url.to_string(),
            reason: e.to_string(),
        })?;
        let parsed = Url::parse(url).map_err(|e| Error::Fetch {
            url: url.to_string(),
            reason: format!("invalid URL: {e}"),
        })?;
        Ok(RenderedPage::new(parsed, html))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(html: &str) -> RenderedPage {
        RenderedPage::new(
            Url::parse("https://blog.example.com/post").unwrap(),
            html.to_string(),
        )
    }

    #[test]
    fn test_first_text_skips_empty_elements() {
        let page = page("<h1>  </h1><h1>Real title</h1>");
        assert_eq!(page.first_text("h1").as_deref(), Some("Real title"));
        assert_eq!(page.first_text("h2"), None);
    }

    #[test]
    fn test_texts_caps_and_trims() {
        let page = page("<p> one </p><p></p><p>two</p><p>three</p>");
        assert_eq!(page.texts("p", 2), vec!["one", "two"]);
    }

    #[test]
    fn test_attr_takes_first_non_blank() {
        let page = page(r#"<meta name="description" content=""><meta name="description" content="desc">"#);
        assert_eq!(
            page.attr("meta[name='description']", "content").as_deref(),
            Some("desc")
        );
    }

    #[test]
    fn test_attrs_collects_all() {
        let page = page(r#"<a href="/a">x</a><a href="">y</a><a href="/b">z</a>"#);
        assert_eq!(page.attrs("a", "href"), vec!["/a", "/b"]);
    }

    #[test]
    fn test_invalid_selector_is_harmless() {
        let page = page("<p>x</p>");
        assert!(page.texts("p[", 10).is_empty());
        assert!(page.first_text("p[").is_none());
    }

    #[tokio::test]
    async fn test_browserless_maps_http_failure_to_fetch_error() {
        use wiremock::matchers::{method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/content"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let fetcher = BrowserlessFetcher::new(&server.uri(), None).unwrap();
        let err = fetcher
            .fetch(
                "https://blog.example.com",
                Readiness::NetworkIdle,
                Duration::from_secs(5),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Fetch { .. }));
    }

    #[tokio::test]
    async fn test_browserless_returns_rendered_html() {
        use wiremock::matchers::{body_partial_json, method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/content"))
            .and(body_partial_json(serde_json::json!({
                "url": "https://blog.example.com",
                "gotoOptions": { "waitUntil": "domcontentloaded" },
            })))
            .respond_with(ResponseTemplate::new(200).set_body_string("<h1>ok</h1>"))
            .mount(&server)
            .await;

        let fetcher = BrowserlessFetcher::new(&server.uri(), None).unwrap();
        let page = fetcher
            .fetch(
                "https://blog.example.com",
                Readiness::ContentLoaded,
                Duration::from_secs(5),
            )
            .await
            .unwrap();
        assert_eq!(page.first_text("h1").as_deref(), Some("ok"));
    }
}
