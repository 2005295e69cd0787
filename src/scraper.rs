//! Fetching and text extraction for a single link.

use std::error::Error as _;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, ClientBuilder};
use scraper::{Html, Node};
use tracing::debug;
use url::Url;

use crate::error::ScrapeError;

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";

/// Elements whose text never reaches the extracted output.
const SKIPPED_ELEMENTS: &[&str] = &["script", "style", "noscript", "template"];

/// A successful (2xx) response. `url` is where the request ended up after redirects.
#[derive(Debug, Clone)]
pub struct FetchedPage {
    pub url: String,
    pub status: u16,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

/// Retrieves one URL. Implementations make exactly one attempt.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, url: &Url, timeout: Duration) -> Result<FetchedPage, ScrapeError>;
}

/// Parses a link as an absolute http(s) URL.
pub fn validate_url(link: &str) -> Result<Url, ScrapeError> {
    let url = Url::parse(link.trim())
        .map_err(|e| ScrapeError::InvalidUrl(format!("{}: {}", link, e)))?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(ScrapeError::InvalidUrl(format!(
            "{}: unsupported scheme '{}'",
            link,
            url.scheme()
        )));
    }
    if url.host_str().map_or(true, str::is_empty) {
        return Err(ScrapeError::InvalidUrl(format!("{}: missing host", link)));
    }

    Ok(url)
}

/// `Fetcher` backed by a shared reqwest client so connections are reused.
#[derive(Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new() -> Result<Self, ScrapeError> {
        let client = ClientBuilder::new()
            .user_agent(USER_AGENT)
            .redirect(reqwest::redirect::Policy::limited(10))
            .pool_max_idle_per_host(10)
            .build()
            .map_err(|e| ScrapeError::Transport(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { client })
    }

    async fn fetch_inner(&self, url: &Url, timeout: Duration) -> Result<FetchedPage, ScrapeError> {
        let response = self
            .client
            .get(url.clone())
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| classify_reqwest_error(e, timeout))?;

        let status = response.status();
        let final_url = response.url().to_string();
        if !status.is_success() {
            return Err(ScrapeError::HttpStatus(status.as_u16()));
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let body = response
            .bytes()
            .await
            .map_err(|e| classify_reqwest_error(e, timeout))?;

        Ok(FetchedPage {
            url: final_url,
            status: status.as_u16(),
            content_type,
            body: body.to_vec(),
        })
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &Url, timeout: Duration) -> Result<FetchedPage, ScrapeError> {
        // The outer timeout also bounds the body read
        match tokio::time::timeout(timeout, self.fetch_inner(url, timeout)).await {
            Ok(result) => result,
            Err(_) => Err(ScrapeError::Timeout(timeout)),
        }
    }
}

fn classify_reqwest_error(err: reqwest::Error, timeout: Duration) -> ScrapeError {
    if err.is_timeout() {
        return ScrapeError::Timeout(timeout);
    }

    // reqwest's own message is terse; the useful part (DNS, refused, TLS) is in the sources
    let mut detail = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        detail.push_str(": ");
        detail.push_str(&cause.to_string());
        source = cause.source();
    }
    ScrapeError::Transport(detail)
}

/// Whether a body with this content type can be read as text.
pub fn is_textual(content_type: Option<&str>) -> bool {
    let Some(content_type) = content_type else {
        return true;
    };
    let mime = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();

    mime.is_empty()
        || mime.starts_with("text/")
        || ["html", "xml", "json", "javascript"].iter().any(|t| mime.contains(t))
}

/// Returns the body unchanged, as text.
pub fn passthrough(body: &[u8]) -> String {
    String::from_utf8_lossy(body).into_owned()
}

/// Derives readable text from a fetched body.
///
/// Markup is parsed leniently, so malformed HTML still yields best-effort
/// text. Fails only for non-textual content or when nothing readable is left.
pub fn extract_text(body: &[u8], content_type: Option<&str>) -> Result<String, ScrapeError> {
    if !is_textual(content_type) {
        return Err(ScrapeError::Extraction(format!(
            "Unsupported content type: {}",
            content_type.unwrap_or_default()
        )));
    }

    let html = String::from_utf8_lossy(body);
    let document = Html::parse_document(&html);
    let text = collapse_whitespace(&visible_text(&document));

    if text.is_empty() {
        return Err(ScrapeError::Extraction("No extractable content found".to_string()));
    }

    debug!(chars = text.len(), "Extracted text content");
    Ok(text)
}

fn visible_text(document: &Html) -> String {
    let mut result = String::new();

    for node in document.root_element().descendants() {
        let Node::Text(text) = node.value() else {
            continue;
        };
        let hidden = node.ancestors().any(|ancestor| {
            ancestor
                .value()
                .as_element()
                .is_some_and(|el| SKIPPED_ELEMENTS.contains(&el.name()))
        });
        if hidden {
            continue;
        }
        result.push_str(text);
        result.push(' ');
    }

    result
}

pub fn collapse_whitespace(text: &str) -> String {
    let mut result = String::with_capacity(text.len());

    for word in text.split_whitespace() {
        if !result.is_empty() {
            result.push(' ');
        }
        result.push_str(word);
    }

    result
}
