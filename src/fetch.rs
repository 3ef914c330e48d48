//! Page fetching: the scrape collaborator seam and an HTTP implementation.
//!
//! The orchestrator only needs a title, a meta description and the visible
//! body text of one page. `HttpPageFetcher` gets them with a plain GET and a
//! few regular expressions; a headless browser can be plugged in through
//! [`PageFetcher`] instead.

use crate::errors::FetchError;
use async_trait::async_trait;
use audit_common::ScrapedContent;
use regex::Regex;
use std::sync::LazyLock;
use std::time::Duration;
use tracing::{debug, warn};

/// Default fetch timeout, in seconds.
pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 30;

const USER_AGENT: &str = concat!("site-audit/", env!("CARGO_PKG_VERSION"));

static TITLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<title[^>]*>(.*?)</title\s*>").expect("valid regex"));
static META_TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<meta\s[^>]*>").expect("valid regex"));
static META_NAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)\bname\s*=\s*["']?description["']?"#).expect("valid regex")
});
static META_CONTENT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)\bcontent\s*=\s*(?:"([^"]*)"|'([^']*)')"#).expect("valid regex")
});
static BODY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<body[^>]*>(.*)</body\s*>").expect("valid regex"));
static INVISIBLE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<!--.*?-->|<script\b.*?</script\s*>|<style\b.*?</style\s*>|<noscript\b.*?</noscript\s*>|<template\b.*?</template\s*>")
        .expect("valid regex")
});
static TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<[^>]*>").expect("valid regex"));

/// What the scrape collaborator returns for one page.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PageSnapshot {
    pub url: String,
    pub title: String,
    pub meta_description: String,
    /// Visible text of the page body, untruncated.
    pub body_text: String,
}

impl PageSnapshot {
    /// Extract a snapshot from raw HTML.
    pub fn from_html(url: &str, html: &str) -> Self {
        let title = TITLE_RE
            .captures(html)
            .map(|c| clean_text(&c[1]))
            .unwrap_or_default();

        let meta_description = META_TAG_RE
            .find_iter(html)
            .map(|m| m.as_str())
            .find(|tag| META_NAME_RE.is_match(tag))
            .and_then(|tag| META_CONTENT_RE.captures(tag))
            .and_then(|c| c.get(1).or_else(|| c.get(2)))
            .map(|m| clean_text(m.as_str()))
            .unwrap_or_default();

        let body = BODY_RE
            .captures(html)
            .and_then(|c| c.get(1))
            .map_or(html, |m| m.as_str());
        let visible = INVISIBLE_RE.replace_all(body, " ");
        let body_text = clean_text(&TAG_RE.replace_all(&visible, " "));

        Self {
            url: url.to_string(),
            title,
            meta_description,
            body_text,
        }
    }

    /// Convert into the read-only content shared by every agent.
    pub fn into_content(self, preview_chars: usize) -> ScrapedContent {
        ScrapedContent::new(
            self.url,
            self.title,
            self.meta_description,
            &self.body_text,
            preview_chars,
        )
    }
}

/// The external scrape collaborator.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &str, timeout: Duration) -> Result<PageSnapshot, FetchError>;
}

/// Fetches pages over HTTP with reqwest.
#[derive(Debug, Clone)]
pub struct HttpPageFetcher {
    client: reqwest::Client,
}

impl HttpPageFetcher {
    pub fn new() -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| FetchError::Other(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl PageFetcher for HttpPageFetcher {
    async fn fetch(&self, url: &str, timeout: Duration) -> Result<PageSnapshot, FetchError> {
        debug!(url, timeout_secs = timeout.as_secs(), "Fetching page");

        let response = self
            .client
            .get(url)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| classify_reqwest_error(url, timeout, &e))?;

        let status = response.status();
        if !status.is_success() {
            warn!(url, %status, "Page fetch returned error status");
            return Err(FetchError::NavigationFailed {
                url: url.to_string(),
                message: format!("HTTP {}", status),
            });
        }

        let html = response
            .text()
            .await
            .map_err(|e| classify_reqwest_error(url, timeout, &e))?;

        let snapshot = PageSnapshot::from_html(url, &html);
        debug!(
            url,
            title = %snapshot.title,
            body_chars = snapshot.body_text.chars().count(),
            "Fetched page"
        );
        Ok(snapshot)
    }
}

fn classify_reqwest_error(url: &str, timeout: Duration, err: &reqwest::Error) -> FetchError {
    if err.is_timeout() {
        FetchError::Timeout {
            url: url.to_string(),
            secs: timeout.as_secs(),
        }
    } else if err.is_connect() || err.is_builder() || err.is_redirect() || err.is_request() {
        FetchError::NavigationFailed {
            url: url.to_string(),
            message: err.to_string(),
        }
    } else {
        FetchError::Other(err.to_string())
    }
}

/// Decode the common entities and collapse whitespace.
fn clean_text(raw: &str) -> String {
    let decoded = raw
        .replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&apos;", "'")
        .replace("&amp;", "&");
    decoded.split_whitespace().collect::<Vec<_>>().join(" ")
}
