//! Site content captured once per audit and shared read-only by every agent.

use serde::{Deserialize, Serialize};

/// Default cap on the body preview, in characters.
pub const DEFAULT_PREVIEW_CHARS: usize = 5000;

/// Title used when the fetch collaborator could not produce a page.
pub const UNAVAILABLE_TITLE: &str = "[site content unavailable]";

/// Scraped page content.
///
/// When the fetch failed the audit still runs; the content degrades to empty
/// fields with [`UNAVAILABLE_TITLE`] and records why in `unavailable_reason`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScrapedContent {
    pub url: String,
    pub title: String,
    pub meta_description: String,
    pub body_preview: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unavailable_reason: Option<String>,
}

impl ScrapedContent {
    /// Build content from a fetched page, truncating the body to `preview_chars`.
    pub fn new(
        url: impl Into<String>,
        title: impl Into<String>,
        meta_description: impl Into<String>,
        body_text: &str,
        preview_chars: usize,
    ) -> Self {
        Self {
            url: url.into(),
            title: title.into().trim().to_string(),
            meta_description: meta_description.into().trim().to_string(),
            body_preview: truncate_chars(body_text.trim(), preview_chars),
            unavailable_reason: None,
        }
    }

    /// Sentinel content for a failed fetch.
    pub fn unavailable(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            title: UNAVAILABLE_TITLE.to_string(),
            meta_description: String::new(),
            body_preview: String::new(),
            unavailable_reason: Some(reason.into()),
        }
    }

    /// Whether real site content backs this value.
    pub fn is_available(&self) -> bool {
        self.unavailable_reason.is_none()
    }
}

/// Truncate to at most `max` characters without splitting a code point.
fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((byte_idx, _)) => text[..byte_idx].to_string(),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_body_preview_is_capped() {
        let body = "a".repeat(DEFAULT_PREVIEW_CHARS + 100);
        let content = ScrapedContent::new("https://x", "T", "D", &body, DEFAULT_PREVIEW_CHARS);
        assert_eq!(content.body_preview.chars().count(), DEFAULT_PREVIEW_CHARS);
        assert!(content.is_available());
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        let content = ScrapedContent::new("https://x", "T", "D", "ščťžýáíé", 3);
        assert_eq!(content.body_preview, "ščť");
    }

    #[test]
    fn test_unavailable_sentinel() {
        let content = ScrapedContent::unavailable("https://x", "timed out");
        assert!(!content.is_available());
        assert_eq!(content.title, UNAVAILABLE_TITLE);
        assert!(content.body_preview.is_empty());
        assert_eq!(content.unavailable_reason.as_deref(), Some("timed out"));
    }
}
