//! What the signal client reads from the page at startup.

use super::{CSRF_COOKIE, DEFAULT_SOURCE};
use percent_encoding::percent_decode_str;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Identifier of the job the page is about, read once from the markup.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrackedItem(String);

impl TrackedItem {
    /// Wrap a markup attribute value as-is. Empty or whitespace values mean no item.
    pub fn from_attribute(value: Option<&str>) -> Option<Self> {
        value
            .filter(|v| !v.trim().is_empty())
            .map(|v| TrackedItem(v.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TrackedItem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Error)]
pub enum PageError {
    #[error("Invalid page URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },
}

/// Immutable view of the host page for its whole lifetime.
#[derive(Debug, Clone)]
pub struct PageContext {
    tracked_item: Option<TrackedItem>,
    url: Url,
    cookie_header: String,
    default_source: String,
}

impl PageContext {
    /// Build a context from the page URL, its cookie header and the tracked item attribute.
    pub fn new(
        url: &str,
        cookie_header: impl Into<String>,
        tracked_item: Option<TrackedItem>,
    ) -> Result<Self, PageError> {
        let url = Url::parse(url).map_err(|e| PageError::InvalidUrl {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            tracked_item,
            url,
            cookie_header: cookie_header.into(),
            default_source: DEFAULT_SOURCE.to_string(),
        })
    }

    /// Override the label used when the URL has no `source` parameter.
    pub fn with_default_source(mut self, source: impl Into<String>) -> Self {
        self.default_source = source.into();
        self
    }

    pub fn tracked_item(&self) -> Option<&TrackedItem> {
        self.tracked_item.as_ref()
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Traffic source label from the `source` query parameter.
    pub fn source(&self) -> String {
        self.url
            .query_pairs()
            .find(|(key, _)| key == "source")
            .map(|(_, value)| value.into_owned())
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| self.default_source.clone())
    }

    /// Value of the named cookie, percent-decoded. First match wins.
    pub fn cookie(&self, name: &str) -> Option<String> {
        self.cookie_header
            .split(';')
            .map(str::trim)
            .find_map(|pair| pair.strip_prefix(name)?.strip_prefix('='))
            .map(|value| percent_decode_str(value).decode_utf8_lossy().into_owned())
    }

    /// Cross-site request forgery token, if the page has one.
    pub fn csrf_token(&self) -> Option<String> {
        self.cookie(CSRF_COOKIE)
    }
}
