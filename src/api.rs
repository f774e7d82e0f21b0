//! HTTP surface of the tracking backend.
//!
//! Both endpoints live on the page's own origin:
//!
//! - `POST /jobs/api/track-view/` receives dwell measurements (no response read)
//! - `POST /jobs/api/track-preference/` receives preference signals and
//!   answers with `{ "success": bool }`

use crate::core::{PreferenceAck, PreferenceEvent, PreferenceSink};
use crate::page::PageContext;
use reqwest::header::CONTENT_TYPE;
use reqwest::Url;
use std::time::Duration;
use thiserror::Error;

pub const TRACK_VIEW_PATH: &str = "/jobs/api/track-view/";
pub const TRACK_PREFERENCE_PATH: &str = "/jobs/api/track-preference/";

/// Header carrying the cross-site request forgery token.
pub const CSRF_HEADER: &str = "X-CSRFToken";

/// Endpoint locations for one origin.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    origin: Url,
}

impl ApiConfig {
    /// Endpoints on the same origin as the page.
    pub fn for_page(context: &PageContext) -> Self {
        Self {
            origin: context.url().clone(),
        }
    }

    pub fn track_view_url(&self) -> Url {
        self.endpoint(TRACK_VIEW_PATH)
    }

    pub fn track_preference_url(&self) -> Url {
        self.endpoint(TRACK_PREFERENCE_PATH)
    }

    fn endpoint(&self, path: &str) -> Url {
        let mut url = self.origin.clone();
        url.set_path(path);
        url.set_query(None);
        url.set_fragment(None);
        url
    }
}

/// Backend client error types.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("API network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("Malformed API response: {0}")]
    Malformed(String),
}

/// Client for the acknowledged preference endpoint.
#[derive(Debug, Clone)]
pub struct PreferenceClient {
    client: reqwest::Client,
    endpoint: Url,
    csrf_token: Option<String>,
}

impl PreferenceClient {
    pub fn new(
        api: &ApiConfig,
        csrf_token: Option<String>,
        timeout: Duration,
    ) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            endpoint: api.track_preference_url(),
            csrf_token,
        })
    }

    /// Send one preference and parse the acknowledgment.
    ///
    /// The body is parsed whatever the status code: error bodies without a
    /// `success` field read as a negative acknowledgment.
    pub async fn track_preference(&self, event: &PreferenceEvent) -> Result<PreferenceAck, ApiError> {
        let mut request = self
            .client
            .post(self.endpoint.clone())
            .header(CONTENT_TYPE, "application/json")
            .json(event);
        if let Some(token) = &self.csrf_token {
            request = request.header(CSRF_HEADER, token);
        }

        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;

        serde_json::from_str(&body)
            .map_err(|e| ApiError::Malformed(format!("status {status}: {e}")))
    }
}

impl PreferenceSink for PreferenceClient {
    async fn send(&self, event: &PreferenceEvent) -> Result<PreferenceAck, ApiError> {
        self.track_preference(event).await
    }
}
