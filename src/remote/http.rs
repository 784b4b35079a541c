//! HTTP implementation of [`RemoteSource`].

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use tracing::debug;
use url::Url;

use super::{normalize_response, RemoteSource};
use crate::error::{PorticoError, Result};

/// Calls `GET {base_url}/{endpoint}?{params}` and unwraps the response.
///
/// No retries. The client-level timeout bounds the whole request; a timeout
/// surfaces as [`PorticoError::Fetch`].
#[derive(Debug, Clone)]
pub struct HttpSource {
    client: Client,
    base_url: String,
}

impl HttpSource {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("portico/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| PorticoError::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }

    /// Build the request URL for an endpoint and parameter list.
    pub fn request_url(&self, endpoint: &str, params: &[(String, String)]) -> Result<Url> {
        let joined = format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            endpoint.trim_start_matches('/')
        );
        let mut url = Url::parse(&joined)
            .map_err(|e| PorticoError::Config(format!("invalid upstream URL '{joined}': {e}")))?;
        if !params.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in params {
                pairs.append_pair(key, value);
            }
        }
        Ok(url)
    }
}

#[async_trait]
impl RemoteSource for HttpSource {
    async fn fetch(&self, endpoint: &str, params: &[(String, String)]) -> Result<Value> {
        let url = self.request_url(endpoint, params)?;
        debug!(endpoint, url = %url, "Fetching from upstream");

        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(PorticoError::Fetch(format!(
                "upstream returned {status} for '{endpoint}'"
            )));
        }

        let body: Value = response.json().await?;
        if body.is_null() {
            return Err(PorticoError::Fetch(format!(
                "upstream returned an empty body for '{endpoint}'"
            )));
        }
        Ok(normalize_response(body))
    }
}

// ============================================================================
// Tests
// ============================================================================
