use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use crate::error::SourceError;
use crate::payload::RawPayload;
use crate::source::{SourceAdapter, SourceRequest};

/// Fetches JSON from `{base_url}{endpoint}` over HTTP.
///
/// The per-request timeout bounds each attempt; retries are layered on top
/// by the fetcher.
pub struct HttpSource {
    client: Client,
    base_url: String,
    timeout: Duration,
    bearer_token: Option<String>,
}

impl HttpSource {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, SourceError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SourceError::Transport(e.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.into(),
            timeout,
            bearer_token: None,
        })
    }

    /// Send `Authorization: Bearer {token}` with every request.
    pub fn with_bearer_token(mut self, token: impl Into<String>) -> Self {
        self.bearer_token = Some(token.into());
        self
    }

    pub fn url_for(&self, endpoint: &str) -> String {
        join_url(&self.base_url, endpoint)
    }
}

fn join_url(base: &str, endpoint: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        endpoint.trim_start_matches('/')
    )
}

#[async_trait]
impl SourceAdapter for HttpSource {
    fn name(&self) -> &str {
        "http"
    }

    async fn fetch(&self, request: &SourceRequest) -> Result<RawPayload, SourceError> {
        let url = self.url_for(&request.endpoint);
        debug!(category = %request.category, %url, "GET");

        let mut builder = self.client.get(&url);
        if let Some(token) = &self.bearer_token {
            builder = builder.bearer_auth(token);
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                SourceError::Timeout(self.timeout)
            } else {
                SourceError::Transport(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Status {
                url,
                status: status.as_u16(),
            });
        }

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| SourceError::Decode(e.to_string()))?;
        Ok(RawPayload::new(request.shape, body))
    }
}
