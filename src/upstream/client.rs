//! HTTP client for the Ollama API (`/api/tags`, `/api/generate`).

use std::sync::Arc;
use std::time::Duration;

use futures::TryStreamExt;
use tokio_util::io::StreamReader;
use tracing::{debug, warn};

use crate::config::UpstreamConfig;
use crate::error::UpstreamError;
use crate::metrics::{GatewayMetrics, Outcome};
use crate::upstream::decode::{fragments, Fragments};
use crate::upstream::types::{ModelListing, UpstreamPayload};

/// Cheap to clone; every clone shares one connection pool.
#[derive(Clone)]
pub struct OllamaClient {
    http: reqwest::Client,
    base_url: String,
    read_timeout: Duration,
    metrics: Arc<GatewayMetrics>,
}

impl OllamaClient {
    pub fn new(config: &UpstreamConfig, metrics: Arc<GatewayMetrics>) -> Result<Self, UpstreamError> {
        let http = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout())
            .build()?;
        Ok(Self {
            http,
            base_url: config.url.trim_end_matches('/').to_string(),
            read_timeout: config.read_timeout(),
            metrics,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Fetch the installed models.
    ///
    /// Every failure, timeouts included, is reported as unavailability.
    pub async fn list_models(&self, timeout: Duration) -> Result<ModelListing, UpstreamError> {
        let result = self.fetch_tags(timeout).await;
        let outcome = if result.is_ok() { Outcome::Ok } else { Outcome::Error };
        self.metrics.record_request("tags", outcome);
        result
    }

    async fn fetch_tags(&self, timeout: Duration) -> Result<ModelListing, UpstreamError> {
        let url = format!("{}/api/tags", self.base_url);
        let response = self.http.get(&url).timeout(timeout).send().await?;
        let response = check_status(response).await?;
        let bytes = response.bytes().await?;
        let raw: serde_json::Value = serde_json::from_slice(&bytes)?;
        Ok(ModelListing::from_raw(raw))
    }

    /// Start a streamed generation and return its fragments.
    ///
    /// Resolves once response headers arrive; the body is read lazily by the
    /// returned stream. Dropping the stream closes the upstream connection.
    pub async fn generate(&self, payload: &UpstreamPayload) -> Result<Fragments, UpstreamError> {
        let url = format!("{}/api/generate", self.base_url);
        debug!(url = %url, model = %payload.model, "Calling upstream generate");

        let request = self.http.post(&url).json(payload);
        let start = async move {
            let response = request.send().await.map_err(UpstreamError::from_request)?;
            check_status(response).await
        };
        let result = match tokio::time::timeout(self.read_timeout, start).await {
            Err(_) => Err(UpstreamError::Timeout),
            Ok(result) => result,
        };

        let response = match result {
            Ok(response) => {
                self.metrics.record_request("generate", Outcome::Ok);
                response
            }
            Err(e) => {
                let outcome = if e.is_timeout() { Outcome::Timeout } else { Outcome::Error };
                self.metrics.record_request("generate", outcome);
                return Err(e);
            }
        };

        let body = response.bytes_stream().map_err(std::io::Error::other);
        let reader = StreamReader::new(Box::pin(body));
        Ok(fragments(reader, self.read_timeout, self.metrics.clone()))
    }
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, UpstreamError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    warn!(status = %status, body = %body, "Upstream returned an error status");
    Err(UpstreamError::Status { status, body })
}
