//! remove.bg HTTP client.

use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use reqwest::Client;
use tracing::{debug, warn};

use crate::error::{RemovalError, RemovalResult};
use crate::types::RemoveBgRequest;

const DEFAULT_BASE_URL: &str = "https://api.remove.bg";
const RETRY_BASE_DELAY_MS: u64 = 500;
const RETRY_MAX_DELAY_MS: u64 = 10_000;

/// Exponential backoff before retry `attempt`, capped at [`RETRY_MAX_DELAY_MS`].
fn retry_delay(attempt: u32) -> Duration {
    let ms = RETRY_BASE_DELAY_MS
        .saturating_mul(2u64.saturating_pow(attempt))
        .min(RETRY_MAX_DELAY_MS);
    Duration::from_millis(ms)
}

/// Removes the background of a still image, returning the cut-out image bytes.
#[async_trait]
pub trait BackgroundRemover: Send + Sync {
    async fn remove_background(&self, image: &[u8]) -> RemovalResult<Vec<u8>>;
}

/// Configuration for the remove.bg client.
#[derive(Debug, Clone)]
pub struct RemoveBgConfig {
    /// API base URL
    pub base_url: String,
    /// API key; requests fail with [`RemovalError::MissingApiKey`] when unset
    pub api_key: Option<String>,
    /// Request timeout
    pub timeout: Duration,
    /// Max retries for 429/5xx and network errors
    pub max_retries: u32,
}

impl Default for RemoveBgConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: None,
            timeout: Duration::from_secs(60),
            max_retries: 1,
        }
    }
}

impl RemoveBgConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            base_url: std::env::var("REMOVE_BG_URL")
                .unwrap_or_else(|_| DEFAULT_BASE_URL.to_string()),
            api_key: std::env::var("REMOVE_BG_API_KEY")
                .ok()
                .filter(|k| !k.trim().is_empty()),
            timeout: Duration::from_secs(
                std::env::var("REMOVE_BG_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(60),
            ),
            max_retries: std::env::var("REMOVE_BG_RETRIES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(1),
        }
    }
}

/// Client for the remove.bg API.
pub struct RemoveBgClient {
    http: Client,
    config: RemoveBgConfig,
}

impl RemoveBgClient {
    /// Create a new client.
    pub fn new(config: RemoveBgConfig) -> RemovalResult<Self> {
        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(RemovalError::Network)?;

        Ok(Self { http, config })
    }

    /// Create from environment variables.
    pub fn from_env() -> RemovalResult<Self> {
        Self::new(RemoveBgConfig::from_env())
    }

    pub fn is_configured(&self) -> bool {
        self.config.api_key.is_some()
    }

    async fn request_once(
        &self,
        url: &str,
        api_key: &str,
        body: &RemoveBgRequest,
    ) -> RemovalResult<Vec<u8>> {
        let response = self
            .http
            .post(url)
            .header("X-Api-Key", api_key)
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RemovalError::status(status.as_u16(), body));
        }

        let bytes = response.bytes().await?;
        if bytes.is_empty() {
            return Err(RemovalError::EmptyResponse);
        }
        Ok(bytes.to_vec())
    }

    /// Execute with retry logic.
    async fn with_retry<F, Fut, T>(&self, operation: F) -> RemovalResult<T>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = RemovalResult<T>>,
    {
        let mut attempt = 0;
        loop {
            match operation().await {
                Ok(result) => return Ok(result),
                Err(e) if e.is_retryable() && attempt < self.config.max_retries => {
                    let delay = retry_delay(attempt);
                    warn!(
                        "Background removal failed (attempt {}), retrying in {:?}: {}",
                        attempt + 1,
                        delay,
                        e
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[async_trait]
impl BackgroundRemover for RemoveBgClient {
    async fn remove_background(&self, image: &[u8]) -> RemovalResult<Vec<u8>> {
        let api_key = self.config.api_key.as_deref().ok_or(RemovalError::MissingApiKey)?;
        let url = format!("{}/v1.0/removebg", self.config.base_url.trim_end_matches('/'));
        let body = RemoveBgRequest::auto(base64::engine::general_purpose::STANDARD.encode(image));

        debug!(size = image.len(), "Sending background removal request");

        let result = self.with_retry(|| self.request_once(&url, api_key, &body)).await?;
        debug!(size = result.len(), "Background removed");
        Ok(result)
    }
}
