//! Minimal Firestore REST client: read one document, merge-update one document.
//!
//! Requests carry a cached service-account token, retry transient failures
//! and report to the `sticker_settings_*` metrics. With
//! `FIRESTORE_EMULATOR_HOST` set, requests go over plain HTTP with the
//! emulator's fixed bearer token.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use gcp_auth::{CustomServiceAccount, TokenProvider};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use tracing::{debug, info_span, Instrument};

use crate::error::{FirestoreError, FirestoreResult};
use crate::metrics::record_request;
use crate::retry::{with_retry, RetryConfig};
use crate::token_cache::TokenCache;
use crate::types::{Document, Value};

/// Bearer token accepted by the Firestore emulator.
const EMULATOR_TOKEN: &str = "owner";

#[derive(Debug, Clone)]
pub struct FirestoreConfig {
    /// GCP project ID
    pub project_id: String,
    /// Database ID (usually "(default)")
    pub database_id: String,
    /// Emulator `host:port`, bypasses auth
    pub emulator_host: Option<String>,
    /// Request timeout
    pub timeout: Duration,
    /// Connect timeout
    pub connect_timeout: Duration,
    /// Retry configuration
    pub retry: RetryConfig,
}

impl FirestoreConfig {
    pub fn new(project_id: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            database_id: "(default)".to_string(),
            emulator_host: None,
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(5),
            retry: RetryConfig::default(),
        }
    }

    /// Read `GCP_PROJECT_ID` (or `FIREBASE_PROJECT_ID`) plus the optional
    /// `FIRESTORE_*` overrides.
    pub fn from_env() -> FirestoreResult<Self> {
        let project_id = env_nonempty("GCP_PROJECT_ID")
            .or_else(|| env_nonempty("FIREBASE_PROJECT_ID"))
            .ok_or_else(|| {
                FirestoreError::auth_error(
                    "no Firestore project: set GCP_PROJECT_ID or FIREBASE_PROJECT_ID",
                )
            })?;

        let mut config = Self::new(project_id);
        if let Some(database) = env_nonempty("FIRESTORE_DATABASE_ID") {
            config.database_id = database;
        }
        if let Some(secs) =
            env_nonempty("FIRESTORE_CONNECT_TIMEOUT_SECS").and_then(|s| s.parse().ok())
        {
            config.connect_timeout = Duration::from_secs(secs);
        }
        config.emulator_host = env_nonempty("FIRESTORE_EMULATOR_HOST");
        config.retry = RetryConfig::from_env();
        Ok(config)
    }

    fn base_url(&self) -> String {
        let root = match &self.emulator_host {
            Some(host) if host.starts_with("http") => host.trim_end_matches('/').to_string(),
            Some(host) => format!("http://{}", host),
            None => "https://firestore.googleapis.com".to_string(),
        };
        format!(
            "{}/v1/projects/{}/databases/{}/documents",
            root, self.project_id, self.database_id
        )
    }
}

fn env_nonempty(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

enum Auth {
    ServiceAccount(Arc<TokenCache>),
    Emulator,
}

/// Cheap to clone; clones share the HTTP pool and token cache.
#[derive(Clone)]
pub struct FirestoreClient {
    http: Client,
    config: FirestoreConfig,
    base_url: String,
    auth: Arc<Auth>,
}

impl FirestoreClient {
    pub async fn new(config: FirestoreConfig) -> FirestoreResult<Self> {
        let auth = match config.emulator_host {
            Some(_) => Auth::Emulator,
            None => Auth::ServiceAccount(Arc::new(TokenCache::new(Self::create_auth_provider()?))),
        };

        let http = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(10)
            .user_agent(concat!("sticker-firestore/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(FirestoreError::Network)?;

        Ok(Self {
            http,
            base_url: config.base_url(),
            config,
            auth: Arc::new(auth),
        })
    }

    fn create_auth_provider() -> FirestoreResult<Arc<dyn TokenProvider>> {
        let account = CustomServiceAccount::from_env()
            .map_err(|e| FirestoreError::auth_error(format!("unreadable service account: {e}")))?
            .ok_or_else(|| {
                FirestoreError::auth_error(
                    "GOOGLE_APPLICATION_CREDENTIALS must point at a service account key",
                )
            })?;
        Ok(Arc::new(account))
    }

    pub async fn from_env() -> FirestoreResult<Self> {
        Self::new(FirestoreConfig::from_env()?).await
    }

    pub fn config(&self) -> &FirestoreConfig {
        &self.config
    }

    async fn get_token(&self) -> FirestoreResult<String> {
        match self.auth.as_ref() {
            Auth::ServiceAccount(cache) => cache.get_token().await,
            Auth::Emulator => Ok(EMULATOR_TOKEN.to_string()),
        }
    }

    async fn invalidate_token(&self) {
        if let Auth::ServiceAccount(cache) = self.auth.as_ref() {
            cache.invalidate().await;
        }
    }

    fn is_access_token_expired(body: &str) -> bool {
        body.contains("ACCESS_TOKEN_EXPIRED") || body.contains("\"UNAUTHENTICATED\"")
    }

    fn document_path(&self, collection: &str, doc_id: &str) -> String {
        format!(
            "{}/{}/{}",
            self.base_url,
            collection,
            urlencoding::encode(doc_id)
        )
    }

    /// Send an authorized request, refreshing the token once if it expired.
    async fn send_authorized<B>(&self, url: &str, build: B) -> FirestoreResult<Response>
    where
        B: Fn(&str) -> RequestBuilder,
    {
        let token = self.get_token().await?;
        let response = build(&token).send().await?;
        if response.status() != StatusCode::UNAUTHORIZED {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        if !Self::is_access_token_expired(&body) {
            return Err(FirestoreError::from_http_status(
                401,
                format!("{} failed: {}", url, body),
            ));
        }

        debug!("Access token expired, refreshing");
        self.invalidate_token().await;
        let token = self.get_token().await?;
        Ok(build(&token).send().await?)
    }

    /// Get a document. Missing documents are `Ok(None)`.
    pub async fn get_document(
        &self,
        collection: &str,
        doc_id: &str,
    ) -> FirestoreResult<Option<Document>> {
        let url = self.document_path(collection, doc_id);

        self.execute_request("get_document", collection, Some(doc_id), async {
            let response = self
                .send_authorized(&url, |token| self.http.get(&url).bearer_auth(token))
                .await?;

            match response.status() {
                StatusCode::OK => Ok(Some(response.json().await?)),
                StatusCode::NOT_FOUND => Ok(None),
                status => Err(Self::handle_error_response(status, &url, response).await),
            }
        })
        .await
    }

    /// Merge `fields` into a document, creating it if missing.
    ///
    /// With `update_mask`, only the listed fields are written and all others
    /// are left untouched.
    pub async fn update_document(
        &self,
        collection: &str,
        doc_id: &str,
        fields: HashMap<String, Value>,
        update_mask: Option<Vec<String>>,
    ) -> FirestoreResult<Document> {
        let mut url = self.document_path(collection, doc_id);
        if let Some(mask) = update_mask {
            let params: Vec<String> = mask
                .iter()
                .map(|f| format!("updateMask.fieldPaths={}", urlencoding::encode(f)))
                .collect();
            url = format!("{}?{}", url, params.join("&"));
        }

        let body = Document::new(fields);

        self.execute_request("update_document", collection, Some(doc_id), async {
            let response = self
                .send_authorized(&url, |token| {
                    self.http.patch(&url).bearer_auth(token).json(&body)
                })
                .await?;

            match response.status() {
                StatusCode::OK => Ok(response.json().await?),
                status => Err(Self::handle_error_response(status, &url, response).await),
            }
        })
        .await
    }

    /// Execute with the configured retry policy.
    pub async fn with_retry<T, F, Fut>(&self, operation: &str, op: F) -> FirestoreResult<T>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = FirestoreResult<T>>,
    {
        with_retry(&self.config.retry, operation, op).await
    }

    /// Execute a request with tracing and metrics.
    async fn execute_request<T, F>(
        &self,
        operation: &str,
        collection: &str,
        doc_id: Option<&str>,
        fut: F,
    ) -> FirestoreResult<T>
    where
        F: std::future::Future<Output = FirestoreResult<T>>,
    {
        let span = info_span!(
            "firestore_request",
            operation = %operation,
            collection = %collection,
            doc_id = doc_id.unwrap_or_default()
        );

        let start = Instant::now();
        let result = fut.instrument(span).await;

        let status = match &result {
            Ok(_) => 200,
            Err(e) => e.http_status().unwrap_or(500),
        };
        record_request(operation, collection, status, start.elapsed());

        result
    }

    async fn handle_error_response(
        status: StatusCode,
        url: &str,
        response: Response,
    ) -> FirestoreError {
        let retry_after_ms = response
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok())
            .map(|secs| secs * 1000);
        let body = response.text().await.unwrap_or_default();
        FirestoreError::from_http_status(status.as_u16(), format!("{} failed: {}", url, body))
            .with_retry_after(retry_after_ms)
    }
}
