//! HTTP client for external services.
//!
//! # Responsibilities
//! - Build requests against a service's base URL
//! - Attach request ID, user agent and bearer credentials
//! - Enforce the per-call timeout
//! - Buffer the response and map transport failures into `FetchError`

use std::time::{Duration, Instant};
use thiserror::Error;
use url::Url;

use crate::error::FetchError;
use crate::http::request::{RequestId, RequestSpec, X_REQUEST_ID};
use crate::http::response::{ApiResponse, RateLimitInfo};
use crate::resilience::timeouts::with_timeout;

/// Errors raised while constructing a client.
#[derive(Debug, Error)]
pub enum HttpClientError {
    #[error("invalid base URL '{url}': {source}")]
    InvalidBaseUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("failed to build HTTP client: {0}")]
    Build(#[from] reqwest::Error),
}

/// Thin wrapper over `reqwest::Client` bound to one service's base URL.
#[derive(Debug, Clone)]
pub struct HttpClient {
    inner: reqwest::Client,
    base_url: Url,
    bearer: Option<String>,
    timeout: Duration,
}

impl HttpClient {
    /// Create a client for `base_url`.
    pub fn new(base_url: &str, user_agent: &str, timeout: Duration) -> Result<Self, HttpClientError> {
        let inner = reqwest::Client::builder()
            .user_agent(user_agent.to_string())
            .build()?;
        Self::from_client(inner, base_url, timeout)
    }

    /// Wrap an already configured `reqwest::Client`.
    pub fn from_client(
        inner: reqwest::Client,
        base_url: &str,
        timeout: Duration,
    ) -> Result<Self, HttpClientError> {
        let mut parsed = Url::parse(base_url).map_err(|source| HttpClientError::InvalidBaseUrl {
            url: base_url.to_string(),
            source,
        })?;
        // Url::join replaces the last segment unless the base ends with '/'
        if !parsed.path().ends_with('/') {
            let path = format!("{}/", parsed.path());
            parsed.set_path(&path);
        }

        Ok(Self {
            inner,
            base_url: parsed,
            bearer: None,
            timeout,
        })
    }

    /// Send `Authorization: Bearer <token>` with every request.
    pub fn with_bearer(mut self, token: impl Into<String>) -> Self {
        self.bearer = Some(token.into());
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn url_for(&self, path: &str) -> Result<Url, FetchError> {
        self.base_url
            .join(path.trim_start_matches('/'))
            .map_err(|e| FetchError::InvalidRequest(format!("bad path '{path}': {e}")))
    }

    /// Perform one outbound call. Non-success statuses are returned as
    /// responses, not errors; classification happens in the retry layer.
    pub async fn send(&self, spec: &RequestSpec) -> Result<ApiResponse, FetchError> {
        let url = self.url_for(&spec.path)?;
        let request_id = RequestId::new();

        let mut request = self
            .inner
            .request(spec.method.clone(), url.clone())
            .header(X_REQUEST_ID, request_id.to_string());
        if !spec.query.is_empty() {
            request = request.query(&spec.query);
        }
        if let Some(token) = &self.bearer {
            request = request.bearer_auth(token);
        }
        if let Some(body) = &spec.json {
            request = request.json(body);
        }

        let start = Instant::now();
        let result = with_timeout(self.timeout, async {
            let response = request.send().await.map_err(map_transport_error)?;
            let status = response.status().as_u16();
            let rate_limit = RateLimitInfo::from_headers(response.headers());
            let body = response.bytes().await.map_err(map_transport_error)?;
            Ok(ApiResponse {
                status,
                rate_limit,
                body: body.to_vec(),
            })
        })
        .await;

        match &result {
            Ok(response) => tracing::debug!(
                request_id = %request_id,
                method = %spec.method,
                url = %url,
                status = response.status,
                elapsed_ms = start.elapsed().as_millis() as u64,
                "Outbound request completed"
            ),
            Err(e) => tracing::debug!(
                request_id = %request_id,
                method = %spec.method,
                url = %url,
                error = %e,
                "Outbound request failed"
            ),
        }

        result
    }
}

fn map_transport_error(e: reqwest::Error) -> FetchError {
    if e.is_timeout() {
        FetchError::Timeout(Duration::ZERO)
    } else if e.is_builder() {
        FetchError::InvalidRequest(e.to_string())
    } else {
        FetchError::Network(e.to_string())
    }
}
