//! Site page and listing-endpoint fetching.
//!
//! [`PageFetcher`] applies browser-like headers to a [`RequestSpec`] and runs
//! it under the site [`RetryPolicy`]. JSON bodies are decoded once the
//! transfer succeeded; a body that does not decode is a structural mismatch
//! and is never retried.

use std::time::Duration;

use reqwest::header::{ACCEPT, HeaderName};
use reqwest::{Client, Method};
use tracing::{debug, instrument};
use url::Url;

use super::FetchError;
use super::retry::{RetryPolicy, run_with_retry};
use crate::user_agent::{ACCEPT_HTML, ACCEPT_JSON, BROWSER_USER_AGENT};

/// Connect timeout for site and API requests.
pub const SITE_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Read timeout for site and API requests.
pub const SITE_READ_TIMEOUT_SECS: u64 = 30;

/// One logical request: target, query, extra headers and expected body kind.
///
/// Built per call site and never mutated after it is handed to a fetcher.
#[derive(Debug, Clone)]
pub struct RequestSpec {
    method: Method,
    url: String,
    query: Vec<(String, String)>,
    headers: Vec<(HeaderName, String)>,
    json: bool,
}

impl RequestSpec {
    /// A GET request for `url` with no query and HTML accept headers.
    #[must_use]
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: Method::GET,
            url: url.into(),
            query: Vec::new(),
            headers: Vec::new(),
            json: false,
        }
    }

    /// Appends a query parameter.
    #[must_use]
    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// Adds a request header.
    #[must_use]
    pub fn header(mut self, name: HeaderName, value: impl Into<String>) -> Self {
        self.headers.push((name, value.into()));
        self
    }

    /// Marks the request as an XHR-style JSON query.
    #[must_use]
    pub fn json(mut self) -> Self {
        self.json = true;
        self
    }

    /// Target URL without query parameters.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Query parameters in insertion order.
    #[must_use]
    pub fn query_pairs(&self) -> &[(String, String)] {
        &self.query
    }

    /// Target URL with the query parameters encoded.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::InvalidUrl`] when the target does not parse.
    pub fn full_url(&self) -> Result<Url, FetchError> {
        let parsed = if self.query.is_empty() {
            Url::parse(&self.url)
        } else {
            Url::parse_with_params(&self.url, &self.query)
        };
        parsed.map_err(|_| FetchError::invalid_url(self.url.clone()))
    }

    /// Value of the query parameter `key`, if set.
    #[must_use]
    pub fn query_value(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// Builds a reqwest client with the shared header and timeout policy.
pub(crate) fn build_client(
    connect_timeout_secs: u64,
    read_timeout_secs: u64,
) -> Result<Client, FetchError> {
    Client::builder()
        .connect_timeout(Duration::from_secs(connect_timeout_secs))
        .timeout(Duration::from_secs(read_timeout_secs))
        .gzip(true)
        .user_agent(BROWSER_USER_AGENT)
        .build()
        .map_err(|source| FetchError::Client { source })
}

/// Fetches site pages and listing-endpoint JSON under the site retry policy.
///
/// Create once per run and reuse for connection pooling.
#[derive(Debug, Clone)]
pub struct PageFetcher {
    client: Client,
    policy: RetryPolicy,
}

impl PageFetcher {
    /// Creates a fetcher with default site timeouts.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Client`] if the HTTP client cannot be built.
    pub fn new(policy: RetryPolicy) -> Result<Self, FetchError> {
        Ok(Self {
            client: build_client(SITE_CONNECT_TIMEOUT_SECS, SITE_READ_TIMEOUT_SECS)?,
            policy,
        })
    }

    /// Fetches `spec` and returns the body as text.
    ///
    /// # Errors
    ///
    /// Returns the last transport or status error once the policy's attempts
    /// are exhausted.
    #[instrument(skip(self, spec), fields(url = %spec.url))]
    pub async fn fetch_text(&self, spec: &RequestSpec) -> Result<String, FetchError> {
        let url = spec.full_url()?;
        let url = &url;
        run_with_retry(&self.policy, &spec.url, |attempt| async move {
            debug!(attempt, query = ?spec.query, "fetching");
            self.send_once(spec, url).await
        })
        .await
    }

    /// Fetches `spec` and decodes the body as JSON.
    ///
    /// # Errors
    ///
    /// Returns transport/status errors as [`fetch_text`](Self::fetch_text)
    /// does, and [`FetchError::Parse`] (without retrying) when the body is not
    /// valid JSON.
    pub async fn fetch_json(&self, spec: &RequestSpec) -> Result<serde_json::Value, FetchError> {
        let body = self.fetch_text(spec).await?;
        serde_json::from_str(&body).map_err(|e| FetchError::parse(&spec.url, e.to_string()))
    }

    async fn send_once(&self, spec: &RequestSpec, url: &Url) -> Result<String, FetchError> {
        let accept = if spec.json { ACCEPT_JSON } else { ACCEPT_HTML };
        let mut request = self
            .client
            .request(spec.method.clone(), url.clone())
            .header(ACCEPT, accept);
        if spec.json {
            request = request.header("x-requested-with", "XMLHttpRequest");
        }
        for (name, value) in &spec.headers {
            request = request.header(name.clone(), value.as_str());
        }

        let response = request
            .send()
            .await
            .map_err(|e| FetchError::network(&spec.url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::http_status(&spec.url, status.as_u16()));
        }

        response
            .text()
            .await
            .map_err(|e| FetchError::network(&spec.url, e))
    }
}
