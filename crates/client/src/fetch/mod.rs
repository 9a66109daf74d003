//! HTTP transport for icon sources.
//!
//! ### URL Canonicalization
//! - Trim whitespace, only http(s) accepted
//! - Lowercase host, remove fragments
//!
//! ### Safety Gates
//! - Deny private and reserved IP literals
//! - Skip known CORS-hostile domains before any request is made
//! - Max redirects: 5
//! - Max body bytes: 2MB (configurable)
//!
//! ### Cancellation
//! Every request runs under `tokio::time::timeout`. Dropping the future
//! abandons the request; an elapsed timeout is an ordinary [`FetchError`].

pub mod ssrf;
pub mod url;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Client, header};
use std::error::Error as _;
use std::time::{Duration, Instant};

pub use ssrf::{SsrfError, check_url_host, validate_ip};
pub use url::{UrlError, canonicalize, is_blocked_domain};

use tokicon_core::{AppConfig, Error, FailureKind};

/// Configuration for the HTTP transport.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// User agent string (default: "tokicon/0.1")
    pub user_agent: String,

    /// Maximum response body size in bytes (default: 2MB)
    pub max_bytes: usize,

    /// Maximum number of redirects to follow (default: 5)
    pub max_redirects: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self { user_agent: "tokicon/0.1".to_string(), max_bytes: 2 * 1024 * 1024, max_redirects: 5 }
    }
}

impl From<&AppConfig> for FetchConfig {
    fn from(config: &AppConfig) -> Self {
        Self { user_agent: config.user_agent.clone(), max_bytes: config.max_bytes, ..Default::default() }
    }
}

/// Response from a transport request.
#[derive(Debug, Clone)]
pub struct TransportResponse {
    /// HTTP status code
    pub status: u16,
    /// Content-Type header
    pub content_type: Option<String>,
    /// Response body (empty for HEAD)
    pub body: Bytes,
}

impl TransportResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Lowercased content type, empty when the header was absent.
    pub fn content_type(&self) -> String {
        self.content_type.as_deref().unwrap_or_default().to_ascii_lowercase()
    }
}

/// Why a request produced no response.
#[derive(Debug, Clone, thiserror::Error)]
pub enum FetchError {
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("DNS resolution failed: {0}")]
    Dns(String),

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("blocked: {0}")]
    Blocked(String),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    #[error("response too large: {0} bytes")]
    TooLarge(u64),

    #[error("network error: {0}")]
    Network(String),
}

impl FetchError {
    pub fn kind(&self) -> FailureKind {
        match self {
            FetchError::Timeout(_) => FailureKind::Timeout,
            FetchError::Dns(_) => FailureKind::Dns,
            FetchError::Blocked(_) => FailureKind::Cors,
            FetchError::Connect(_) | FetchError::Network(_) => FailureKind::Network,
            FetchError::InvalidUrl(_) | FetchError::TooLarge(_) => FailureKind::Unknown,
        }
    }

    fn from_reqwest(err: &reqwest::Error, timeout: Duration) -> Self {
        if err.is_timeout() {
            return FetchError::Timeout(timeout);
        }
        let detail = error_chain(err);
        if err.is_connect() {
            let lower = detail.to_ascii_lowercase();
            if lower.contains("dns error") || lower.contains("failed to lookup address") {
                return FetchError::Dns(detail);
            }
            return FetchError::Connect(detail);
        }
        FetchError::Network(detail)
    }
}

fn error_chain(err: &reqwest::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

/// Outbound HTTP used by resolvers and the gateway prober.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Reachability check. The body is never read.
    async fn head(&self, url: &str, timeout: Duration) -> Result<TransportResponse, FetchError>;

    async fn get(&self, url: &str, accept: &str, timeout: Duration) -> Result<TransportResponse, FetchError>;
}

/// [`Transport`] backed by reqwest.
pub struct HttpTransport {
    http: Client,
    config: FetchConfig,
}

impl HttpTransport {
    /// Create a new transport with the given configuration.
    pub fn new(config: FetchConfig) -> Result<Self, Error> {
        let http = Client::builder()
            .user_agent(&config.user_agent)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .use_rustls_tls()
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()
            .map_err(|e| Error::HttpClient(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { http, config })
    }

    fn prepare(url_str: &str) -> Result<reqwest::Url, FetchError> {
        let url = canonicalize(url_str).map_err(|e| FetchError::InvalidUrl(e.to_string()))?;
        check_url_host(&url).map_err(|e| FetchError::Blocked(e.to_string()))?;
        Ok(url)
    }

    async fn send(
        &self, request: reqwest::RequestBuilder, read_body: bool, timeout: Duration,
    ) -> Result<TransportResponse, FetchError> {
        let exchange = async {
            let response = request.timeout(timeout).send().await.map_err(|e| FetchError::from_reqwest(&e, timeout))?;
            let status = response.status().as_u16();
            let content_type =
                response.headers().get(header::CONTENT_TYPE).and_then(|v| v.to_str().ok()).map(str::to_string);

            if !read_body {
                return Ok(TransportResponse { status, content_type, body: Bytes::new() });
            }

            if let Some(len) = response.content_length()
                && len as usize > self.config.max_bytes
            {
                return Err(FetchError::TooLarge(len));
            }

            let body = response.bytes().await.map_err(|e| FetchError::from_reqwest(&e, timeout))?;
            if body.len() > self.config.max_bytes {
                return Err(FetchError::TooLarge(body.len() as u64));
            }

            Ok(TransportResponse { status, content_type, body })
        };

        tokio::time::timeout(timeout, exchange).await.map_err(|_| FetchError::Timeout(timeout))?
    }

    /// Get reference to the configuration.
    pub fn config(&self) -> &FetchConfig {
        &self.config
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn head(&self, url: &str, timeout: Duration) -> Result<TransportResponse, FetchError> {
        let start = Instant::now();
        let url = Self::prepare(url)?;
        let request = self.http.head(url.as_str()).header(header::CACHE_CONTROL, "no-cache");
        let result = self.send(request, false, timeout).await;
        tracing::trace!(%url, elapsed_ms = start.elapsed().as_millis() as u64, ok = result.is_ok(), "HEAD");
        result
    }

    async fn get(&self, url: &str, accept: &str, timeout: Duration) -> Result<TransportResponse, FetchError> {
        let start = Instant::now();
        let url = Self::prepare(url)?;
        let request = self.http.get(url.as_str()).header(header::ACCEPT, accept);
        let result = self.send(request, true, timeout).await;
        tracing::trace!(%url, elapsed_ms = start.elapsed().as_millis() as u64, ok = result.is_ok(), "GET");
        result
    }
}
