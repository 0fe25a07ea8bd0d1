//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the crawler, including:
//! - Building HTTP clients with proper user agent strings
//! - GET requests with per-request timeouts
//! - Redirects followed hop by hop, each hop admitted by a [`RequestGate`]
//! - Retry logic with exponential backoff for transient failures
//! - Content-Type screening and body size limits
//! - Error classification

use crate::config::{FetcherConfig, UserAgentConfig};
use reqwest::{redirect::Policy, Client, Response};
use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Maximum redirect hops followed for a single request
const MAX_REDIRECTS: usize = 10;

/// Errors produced by a fetch
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Connection failed: {0}")]
    Connect(String),

    #[error("HTTP status {0}")]
    Status(u16),

    #[error("Failed to read body: {0}")]
    Body(String),

    #[error("HTTP client error: {0}")]
    Client(String),

    #[error("Request refused: {0}")]
    Refused(String),

    #[error("Too many redirects from {0}")]
    TooManyRedirects(String),
}

impl FetchError {
    /// Returns true for failures worth retrying: timeouts, connection errors and 5xx
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Timeout(_) | Self::Connect(_) => true,
            Self::Status(code) => (500..600).contains(code),
            Self::Body(_) | Self::Client(_) | Self::Refused(_) | Self::TooManyRedirects(_) => {
                false
            }
        }
    }

    fn from_reqwest(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout(e.to_string())
        } else if e.is_connect() {
            Self::Connect(e.to_string())
        } else if e.is_body() || e.is_decode() {
            Self::Body(e.to_string())
        } else {
            Self::Client(e.to_string())
        }
    }
}

/// Result of a successful fetch
#[derive(Debug, Clone)]
pub enum FetchOutcome {
    /// A text page ready for extraction
    Page {
        /// HTTP status code
        status: u16,
        /// Page body, truncated to the configured limit
        body: String,
        /// Content-Type header value (empty if absent)
        content_type: String,
        /// Final URL after redirects
        final_url: Url,
    },

    /// The response was not text and its body was not read
    Skipped {
        /// The Content-Type received
        content_type: String,
    },
}

/// Decides whether a request may be sent, waiting for its turn if needed
///
/// The fetcher consults the gate before every attempt, including retries and
/// each redirect hop.
pub trait RequestGate: Sync {
    /// Resolves to false if `url` must not be requested
    fn admit(&self, url: &Url) -> impl Future<Output = bool> + Send;
}

/// Admits every request immediately
#[derive(Debug, Clone, Copy, Default)]
pub struct OpenGate;

impl RequestGate for OpenGate {
    fn admit(&self, _url: &Url) -> impl Future<Output = bool> + Send {
        std::future::ready(true)
    }
}

/// One response: either a final outcome or a hop to follow
enum Hop {
    Done(FetchOutcome),
    Redirect(Url),
}

/// Builds an HTTP client with proper configuration
///
/// The client does not follow redirects itself; [`Fetcher`] follows them so
/// every hop passes its gate.
///
/// # Arguments
///
/// * `user_agent` - The user agent configuration
/// * `config` - Timeouts for each request
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
///
/// # Example
///
/// ```no_run
/// use sumi_search::config::{FetcherConfig, UserAgentConfig};
/// use sumi_search::crawler::build_http_client;
///
/// let user_agent = UserAgentConfig {
///     crawler_name: "SumiSearch".to_string(),
///     crawler_version: "1.0".to_string(),
///     contact_url: "https://example.com/about".to_string(),
///     contact_email: "admin@example.com".to_string(),
/// };
///
/// let client = build_http_client(&user_agent, &FetcherConfig::default()).unwrap();
/// ```
pub fn build_http_client(
    user_agent: &UserAgentConfig,
    config: &FetcherConfig,
) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(user_agent.header_value())
        .timeout(Duration::from_secs(config.timeout_secs))
        .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
        .redirect(Policy::none())
        .gzip(true)
        .brotli(true)
        .build()
}

/// Returns true if a Content-Type denotes a page worth extracting
///
/// A missing Content-Type is accepted; the extractor decides.
pub fn is_text_content_type(content_type: &str) -> bool {
    let mime = content_type
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase();

    mime.is_empty()
        || mime.starts_with("text/")
        || mime == "application/xhtml+xml"
        || mime == "application/xml"
}

/// Fetches pages with retries and backoff
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: Client,
    max_retries: u32,
    retry_backoff: Duration,
    max_body_bytes: usize,
}

impl Fetcher {
    /// Creates a fetcher with its own HTTP client
    pub fn new(user_agent: &UserAgentConfig, config: &FetcherConfig) -> Result<Self, FetchError> {
        let client = build_http_client(user_agent, config)
            .map_err(|e| FetchError::Client(e.to_string()))?;
        Ok(Self::with_client(client, config))
    }

    /// Creates a fetcher around an existing client
    pub fn with_client(client: Client, config: &FetcherConfig) -> Self {
        Self {
            client,
            max_retries: config.max_retries,
            retry_backoff: Duration::from_millis(config.retry_backoff_ms),
            max_body_bytes: config.max_body_bytes,
        }
    }

    /// The underlying HTTP client
    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Fetches a URL, retrying transient failures and following redirects
    ///
    /// Equivalent to [`Fetcher::fetch_with`] with an [`OpenGate`].
    pub async fn fetch(&self, url: &Url) -> Result<FetchOutcome, FetchError> {
        self.fetch_with(url, &OpenGate).await
    }

    /// Fetches a URL, asking `gate` before every request
    ///
    /// # Retry Logic
    ///
    /// | Condition | Action |
    /// |-----------|--------|
    /// | Timeout | Retry up to `max-retries` times |
    /// | Connection error | Retry up to `max-retries` times |
    /// | HTTP 5xx | Retry up to `max-retries` times |
    /// | HTTP 4xx | Fail immediately |
    /// | HTTP 3xx with Location | Follow, up to 10 hops |
    /// | Non-text Content-Type | `Skipped`, body not read |
    ///
    /// The wait before retry `n` (counting from zero) is `retry-backoff-ms × 2^n`.
    /// Each redirect hop starts with a fresh retry count.
    ///
    /// # Returns
    ///
    /// * `Ok(FetchOutcome)` - A page or a skipped non-text response
    /// * `Err(FetchError::Refused)` - The gate refused the URL or a redirect target
    /// * `Err(FetchError)` - The last failure once retries are exhausted
    pub async fn fetch_with<G: RequestGate>(
        &self,
        url: &Url,
        gate: &G,
    ) -> Result<FetchOutcome, FetchError> {
        let mut current = url.clone();
        let mut redirects = 0;
        let mut attempt: u32 = 0;
        loop {
            if !gate.admit(&current).await {
                return Err(FetchError::Refused(current.to_string()));
            }

            match self.fetch_once(&current).await {
                Ok(Hop::Done(outcome)) => return Ok(outcome),
                Ok(Hop::Redirect(next)) => {
                    redirects += 1;
                    if redirects > MAX_REDIRECTS {
                        return Err(FetchError::TooManyRedirects(url.to_string()));
                    }
                    tracing::debug!("{} redirects to {}", current, next);
                    current = next;
                    attempt = 0;
                }
                Err(e) if e.is_transient() && attempt < self.max_retries => {
                    let backoff = self.retry_backoff.saturating_mul(2u32.saturating_pow(attempt));
                    tracing::debug!(
                        "Transient failure for {} ({}), retry {} in {:?}",
                        current,
                        e,
                        attempt + 1,
                        backoff
                    );
                    tokio::time::sleep(backoff).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn fetch_once(&self, url: &Url) -> Result<Hop, FetchError> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(FetchError::from_reqwest)?;

        let status = response.status();
        if status.is_redirection() {
            let target = response
                .headers()
                .get(reqwest::header::LOCATION)
                .and_then(|v| v.to_str().ok())
                .and_then(|location| url.join(location).ok());
            return match target {
                Some(target) => Ok(Hop::Redirect(target)),
                None => Err(FetchError::Status(status.as_u16())),
            };
        }
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();

        if !is_text_content_type(&content_type) {
            return Ok(Hop::Done(FetchOutcome::Skipped { content_type }));
        }

        let body = self.read_body(response).await?;

        Ok(Hop::Done(FetchOutcome::Page {
            status: status.as_u16(),
            body,
            content_type,
            final_url: url.clone(),
        }))
    }

    /// Reads the body up to the size limit
    async fn read_body(&self, mut response: Response) -> Result<String, FetchError> {
        let mut bytes: Vec<u8> = Vec::new();
        while let Some(chunk) = response.chunk().await.map_err(FetchError::from_reqwest)? {
            let remaining = self.max_body_bytes.saturating_sub(bytes.len());
            if chunk.len() >= remaining {
                bytes.extend_from_slice(&chunk[..remaining]);
                tracing::debug!(
                    "Body of {} truncated at {} bytes",
                    response.url(),
                    self.max_body_bytes
                );
                break;
            }
            bytes.extend_from_slice(&chunk);
        }
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}
