//! Outbound HTTP abstraction.
//!
//! Business logic talks to the network only through [`HttpTransport`], so the
//! version feed, the payment provider and package downloads can all be driven
//! by a fake transport in tests. Every request carries its own timeout.

use std::time::Duration;

use thiserror::Error;

use super::retry::{retry, RetryConfig};

/// Errors raised before an HTTP response was received.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// The request did not complete within its timeout.
    #[error("request timed out: {0}")]
    Timeout(String),

    /// The remote host could not be reached.
    #[error("connection failed: {0}")]
    Connect(String),

    /// Any other failure (TLS, invalid URL, body read).
    #[error("request failed: {0}")]
    Other(String),
}

impl TransportError {
    /// Whether a retry could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Timeout(_) | Self::Connect(_))
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout(e.to_string())
        } else if e.is_connect() {
            Self::Connect(e.to_string())
        } else {
            Self::Other(e.to_string())
        }
    }
}

/// HTTP method.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

/// An outbound request.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
    pub timeout: Duration,
}

impl HttpRequest {
    /// Default timeout when a caller does not set one.
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

    /// Create a GET request.
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            url: url.into(),
            headers: Vec::new(),
            body: None,
            timeout: Self::DEFAULT_TIMEOUT,
        }
    }

    /// Create a POST request with an empty body.
    pub fn post(url: impl Into<String>) -> Self {
        Self { method: Method::Post, ..Self::get(url) }
    }

    /// Set the timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Add a header.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Add a bearer `Authorization` header.
    pub fn bearer(self, token: &str) -> Self {
        self.header("Authorization", format!("Bearer {token}"))
    }

    /// Set an `application/x-www-form-urlencoded` body.
    pub fn form(mut self, fields: &[(&str, String)]) -> Self {
        let body = fields
            .iter()
            .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&");
        self.body = Some(body);
        self.header("Content-Type", "application/x-www-form-urlencoded")
    }

    /// Look up a header value (case-insensitive).
    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers.iter().find(|(k, _)| k.eq_ignore_ascii_case(name)).map(|(_, v)| v.as_str())
    }
}

/// A received response, whatever its status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// Create a response with a text body.
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self { status, body: body.into() }
    }

    /// Whether the status is 2xx.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Body decoded as UTF-8 (lossy).
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Executes HTTP requests.
pub trait HttpTransport: Send + Sync {
    /// Execute one request. Non-2xx statuses are returned as responses, not errors.
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError>;
}

/// Blocking reqwest-backed transport.
pub struct ReqwestTransport {
    client: reqwest::blocking::Client,
    retry: RetryConfig,
}

impl ReqwestTransport {
    /// Create a transport with the default (no-retry) policy.
    pub fn new() -> Result<Self, TransportError> {
        Self::with_retry(RetryConfig::default())
    }

    /// Create a transport with an explicit retry policy.
    pub fn with_retry(retry: RetryConfig) -> Result<Self, TransportError> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(format!("headless-settings/{}", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self { client, retry })
    }

    fn send_once(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        let mut builder = match request.method {
            Method::Get => self.client.get(&request.url),
            Method::Post => self.client.post(&request.url),
        };
        builder = builder.timeout(request.timeout);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }

        let response = builder.send()?;
        let status = response.status().as_u16();
        let body = response.bytes()?.to_vec();

        Ok(HttpResponse { status, body })
    }
}

impl HttpTransport for ReqwestTransport {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        tracing::debug!(url = %request.url, method = ?request.method, "outbound request");

        // Only idempotent reads are retried.
        let single = RetryConfig::no_retry();
        let policy = if request.method == Method::Get { &self.retry } else { &single };

        let outcome = retry(policy, || self.send_once(request), TransportError::is_transient);
        if outcome.attempts > 1 {
            tracing::debug!(attempts = outcome.attempts, url = %request.url, "request retried");
        }

        outcome.into_result()
    }
}
