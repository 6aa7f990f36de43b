//! HTTP Client Abstraction
//!
//! Provides single-attempt async HTTP operations with independent connect
//! and transfer timeouts.

use async_trait::async_trait;
use bytes::Bytes;
use std::collections::HashMap;
use std::time::Duration;

use crate::error::Result;

/// HTTP method types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
}

/// HTTP request builder
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: HashMap<String, String>,
    /// Bound on establishing the connection
    pub connect_timeout: Option<Duration>,
    /// Bound on each wait for response data; resets whenever data arrives
    pub read_timeout: Option<Duration>,
}

impl HttpRequest {
    pub fn new(method: HttpMethod, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: HashMap::new(),
            connect_timeout: None,
            read_timeout: None,
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(HttpMethod::Get, url)
    }

    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    pub fn connect_timeout(mut self, duration: Duration) -> Self {
        self.connect_timeout = Some(duration);
        self
    }

    pub fn read_timeout(mut self, duration: Duration) -> Self {
        self.read_timeout = Some(duration);
        self
    }
}

/// HTTP response
#[derive(Debug)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: HashMap<String, String>,
    pub body: Bytes,
}

impl HttpResponse {
    /// Check if response status is successful (2xx)
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Content-Type header, if any (case-insensitive lookup)
    pub fn content_type(&self) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case("content-type"))
            .map(|(_, v)| v.as_str())
    }
}

/// Async HTTP client trait
///
/// Implementations perform exactly one attempt per call and report failures
/// through the classified [`BridgeError`](crate::error::BridgeError) variants:
/// - `InvalidUrl` when the URL cannot be parsed or uses an unsupported scheme
/// - `ConnectionFailed` when the peer cannot be reached
/// - `Timeout` when either the connect or the read bound elapses
///
/// Both bounds must be enforced by the implementation. There is no overall
/// deadline: a transfer that keeps delivering data runs to completion.
///
/// Non-2xx statuses are returned as responses, not errors.
///
/// # Example
///
/// ```ignore
/// use bridge_traits::http::{HttpClient, HttpRequest};
/// use std::time::Duration;
///
/// async fn fetch(client: &dyn HttpClient) -> Result<bytes::Bytes> {
///     let request = HttpRequest::get("https://example.test/cat.png")
///         .connect_timeout(Duration::from_secs(30))
///         .read_timeout(Duration::from_secs(30));
///     Ok(client.execute(request).await?.body)
/// }
/// ```
#[async_trait]
pub trait HttpClient: Send + Sync {
    /// Execute an HTTP request
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - The URL is malformed
    /// - Network connection fails
    /// - Request times out
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse>;
}
