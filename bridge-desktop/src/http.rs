//! HTTP Client Implementation using Reqwest

use async_trait::async_trait;
use bridge_traits::{
    error::{BridgeError, Result},
    http::{HttpClient, HttpMethod, HttpRequest, HttpResponse},
};
use reqwest::Client;
use std::collections::HashMap;
use std::error::Error as _;
use std::io;
use std::sync::Mutex;
use std::time::Duration;
use tracing::{debug, warn};

const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(30);

/// Connect and read bounds a pooled client was built with
type TimeoutKey = (Duration, Duration);

/// Reqwest-based HTTP client implementation
///
/// Provides HTTP operations with:
/// - Connection pooling via reqwest
/// - Independent connect and read timeouts
/// - TLS via rustls
///
/// The read timeout bounds each wait for data and resets whenever bytes
/// arrive, so a slow but steady download is never cut off. reqwest binds both
/// bounds to the client, so one pooled client is kept per timeout pair.
///
/// Each call is a single attempt; retrying is left to the deferred scheduler.
pub struct ReqwestHttpClient {
    defaults: TimeoutKey,
    clients: Mutex<HashMap<TimeoutKey, Client>>,
}

impl ReqwestHttpClient {
    /// Create a new HTTP client with default configuration
    pub fn new() -> Result<Self> {
        Self::with_timeouts(DEFAULT_CONNECT_TIMEOUT, DEFAULT_READ_TIMEOUT)
    }

    /// Create a new HTTP client with custom default bounds
    pub fn with_timeouts(connect_timeout: Duration, read_timeout: Duration) -> Result<Self> {
        let defaults = (connect_timeout, read_timeout);
        let client = Self::build_client(defaults)?;
        Ok(Self {
            defaults,
            clients: Mutex::new(HashMap::from([(defaults, client)])),
        })
    }

    fn build_client((connect_timeout, read_timeout): TimeoutKey) -> Result<Client> {
        Client::builder()
            .connect_timeout(connect_timeout)
            .read_timeout(read_timeout)
            .pool_max_idle_per_host(10)
            .user_agent(concat!("photo-bridge/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| BridgeError::NotAvailable(format!("HTTP client: {}", e)))
    }

    /// Pooled client for the request's bounds, built on first use
    fn client_for(&self, request: &HttpRequest) -> Result<Client> {
        let key = (
            request.connect_timeout.unwrap_or(self.defaults.0),
            request.read_timeout.unwrap_or(self.defaults.1),
        );

        let mut clients = self
            .clients
            .lock()
            .map_err(|_| BridgeError::OperationFailed("HTTP client pool poisoned".into()))?;
        if let Some(client) = clients.get(&key) {
            return Ok(client.clone());
        }

        debug!(?key, "Building HTTP client for new timeout pair");
        let client = Self::build_client(key)?;
        clients.insert(key, client.clone());
        Ok(client)
    }

    /// Convert bridge HttpMethod to reqwest Method
    fn convert_method(method: HttpMethod) -> reqwest::Method {
        match method {
            HttpMethod::Get => reqwest::Method::GET,
        }
    }

    /// Whether any error in the chain is an elapsed timeout
    fn timed_out(e: &reqwest::Error) -> bool {
        if e.is_timeout() {
            return true;
        }
        let mut source = e.source();
        while let Some(err) = source {
            if err
                .downcast_ref::<io::Error>()
                .is_some_and(|io| io.kind() == io::ErrorKind::TimedOut)
            {
                return true;
            }
            source = err.source();
        }
        false
    }

    /// Map a reqwest failure onto the classified bridge errors
    fn map_error(e: reqwest::Error) -> BridgeError {
        if e.is_builder() {
            BridgeError::InvalidUrl(e.to_string())
        } else if Self::timed_out(&e) {
            BridgeError::Timeout(e.to_string())
        } else {
            // connect, redirect and body errors all mean the peer was unusable
            BridgeError::ConnectionFailed(e.to_string())
        }
    }

    /// Build reqwest request from bridge request
    fn build_request(client: &Client, request: HttpRequest) -> reqwest::RequestBuilder {
        let method = Self::convert_method(request.method);
        let mut req = client.request(method, &request.url);

        for (key, value) in request.headers {
            req = req.header(key, value);
        }

        req
    }
}

#[async_trait]
impl HttpClient for ReqwestHttpClient {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse> {
        let client = self.client_for(&request)?;

        debug!(method = ?request.method, "Executing HTTP request");

        let response = Self::build_request(&client, request)
            .send()
            .await
            .map_err(|e| {
                warn!(error = %e, "HTTP request failed");
                Self::map_error(e)
            })?;

        let status = response.status().as_u16();
        let headers: HashMap<String, String> = response
            .headers()
            .iter()
            .filter_map(|(k, v)| v.to_str().ok().map(|s| (k.to_string(), s.to_string())))
            .collect();

        let body = response.bytes().await.map_err(|e| {
            warn!(error = %e, "HTTP body transfer failed");
            Self::map_error(e)
        })?;

        debug!(status, size = body.len(), "HTTP response received");

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}
