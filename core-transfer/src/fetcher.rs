//! Remote image download and decode.

use crate::error::FetchError;
use async_trait::async_trait;
use bridge_traits::http::{HttpClient, HttpRequest};
use bytes::Bytes;
use core_runtime::logging::redact_url;
use image::{DynamicImage, ImageFormat};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

/// A downloaded image, owned by a single transfer.
#[derive(Clone)]
pub struct DecodedImage {
    bytes: Bytes,
    format: ImageFormat,
    pixels: DynamicImage,
}

impl DecodedImage {
    /// Sniff and decode a raw payload.
    ///
    /// # Errors
    ///
    /// `DecodeFailed` when the bytes are not a recognised raster format or do
    /// not decode.
    pub fn from_bytes(bytes: Bytes) -> Result<Self, FetchError> {
        let format =
            image::guess_format(&bytes).map_err(|e| FetchError::DecodeFailed(e.to_string()))?;
        let pixels = image::load_from_memory_with_format(&bytes, format)
            .map_err(|e| FetchError::DecodeFailed(e.to_string()))?;

        Ok(Self {
            bytes,
            format,
            pixels,
        })
    }

    /// The payload exactly as downloaded.
    pub fn bytes(&self) -> &Bytes {
        &self.bytes
    }

    pub fn format(&self) -> ImageFormat {
        self.format
    }

    pub fn pixels(&self) -> &DynamicImage {
        &self.pixels
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }
}

impl fmt::Debug for DecodedImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DecodedImage")
            .field("format", &self.format)
            .field("width", &self.width())
            .field("height", &self.height())
            .field("size", &self.bytes.len())
            .finish()
    }
}

/// Single-attempt image download.
#[async_trait]
pub trait MediaFetcher: Send + Sync {
    /// Download `url` and decode it.
    ///
    /// `timeout` bounds connection establishment and each wait for data
    /// independently. Nothing is written to disk.
    async fn fetch(&self, url: &str, timeout: Duration) -> Result<DecodedImage, FetchError>;
}

/// [`MediaFetcher`] over the host [`HttpClient`].
pub struct HttpMediaFetcher {
    http: Arc<dyn HttpClient>,
}

impl HttpMediaFetcher {
    pub fn new(http: Arc<dyn HttpClient>) -> Self {
        Self { http }
    }

    fn parse_url(url: &str) -> Result<Url, FetchError> {
        let parsed = Url::parse(url).map_err(|e| FetchError::MalformedUrl(e.to_string()))?;
        match parsed.scheme() {
            "http" | "https" => Ok(parsed),
            other => Err(FetchError::MalformedUrl(format!(
                "unsupported scheme '{}'",
                other
            ))),
        }
    }
}

#[async_trait]
impl MediaFetcher for HttpMediaFetcher {
    async fn fetch(&self, url: &str, timeout: Duration) -> Result<DecodedImage, FetchError> {
        let parsed = Self::parse_url(url)?;
        let request = HttpRequest::get(parsed.as_str())
            .connect_timeout(timeout)
            .read_timeout(timeout);

        let response = self.http.execute(request).await.map_err(|e| {
            warn!(url = %redact_url(url), error = %e, "Download failed");
            FetchError::from(e)
        })?;

        if !response.is_success() {
            return Err(FetchError::ConnectionFailed(format!(
                "server responded with HTTP {}",
                response.status
            )));
        }

        debug!(
            url = %redact_url(url),
            size = response.body.len(),
            content_type = response.content_type().unwrap_or("unknown"),
            "Downloaded image payload"
        );

        DecodedImage::from_bytes(response.body)
    }
}
