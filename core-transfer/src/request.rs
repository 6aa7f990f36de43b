//! Transfer request validation.

use thiserror::Error;

/// Rejection reasons for a request that never reaches I/O.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InvalidRequest {
    #[error("URL missing")]
    MissingUrl,

    #[error("fileName missing")]
    MissingDisplayName,

    #[error("fileName must be a plain file name: {0}")]
    InvalidDisplayName(String),
}

/// A validated `{url, fileName}` pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferRequest {
    source_url: String,
    display_name: String,
}

impl TransferRequest {
    /// Validate and build a request.
    ///
    /// Both fields must be non-empty. The display name becomes the media
    /// item's file name, so it may not contain path separators.
    pub fn new(
        source_url: impl Into<String>,
        display_name: impl Into<String>,
    ) -> Result<Self, InvalidRequest> {
        let source_url = source_url.into();
        let display_name = display_name.into();

        if source_url.is_empty() {
            return Err(InvalidRequest::MissingUrl);
        }
        if display_name.is_empty() {
            return Err(InvalidRequest::MissingDisplayName);
        }
        if display_name.contains(['/', '\\', '\0']) || display_name == "." || display_name == ".."
        {
            return Err(InvalidRequest::InvalidDisplayName(display_name));
        }

        Ok(Self {
            source_url,
            display_name,
        })
    }

    pub fn source_url(&self) -> &str {
        &self.source_url
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }
}
