//! Transfer results.

use crate::error::{FetchError, PersistError};
use crate::notifier::Notice;
use crate::persister::PersistedLocation;
use crate::request::InvalidRequest;
use std::fmt;

/// The single externally visible result of a transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferOutcome {
    Success(PersistedLocation),
    DownloadFailed(FetchError),
    PersistFailed(PersistError),
    InvalidRequest(InvalidRequest),
}

impl TransferOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, TransferOutcome::Success(_))
    }

    /// Whether a deferred facility should deliver the request again.
    ///
    /// Downloads are always worth another attempt; persistence only when the
    /// failure is transient.
    pub fn is_retryable(&self) -> bool {
        match self {
            TransferOutcome::Success(_) | TransferOutcome::InvalidRequest(_) => false,
            TransferOutcome::DownloadFailed(_) => true,
            TransferOutcome::PersistFailed(err) => err.is_transient(),
        }
    }

    /// Host-facing error code; `None` on success.
    pub fn error_code(&self) -> Option<&'static str> {
        match self {
            TransferOutcome::Success(_) => None,
            TransferOutcome::InvalidRequest(_) => Some("INVALID_ARGUMENTS"),
            TransferOutcome::DownloadFailed(_) => Some("DOWNLOAD_FAILED"),
            TransferOutcome::PersistFailed(PersistError::PermissionDenied(_)) => {
                Some("PERMISSION_DENIED")
            }
            TransferOutcome::PersistFailed(_) => Some("SAVE_FAILED"),
        }
    }

    /// Notification summarising this outcome.
    pub fn notice(&self, display_name: &str) -> Notice {
        match self {
            TransferOutcome::Success(_) => Notice::new(
                "Image Saved",
                format!("New photo saved to gallery: {}", display_name),
            ),
            TransferOutcome::DownloadFailed(_) => {
                Notice::new("Download Failed", "Failed to download image")
            }
            TransferOutcome::PersistFailed(PersistError::PermissionDenied(_)) => {
                Notice::new("Permission Denied", "Storage permission denied")
            }
            TransferOutcome::PersistFailed(_) => {
                Notice::new("Save Failed", "Failed to save image to gallery")
            }
            TransferOutcome::InvalidRequest(_) => {
                Notice::new("Invalid Request", "Missing URL or fileName")
            }
        }
    }
}

impl fmt::Display for TransferOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransferOutcome::Success(location) => write!(f, "saved to {}", location),
            TransferOutcome::DownloadFailed(err) => write!(f, "download failed: {}", err),
            TransferOutcome::PersistFailed(err) => write!(f, "save failed: {}", err),
            TransferOutcome::InvalidRequest(err) => write!(f, "invalid request: {}", err),
        }
    }
}
