use bridge_traits::BridgeError;
use core_connectivity::ConnectivityError;
use core_transfer::{PersistError, TransferOutcome};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Capability missing: {capability} - {message}")]
    CapabilityMissing { capability: String, message: String },

    #[error("Runtime error: {0}")]
    Runtime(#[from] core_runtime::Error),

    #[error("Connectivity error: {0}")]
    Connectivity(#[from] ConnectivityError),

    #[error("Bridge error: {0}")]
    Bridge(#[from] BridgeError),
}

pub type Result<T> = std::result::Result<T, CoreError>;

/// Error codes understood by the host UI layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    InvalidArguments,
    PermissionDenied,
    DownloadFailed,
    SaveFailed,
    NotImplemented,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::InvalidArguments => "INVALID_ARGUMENTS",
            ErrorCode::PermissionDenied => "PERMISSION_DENIED",
            ErrorCode::DownloadFailed => "DOWNLOAD_FAILED",
            ErrorCode::SaveFailed => "SAVE_FAILED",
            ErrorCode::NotImplemented => "NOT_IMPLEMENTED",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured failure returned to a host method call.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[error("{code}: {message}")]
pub struct MethodError {
    pub code: ErrorCode,
    pub message: String,
}

impl MethodError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn invalid_arguments(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidArguments, message)
    }

    pub fn permission_denied() -> Self {
        Self::new(ErrorCode::PermissionDenied, "Storage permission denied")
    }

    pub fn not_implemented(channel: &str, method: &str) -> Self {
        Self::new(
            ErrorCode::NotImplemented,
            format!("{} is not handled on {}", method, channel),
        )
    }

    /// Error for a failed transfer; `None` when it succeeded.
    pub fn from_outcome(outcome: &TransferOutcome) -> Option<Self> {
        let error = match outcome {
            TransferOutcome::Success(_) => return None,
            TransferOutcome::InvalidRequest(err) => Self::invalid_arguments(err.to_string()),
            TransferOutcome::DownloadFailed(err) => Self::new(
                ErrorCode::DownloadFailed,
                format!("Failed to download image: {}", err),
            ),
            TransferOutcome::PersistFailed(PersistError::PermissionDenied(_)) => {
                Self::permission_denied()
            }
            TransferOutcome::PersistFailed(err) => Self::new(
                ErrorCode::SaveFailed,
                format!("Failed to save image to gallery: {}", err),
            ),
        };
        Some(error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_transfer::{FetchError, InvalidRequest};

    #[test]
    fn test_error_code_wire_names() {
        assert_eq!(
            serde_json::to_value(ErrorCode::PermissionDenied).unwrap(),
            serde_json::json!("PERMISSION_DENIED")
        );
        assert_eq!(
            serde_json::from_value::<ErrorCode>(serde_json::json!("NOT_IMPLEMENTED")).unwrap(),
            ErrorCode::NotImplemented
        );
        assert_eq!(ErrorCode::SaveFailed.to_string(), "SAVE_FAILED");
    }

    #[test]
    fn test_outcome_mapping() {
        let download = MethodError::from_outcome(&TransferOutcome::DownloadFailed(
            FetchError::Timeout("30s".into()),
        ))
        .unwrap();
        assert_eq!(download.code, ErrorCode::DownloadFailed);

        let encode = MethodError::from_outcome(&TransferOutcome::PersistFailed(
            PersistError::EncodeFailed("png".into()),
        ))
        .unwrap();
        assert_eq!(encode.code, ErrorCode::SaveFailed);

        let denied = MethodError::from_outcome(&TransferOutcome::PersistFailed(
            PersistError::PermissionDenied("storage".into()),
        ))
        .unwrap();
        assert_eq!(denied, MethodError::permission_denied());

        let invalid =
            MethodError::from_outcome(&TransferOutcome::InvalidRequest(InvalidRequest::MissingUrl))
                .unwrap();
        assert_eq!(invalid.code, ErrorCode::InvalidArguments);
    }
}
