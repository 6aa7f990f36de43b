use bridge_traits::BridgeError;
use thiserror::Error;

/// Why a download did not produce an image.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("Malformed URL: {0}")]
    MalformedUrl(String),

    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Download timed out: {0}")]
    Timeout(String),

    #[error("Payload is not a decodable image: {0}")]
    DecodeFailed(String),
}

impl FetchError {
    pub fn kind(&self) -> &'static str {
        match self {
            FetchError::MalformedUrl(_) => "malformed_url",
            FetchError::ConnectionFailed(_) => "connection_failed",
            FetchError::Timeout(_) => "timeout",
            FetchError::DecodeFailed(_) => "decode_failed",
        }
    }
}

impl From<BridgeError> for FetchError {
    fn from(err: BridgeError) -> Self {
        match err {
            BridgeError::InvalidUrl(msg) => FetchError::MalformedUrl(msg),
            BridgeError::Timeout(msg) => FetchError::Timeout(msg),
            other => FetchError::ConnectionFailed(other.to_string()),
        }
    }
}

/// Why a decoded image could not be written to the media library.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PersistError {
    #[error("Storage permission denied: {0}")]
    PermissionDenied(String),

    #[error("Media store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Failed to encode image: {0}")]
    EncodeFailed(String),

    #[error("I/O failure while saving: {0}")]
    IoFailed(String),
}

impl PersistError {
    pub fn kind(&self) -> &'static str {
        match self {
            PersistError::PermissionDenied(_) => "permission_denied",
            PersistError::StoreUnavailable(_) => "store_unavailable",
            PersistError::EncodeFailed(_) => "encode_failed",
            PersistError::IoFailed(_) => "io_failed",
        }
    }

    /// Whether a later attempt may succeed without caller action.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            PersistError::StoreUnavailable(_) | PersistError::IoFailed(_)
        )
    }

    pub(crate) fn io(err: BridgeError) -> Self {
        if err.is_permission_denied() {
            PersistError::PermissionDenied(err.to_string())
        } else {
            PersistError::IoFailed(err.to_string())
        }
    }

    pub(crate) fn store(err: BridgeError) -> Self {
        if err.is_permission_denied() {
            PersistError::PermissionDenied(err.to_string())
        } else {
            PersistError::StoreUnavailable(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bridge_errors_classify_as_fetch_failures() {
        assert!(matches!(
            FetchError::from(BridgeError::InvalidUrl("x".into())),
            FetchError::MalformedUrl(_)
        ));
        assert!(matches!(
            FetchError::from(BridgeError::Timeout("x".into())),
            FetchError::Timeout(_)
        ));
        assert!(matches!(
            FetchError::from(BridgeError::OperationFailed("x".into())),
            FetchError::ConnectionFailed(_)
        ));
    }

    #[test]
    fn test_persist_transience() {
        assert!(PersistError::IoFailed("disk".into()).is_transient());
        assert!(PersistError::StoreUnavailable("broker".into()).is_transient());
        assert!(!PersistError::EncodeFailed("png".into()).is_transient());
        assert!(!PersistError::PermissionDenied("storage".into()).is_transient());
    }

    #[test]
    fn test_permission_io_is_not_plain_io() {
        let denied = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "ro");
        assert!(matches!(
            PersistError::io(BridgeError::Io(denied)),
            PersistError::PermissionDenied(_)
        ));
        assert!(matches!(
            PersistError::store(BridgeError::NotAvailable("gone".into())),
            PersistError::StoreUnavailable(_)
        ));
    }
}
