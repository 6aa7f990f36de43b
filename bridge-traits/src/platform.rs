//! Platform capability probing and runtime permissions.
//!
//! Capabilities are probed once when the core is configured; business logic
//! consults the resulting [`PlatformCapabilities`] instead of branching on OS
//! versions.

use async_trait::async_trait;

/// First Android API level with scoped storage and `MediaStore` relative paths (Q).
pub const MEDIATED_STORE_MIN_API_LEVEL: u32 = 29;

/// First Android API level that no longer grants `WRITE_EXTERNAL_STORAGE` (Tiramisu).
pub const STORAGE_PERMISSION_MAX_API_LEVEL: u32 = 33;

/// Capabilities that select persistence strategy and permission gating
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlatformCapabilities {
    /// Media must be inserted through a broker that allocates the final path
    pub mediated_media_store: bool,
    /// Writing to shared storage needs an explicit runtime permission
    pub storage_permission_required: bool,
}

impl PlatformCapabilities {
    /// Capabilities of an Android device at the given API level
    pub fn from_api_level(api_level: u32) -> Self {
        Self {
            mediated_media_store: api_level >= MEDIATED_STORE_MIN_API_LEVEL,
            storage_permission_required: api_level < STORAGE_PERMISSION_MAX_API_LEVEL,
        }
    }

    /// Desktop hosts write straight into the user's pictures directory
    pub fn desktop() -> Self {
        Self {
            mediated_media_store: false,
            storage_permission_required: false,
        }
    }

    /// Apple platforms always go through the photo library
    pub fn photo_library() -> Self {
        Self {
            mediated_media_store: true,
            storage_permission_required: false,
        }
    }
}

impl Default for PlatformCapabilities {
    fn default() -> Self {
        Self::desktop()
    }
}

/// Permission grant state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionStatus {
    Granted,
    Denied,
    /// The user has not answered a prompt yet
    NotDetermined,
}

impl PermissionStatus {
    pub fn is_granted(&self) -> bool {
        matches!(self, PermissionStatus::Granted)
    }
}

/// Runtime permission gate
///
/// - **Android < 13**: `WRITE_EXTERNAL_STORAGE` check + `requestPermissions`
/// - **Desktop**: always granted
#[async_trait]
pub trait PermissionGate: Send + Sync {
    /// Current storage-write grant
    async fn storage_write_status(&self) -> PermissionStatus;

    /// Ask the host to prompt the user.
    ///
    /// Fire-and-forget: the answer is observed on a later
    /// [`storage_write_status`](PermissionGate::storage_write_status) call.
    async fn request_storage_write(&self);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capabilities_from_api_level() {
        let legacy = PlatformCapabilities::from_api_level(28);
        assert!(!legacy.mediated_media_store);
        assert!(legacy.storage_permission_required);

        let scoped = PlatformCapabilities::from_api_level(29);
        assert!(scoped.mediated_media_store);
        assert!(scoped.storage_permission_required);

        let modern = PlatformCapabilities::from_api_level(33);
        assert!(modern.mediated_media_store);
        assert!(!modern.storage_permission_required);
    }

    #[test]
    fn test_desktop_defaults() {
        let caps = PlatformCapabilities::default();
        assert_eq!(caps, PlatformCapabilities::desktop());
        assert!(!caps.mediated_media_store);
        assert!(!caps.storage_permission_required);
        assert!(PlatformCapabilities::photo_library().mediated_media_store);
    }

    #[test]
    fn test_permission_status() {
        assert!(PermissionStatus::Granted.is_granted());
        assert!(!PermissionStatus::Denied.is_granted());
        assert!(!PermissionStatus::NotDetermined.is_granted());
    }
}
