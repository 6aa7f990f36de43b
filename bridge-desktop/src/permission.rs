//! Desktop permission gate

use async_trait::async_trait;
use bridge_traits::platform::{PermissionGate, PermissionStatus};

/// Desktop hosts have no runtime storage permission; writes are always allowed.
#[derive(Debug, Clone, Copy, Default)]
pub struct GrantedPermissionGate;

#[async_trait]
impl PermissionGate for GrantedPermissionGate {
    async fn storage_write_status(&self) -> PermissionStatus {
        PermissionStatus::Granted
    }

    async fn request_storage_write(&self) {}
}
