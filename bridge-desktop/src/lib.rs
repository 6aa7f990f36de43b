//! # Desktop Bridge Implementations
//!
//! Default implementations of bridge traits for desktop platforms
//! (macOS, Windows, Linux).
//!
//! ## Overview
//!
//! - `HttpClient` using `reqwest`
//! - `FileSystemAccess` using `tokio::fs` rooted at the user's pictures directory
//! - `MediaStore` as an indexed pictures directory with pending entries
//! - `ConnectivityProvider` probing `/sys/class/net` with polling change detection
//! - `NotificationPresenter` as structured log lines
//! - `PermissionGate` that always grants (no runtime permissions on desktop)
//! - `DeferredTaskScheduler` using Tokio tasks with in-process re-delivery
//!
//! ## Usage
//!
//! ```ignore
//! use bridge_desktop::{ReqwestHttpClient, TokioFileSystem};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let http_client = ReqwestHttpClient::new()?;
//!     let fs = TokioFileSystem::new();
//!
//!     // Use in core configuration
//!     Ok(())
//! }
//! ```

mod background;
mod filesystem;
mod http;
mod media_store;
mod network;
mod notification;
mod permission;

pub use background::{RetryBackoff, TokioDeferredScheduler};
pub use filesystem::TokioFileSystem;
pub use http::ReqwestHttpClient;
pub use media_store::LocalMediaStore;
pub use network::SysfsConnectivityProvider;
pub use notification::TracingNotificationPresenter;
pub use permission::GrantedPermissionGate;
