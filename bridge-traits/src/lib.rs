//! # Host Bridge Traits
//!
//! Platform abstraction traits that each host must implement for the photo
//! bridge core.
//!
//! ## Overview
//!
//! This crate defines the contract between the core and platform-specific
//! implementations. Each trait is a capability the core requires but that is
//! implemented differently per platform (desktop, Android, iOS).
//!
//! ## Traits
//!
//! ### Networking
//! - [`HttpClient`](http::HttpClient) - Single-attempt HTTP with connect/transfer timeouts
//! - [`ConnectivityProvider`](network::ConnectivityProvider) - Active network snapshot and default-network callbacks
//!
//! ### Storage
//! - [`FileSystemAccess`](storage::FileSystemAccess) - Direct writes into the shared pictures directory
//! - [`MediaStore`](storage::MediaStore) - Mediated media insertion (MediaStore / photo library)
//!
//! ### Platform Integration
//! - [`PermissionGate`](platform::PermissionGate) - Storage-write runtime permission
//! - [`NotificationPresenter`](notification::NotificationPresenter) - User-visible status notifications
//! - [`DeferredTaskScheduler`](background::DeferredTaskScheduler) - At-least-once deferred execution
//!
//! ### Utilities
//! - [`LoggerSink`](logging::LoggerSink) - Forward structured logs to host logging
//!
//! ## Fail-Fast Strategy
//!
//! The core fails fast with a descriptive error when a required capability
//! is missing:
//!
//! ```ignore
//! let http_client = config.http_client.ok_or_else(|| Error::CapabilityMissing {
//!     capability: "HttpClient".to_string(),
//!     message: "No HTTP client implementation provided. \
//!               Desktop: enable the desktop-shims feature. \
//!               Mobile: inject the platform-native adapter."
//!         .to_string(),
//! })?;
//! ```
//!
//! ## Error Handling
//!
//! All bridge traits use [`BridgeError`](error::BridgeError). Implementations
//! convert platform errors into it and keep messages actionable.
//!
//! ## Thread Safety
//!
//! All bridge traits require `Send + Sync` so adapters can be shared across
//! async tasks.

pub mod background;
pub mod error;
pub mod http;
pub mod logging;
pub mod network;
pub mod notification;
pub mod platform;
pub mod storage;

pub use error::BridgeError;

// Re-export commonly used types
pub use background::{
    DeferredTaskScheduler, DeferredWorker, TaskConstraints, TaskId, TaskInput, TaskStatus,
    WorkResult,
};
pub use http::{HttpClient, HttpMethod, HttpRequest, HttpResponse};
pub use logging::{LogEntry, LogLevel, LoggerSink};
pub use network::{
    ConnectionClass, ConnectivityProvider, NetworkCallback, NetworkChange, NetworkRegistration,
    NetworkSnapshot, TransportType,
};
pub use notification::{
    Notification, NotificationChannelSpec, NotificationImportance, NotificationPresenter,
};
pub use platform::{PermissionGate, PermissionStatus, PlatformCapabilities};
pub use storage::{FileSystemAccess, MediaCollection, MediaEntry, MediaStore, MediaUri};
