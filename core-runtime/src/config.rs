//! # Bridge Configuration Module
//!
//! Builder-based configuration holding every host bridge and tunable the
//! photo bridge core needs.
//!
//! ## Overview
//!
//! [`BridgeConfig`] is assembled through [`BridgeConfigBuilder`], which
//! validates eagerly so a misconfigured host fails at startup with an
//! actionable message instead of at the first transfer.
//!
//! ## Required Bridges
//!
//! - `HttpClient` - image download
//! - `ConnectivityProvider` - default-network snapshots and change callbacks
//! - `NotificationPresenter` - status notifications
//! - `PermissionGate` - storage-write permission
//! - `MediaStore` when [`PlatformCapabilities::mediated_media_store`] is set,
//!   `FileSystemAccess` otherwise
//!
//! ## Optional Bridges
//!
//! - `DeferredTaskScheduler` - background transfers
//!
//! When the `desktop-shims` feature is enabled, `bridge-desktop` adapters are
//! injected for every bridge that was not provided.
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::BridgeConfig;
//! use bridge_traits::PlatformCapabilities;
//! use std::time::Duration;
//!
//! let config = BridgeConfig::builder()
//!     .capabilities(PlatformCapabilities::from_api_level(34))
//!     .http_client(Arc::new(MyHttpClient))
//!     .media_store(Arc::new(MyMediaStore))
//!     .connectivity_provider(Arc::new(MyConnectivity))
//!     .notification_presenter(Arc::new(MyPresenter))
//!     .permission_gate(Arc::new(MyPermissionGate))
//!     .fetch_timeout(Duration::from_secs(20))
//!     .build()?;
//! ```

use crate::error::{Error, Result};
use crate::events::DEFAULT_EVENT_BUFFER_SIZE;
use bridge_traits::{
    ConnectivityProvider, DeferredTaskScheduler, FileSystemAccess, HttpClient, MediaStore,
    NotificationChannelSpec, NotificationImportance, NotificationPresenter, PermissionGate,
    PlatformCapabilities,
};
use std::sync::Arc;
use std::time::Duration;

/// Default bound for connection establishment and for data transfer.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Longest accepted fetch timeout.
pub const MAX_FETCH_TIMEOUT: Duration = Duration::from_secs(10 * 60);

/// Platform notification id shared by every transfer notification.
pub const DEFAULT_NOTIFICATION_ID: i32 = 1001;

pub const DEFAULT_CHANNEL_ID: &str = "auto_photo_saver_channel";
pub const DEFAULT_CHANNEL_NAME: &str = "Auto Photo Saver";
pub const DEFAULT_CHANNEL_DESCRIPTION: &str = "Background photo processing notifications";

/// Notification channel used for transfer status updates.
pub fn default_notification_channel() -> NotificationChannelSpec {
    NotificationChannelSpec::new(DEFAULT_CHANNEL_ID, DEFAULT_CHANNEL_NAME)
        .with_description(DEFAULT_CHANNEL_DESCRIPTION)
        .with_importance(NotificationImportance::Low)
}

/// Validated configuration for the photo bridge core.
#[derive(Clone)]
pub struct BridgeConfig {
    pub http_client: Arc<dyn HttpClient>,

    /// Direct-write target (used when the platform has no mediated store)
    pub file_system: Option<Arc<dyn FileSystemAccess>>,

    /// Mediated insertion broker (used when the platform has one)
    pub media_store: Option<Arc<dyn MediaStore>>,

    pub connectivity_provider: Arc<dyn ConnectivityProvider>,

    pub notification_presenter: Arc<dyn NotificationPresenter>,

    pub permission_gate: Arc<dyn PermissionGate>,

    /// Background execution facility (optional)
    pub deferred_scheduler: Option<Arc<dyn DeferredTaskScheduler>>,

    /// Probed platform capabilities; selects persistence and permission gating
    pub capabilities: PlatformCapabilities,

    /// Applied independently to connect and transfer
    pub fetch_timeout: Duration,

    pub notification_channel: NotificationChannelSpec,

    pub notification_id: i32,

    pub event_buffer_size: usize,
}

impl std::fmt::Debug for BridgeConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BridgeConfig")
            .field("file_system", &self.file_system.as_ref().map(|_| "FileSystemAccess { ... }"))
            .field("media_store", &self.media_store.as_ref().map(|_| "MediaStore { ... }"))
            .field(
                "deferred_scheduler",
                &self
                    .deferred_scheduler
                    .as_ref()
                    .map(|_| "DeferredTaskScheduler { ... }"),
            )
            .field("capabilities", &self.capabilities)
            .field("fetch_timeout", &self.fetch_timeout)
            .field("notification_channel", &self.notification_channel)
            .field("notification_id", &self.notification_id)
            .field("event_buffer_size", &self.event_buffer_size)
            .finish()
    }
}

impl BridgeConfig {
    /// Creates a new builder with default settings.
    pub fn builder() -> BridgeConfigBuilder {
        BridgeConfigBuilder::default()
    }

    /// Validates the configuration and returns an error if invalid.
    ///
    /// This checks:
    /// - Fetch timeout is > 0 and at most 10 minutes
    /// - Notification channel id is not empty
    /// - Event buffer size is > 0
    /// - The persistence bridge matching the capabilities is present
    pub fn validate(&self) -> Result<()> {
        if self.fetch_timeout.is_zero() {
            return Err(Error::Config(
                "Fetch timeout must be greater than 0".to_string(),
            ));
        }

        if self.fetch_timeout > MAX_FETCH_TIMEOUT {
            return Err(Error::Config(format!(
                "Fetch timeout exceeds maximum of {} seconds",
                MAX_FETCH_TIMEOUT.as_secs()
            )));
        }

        if self.notification_channel.id.trim().is_empty() {
            return Err(Error::Config(
                "Notification channel id cannot be empty".to_string(),
            ));
        }

        if self.event_buffer_size == 0 {
            return Err(Error::Config(
                "Event buffer size must be greater than 0".to_string(),
            ));
        }

        if self.capabilities.mediated_media_store && self.media_store.is_none() {
            return Err(Error::CapabilityMissing {
                capability: "MediaStore".to_string(),
                message: "Platform reports a mediated media store but no MediaStore was provided. \
                          Inject the platform media broker or probe capabilities again."
                    .to_string(),
            });
        }

        if !self.capabilities.mediated_media_store && self.file_system.is_none() {
            return Err(Error::CapabilityMissing {
                capability: "FileSystemAccess".to_string(),
                message: "Direct persistence needs a FileSystemAccess implementation. \
                          Desktop: enable the 'desktop-shims' feature."
                    .to_string(),
            });
        }

        Ok(())
    }
}

/// Builder for [`BridgeConfig`].
#[derive(Default)]
pub struct BridgeConfigBuilder {
    http_client: Option<Arc<dyn HttpClient>>,
    file_system: Option<Arc<dyn FileSystemAccess>>,
    media_store: Option<Arc<dyn MediaStore>>,
    connectivity_provider: Option<Arc<dyn ConnectivityProvider>>,
    notification_presenter: Option<Arc<dyn NotificationPresenter>>,
    permission_gate: Option<Arc<dyn PermissionGate>>,
    deferred_scheduler: Option<Arc<dyn DeferredTaskScheduler>>,
    capabilities: Option<PlatformCapabilities>,
    fetch_timeout: Option<Duration>,
    notification_channel: Option<NotificationChannelSpec>,
    notification_id: Option<i32>,
    event_buffer_size: Option<usize>,
}

impl BridgeConfigBuilder {
    pub fn http_client(mut self, client: Arc<dyn HttpClient>) -> Self {
        self.http_client = Some(client);
        self
    }

    pub fn file_system(mut self, fs: Arc<dyn FileSystemAccess>) -> Self {
        self.file_system = Some(fs);
        self
    }

    pub fn media_store(mut self, store: Arc<dyn MediaStore>) -> Self {
        self.media_store = Some(store);
        self
    }

    pub fn connectivity_provider(mut self, provider: Arc<dyn ConnectivityProvider>) -> Self {
        self.connectivity_provider = Some(provider);
        self
    }

    pub fn notification_presenter(mut self, presenter: Arc<dyn NotificationPresenter>) -> Self {
        self.notification_presenter = Some(presenter);
        self
    }

    pub fn permission_gate(mut self, gate: Arc<dyn PermissionGate>) -> Self {
        self.permission_gate = Some(gate);
        self
    }

    pub fn deferred_scheduler(mut self, scheduler: Arc<dyn DeferredTaskScheduler>) -> Self {
        self.deferred_scheduler = Some(scheduler);
        self
    }

    /// Sets the probed platform capabilities (desktop when unset).
    pub fn capabilities(mut self, capabilities: PlatformCapabilities) -> Self {
        self.capabilities = Some(capabilities);
        self
    }

    /// Sets the connect and transfer bound (default 30 seconds).
    pub fn fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = Some(timeout);
        self
    }

    pub fn notification_channel(mut self, channel: NotificationChannelSpec) -> Self {
        self.notification_channel = Some(channel);
        self
    }

    pub fn notification_id(mut self, id: i32) -> Self {
        self.notification_id = Some(id);
        self
    }

    pub fn event_buffer_size(mut self, size: usize) -> Self {
        self.event_buffer_size = Some(size);
        self
    }

    /// Builds the configuration, filling desktop defaults when available.
    ///
    /// # Errors
    ///
    /// - `Error::CapabilityMissing` when a required bridge is absent and no
    ///   desktop default can stand in
    /// - `Error::Config` when a setting is out of range
    pub fn build(self) -> Result<BridgeConfig> {
        let capabilities = self.capabilities.unwrap_or_default();
        let fetch_timeout = self.fetch_timeout.unwrap_or(DEFAULT_FETCH_TIMEOUT);

        let http_client = match self.http_client {
            Some(client) => client,
            None => defaults::http_client(fetch_timeout)?,
        };

        let connectivity_provider = match self.connectivity_provider {
            Some(provider) => provider,
            None => defaults::connectivity_provider()?,
        };

        let notification_presenter = match self.notification_presenter {
            Some(presenter) => presenter,
            None => defaults::notification_presenter()?,
        };

        let permission_gate = match self.permission_gate {
            Some(gate) => gate,
            None => defaults::permission_gate()?,
        };

        let file_system = self.file_system.or_else(defaults::file_system);
        let media_store = self.media_store.or_else(defaults::media_store);
        let deferred_scheduler = self
            .deferred_scheduler
            .or_else(|| defaults::deferred_scheduler(&connectivity_provider));

        let config = BridgeConfig {
            http_client,
            file_system,
            media_store,
            connectivity_provider,
            notification_presenter,
            permission_gate,
            deferred_scheduler,
            capabilities,
            fetch_timeout,
            notification_channel: self
                .notification_channel
                .unwrap_or_else(default_notification_channel),
            notification_id: self.notification_id.unwrap_or(DEFAULT_NOTIFICATION_ID),
            event_buffer_size: self.event_buffer_size.unwrap_or(DEFAULT_EVENT_BUFFER_SIZE),
        };

        config.validate()?;

        Ok(config)
    }
}

#[cfg(feature = "desktop-shims")]
mod defaults {
    use super::*;
    use bridge_desktop::{
        GrantedPermissionGate, LocalMediaStore, ReqwestHttpClient, SysfsConnectivityProvider,
        TokioDeferredScheduler, TokioFileSystem, TracingNotificationPresenter,
    };

    pub(super) fn http_client(fetch_timeout: Duration) -> Result<Arc<dyn HttpClient>> {
        let client = ReqwestHttpClient::with_timeouts(fetch_timeout, fetch_timeout).map_err(|e| {
            Error::CapabilityMissing {
                capability: "HttpClient".to_string(),
                message: format!("Desktop HTTP client could not be created: {}", e),
            }
        })?;
        Ok(Arc::new(client))
    }

    pub(super) fn connectivity_provider() -> Result<Arc<dyn ConnectivityProvider>> {
        Ok(Arc::new(SysfsConnectivityProvider::new()))
    }

    pub(super) fn notification_presenter() -> Result<Arc<dyn NotificationPresenter>> {
        Ok(Arc::new(TracingNotificationPresenter::new()))
    }

    pub(super) fn permission_gate() -> Result<Arc<dyn PermissionGate>> {
        Ok(Arc::new(GrantedPermissionGate))
    }

    pub(super) fn file_system() -> Option<Arc<dyn FileSystemAccess>> {
        Some(Arc::new(TokioFileSystem::new()))
    }

    pub(super) fn media_store() -> Option<Arc<dyn MediaStore>> {
        Some(Arc::new(LocalMediaStore::new()))
    }

    pub(super) fn deferred_scheduler(
        connectivity: &Arc<dyn ConnectivityProvider>,
    ) -> Option<Arc<dyn DeferredTaskScheduler>> {
        Some(Arc::new(TokioDeferredScheduler::with_connectivity(Some(
            Arc::clone(connectivity),
        ))))
    }
}

#[cfg(not(feature = "desktop-shims"))]
mod defaults {
    use super::*;

    fn missing(capability: &str, purpose: &str) -> Error {
        Error::CapabilityMissing {
            capability: capability.to_string(),
            message: format!(
                "{} implementation is required for {}. \
                 Desktop: enable the 'desktop-shims' feature. \
                 Mobile: inject the platform-native adapter.",
                capability, purpose
            ),
        }
    }

    pub(super) fn http_client(_fetch_timeout: Duration) -> Result<Arc<dyn HttpClient>> {
        Err(missing("HttpClient", "image downloads"))
    }

    pub(super) fn connectivity_provider() -> Result<Arc<dyn ConnectivityProvider>> {
        Err(missing("ConnectivityProvider", "network type reporting"))
    }

    pub(super) fn notification_presenter() -> Result<Arc<dyn NotificationPresenter>> {
        Err(missing("NotificationPresenter", "transfer notifications"))
    }

    pub(super) fn permission_gate() -> Result<Arc<dyn PermissionGate>> {
        Err(missing("PermissionGate", "storage permission checks"))
    }

    pub(super) fn file_system() -> Option<Arc<dyn FileSystemAccess>> {
        None
    }

    pub(super) fn media_store() -> Option<Arc<dyn MediaStore>> {
        None
    }

    pub(super) fn deferred_scheduler(
        _connectivity: &Arc<dyn ConnectivityProvider>,
    ) -> Option<Arc<dyn DeferredTaskScheduler>> {
        None
    }
}
