//! Network Connectivity Abstraction
//!
//! Exposes the OS view of the default network and its change callbacks.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use crate::error::Result;

/// Transport reported for the active network
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TransportType {
    /// WiFi radio
    WiFi,
    /// Wired ethernet
    Ethernet,
    /// Cellular/mobile data
    Cellular,
    /// Bluetooth tethering, VPN, loopback-like or unknown transports
    Other,
}

/// Connection class surfaced to the host UI
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionClass {
    Wifi,
    Ethernet,
    Mobile,
    Offline,
}

impl ConnectionClass {
    /// Wire representation used by the host channel
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionClass::Wifi => "wifi",
            ConnectionClass::Ethernet => "ethernet",
            ConnectionClass::Mobile => "mobile",
            ConnectionClass::Offline => "offline",
        }
    }
}

impl fmt::Display for ConnectionClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Capability set of the active network as reported by the OS.
///
/// Snapshots are handed out per query and are not meant to be retained
/// across change events.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NetworkSnapshot {
    transports: BTreeSet<TransportType>,
}

impl NetworkSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_transport(mut self, transport: TransportType) -> Self {
        self.transports.insert(transport);
        self
    }

    pub fn has_transport(&self, transport: TransportType) -> bool {
        self.transports.contains(&transport)
    }

    pub fn transports(&self) -> impl Iterator<Item = TransportType> + '_ {
        self.transports.iter().copied()
    }

    pub fn is_empty(&self) -> bool {
        self.transports.is_empty()
    }
}

/// Raw change kinds delivered by the OS default-network callback
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkChange {
    /// A default network became available
    Available,
    /// The default network was lost
    Lost,
    /// Capabilities of the default network changed
    CapabilitiesChanged,
}

/// Callback invoked from the platform's notification context
pub type NetworkCallback = Arc<dyn Fn(NetworkChange) + Send + Sync>;

/// Connectivity provider trait
///
/// Wraps the platform connectivity service:
/// - **Android**: `ConnectivityManager` + `registerDefaultNetworkCallback`
/// - **iOS/macOS**: `NWPathMonitor`
/// - **Desktop**: interface scan with polling change detection
///
/// # Example
///
/// ```ignore
/// use bridge_traits::network::{ConnectivityProvider, TransportType};
///
/// fn on_wifi(provider: &dyn ConnectivityProvider) -> bool {
///     provider
///         .active_snapshot()
///         .map(|s| s.has_transport(TransportType::WiFi))
///         .unwrap_or(false)
/// }
/// ```
pub trait ConnectivityProvider: Send + Sync {
    /// Snapshot of the current default network, `None` when there is none.
    ///
    /// Must not block longer than the underlying OS query.
    fn active_snapshot(&self) -> Option<NetworkSnapshot>;

    /// Register a default-network callback with the OS.
    ///
    /// The callback fires for every raw change, including changes that do
    /// not alter the reported transports. The returned registration must be
    /// released through [`NetworkRegistration::unregister`].
    fn register_default_network_callback(
        &self,
        callback: NetworkCallback,
    ) -> Result<Box<dyn NetworkRegistration>>;
}

/// Live OS callback registration
pub trait NetworkRegistration: Send {
    /// Release the OS registration.
    ///
    /// Implementations must not wait for in-flight callbacks to return.
    fn unregister(self: Box<Self>);
}
