//! Connectivity probing via `/sys/class/net`

use bridge_traits::{
    error::{BridgeError, Result},
    network::{
        ConnectivityProvider, NetworkCallback, NetworkChange, NetworkRegistration,
        NetworkSnapshot, TransportType,
    },
};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, trace};

const DEFAULT_SYSFS_ROOT: &str = "/sys/class/net";
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// `ARPHRD_ETHER` from `linux/if_arp.h`
const ARPHRD_ETHER: &str = "1";

/// Desktop connectivity provider
///
/// Classifies every interface whose `operstate` is `up`:
/// - a `wireless` or `phy80211` entry marks Wi-Fi
/// - `DEVTYPE=wwan` in `uevent` (or a `wwan*` name) marks cellular
/// - a physical (`device` link) `ARPHRD_ETHER` interface marks Ethernet
///
/// Loopback and virtual interfaces are ignored. Cellular links are reported
/// as metered. Changes are detected by polling; hosts without sysfs always
/// report no network.
pub struct SysfsConnectivityProvider {
    root: PathBuf,
    poll_interval: Duration,
}

impl SysfsConnectivityProvider {
    pub fn new() -> Self {
        Self::with_root(PathBuf::from(DEFAULT_SYSFS_ROOT))
    }

    /// Probe a custom sysfs-like tree
    pub fn with_root(root: PathBuf) -> Self {
        Self {
            root,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    fn read_trimmed(path: &Path) -> Option<String> {
        fs::read_to_string(path).ok().map(|s| s.trim().to_string())
    }

    fn classify_interface(iface: &Path, name: &str) -> Option<TransportType> {
        if Self::read_trimmed(&iface.join("operstate")).as_deref() != Some("up") {
            return None;
        }

        if iface.join("wireless").exists() || iface.join("phy80211").exists() {
            return Some(TransportType::WiFi);
        }

        let is_wwan = name.starts_with("wwan")
            || Self::read_trimmed(&iface.join("uevent"))
                .map(|uevent| uevent.lines().any(|line| line.trim() == "DEVTYPE=wwan"))
                .unwrap_or(false);
        if is_wwan {
            return Some(TransportType::Cellular);
        }

        // Virtual interfaces (bridges, veth, tun) have no backing device
        if !iface.join("device").exists() {
            return None;
        }

        if Self::read_trimmed(&iface.join("type")).as_deref() == Some(ARPHRD_ETHER) {
            Some(TransportType::Ethernet)
        } else {
            Some(TransportType::Other)
        }
    }

    fn probe(root: &Path) -> Option<NetworkSnapshot> {
        let entries = match fs::read_dir(root) {
            Ok(entries) => entries,
            Err(e) => {
                trace!(error = %e, "Network interface tree unavailable");
                return None;
            }
        };

        let mut snapshot = NetworkSnapshot::new();
        for entry in entries.flatten() {
            let name = entry.file_name().to_string_lossy().into_owned();
            if name == "lo" {
                continue;
            }
            if let Some(transport) = Self::classify_interface(&entry.path(), &name) {
                snapshot = snapshot.with_transport(transport);
            }
        }

        (!snapshot.is_empty()).then_some(snapshot)
    }
}

impl Default for SysfsConnectivityProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl ConnectivityProvider for SysfsConnectivityProvider {
    fn active_snapshot(&self) -> Option<NetworkSnapshot> {
        Self::probe(&self.root)
    }

    fn register_default_network_callback(
        &self,
        callback: NetworkCallback,
    ) -> Result<Box<dyn NetworkRegistration>> {
        let handle = tokio::runtime::Handle::try_current().map_err(|e| {
            BridgeError::NotAvailable(format!("Network polling needs a Tokio runtime: {}", e))
        })?;

        let root = self.root.clone();
        let interval = self.poll_interval;
        let task = handle.spawn(async move {
            let mut last = Self::probe(&root);
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await;

            loop {
                ticker.tick().await;
                let current = Self::probe(&root);
                if current == last {
                    continue;
                }

                let change = match (&last, &current) {
                    (None, Some(_)) => NetworkChange::Available,
                    (Some(_), None) => NetworkChange::Lost,
                    _ => NetworkChange::CapabilitiesChanged,
                };
                debug!(?change, "Default network changed");
                last = current;
                callback(change);
            }
        });

        Ok(Box::new(PollingRegistration { task }))
    }
}

struct PollingRegistration {
    task: JoinHandle<()>,
}

impl NetworkRegistration for PollingRegistration {
    fn unregister(self: Box<Self>) {
        self.task.abort();
    }
}
