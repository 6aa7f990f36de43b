//! Snapshot classification.

use bridge_traits::network::{ConnectionClass, NetworkSnapshot, TransportType};

/// Evaluation order when several transports are up at once.
const PRIORITY: [(TransportType, ConnectionClass); 3] = [
    (TransportType::WiFi, ConnectionClass::Wifi),
    (TransportType::Ethernet, ConnectionClass::Ethernet),
    (TransportType::Cellular, ConnectionClass::Mobile),
];

/// Classify a network snapshot.
///
/// The first transport in the order wifi, ethernet, cellular that the
/// snapshot reports wins; anything else is `Offline`.
pub fn classify(snapshot: &NetworkSnapshot) -> ConnectionClass {
    PRIORITY
        .iter()
        .find(|(transport, _)| snapshot.has_transport(*transport))
        .map(|(_, class)| *class)
        .unwrap_or(ConnectionClass::Offline)
}

/// Classify the active network, treating "no default network" as `Offline`.
pub fn classify_active(snapshot: Option<&NetworkSnapshot>) -> ConnectionClass {
    snapshot.map_or(ConnectionClass::Offline, classify)
}
