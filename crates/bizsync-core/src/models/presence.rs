//! Device presence models

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::clock::duration_millis;

/// A device's currently-believed-reachable state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DevicePresence {
    /// Client-generated identifier, unique key
    pub device_id: String,
    /// Display label
    pub device_name: String,
    /// Coarse grouping key approximating "same local network"
    pub network_id: String,
    /// Last register/discover call (unix ms)
    pub last_seen_at: i64,
}

impl DevicePresence {
    /// A record is live while `now - last_seen_at < ttl`
    pub fn is_live(&self, now: i64, ttl: Duration) -> bool {
        now.saturating_sub(self.last_seen_at) < duration_millis(ttl)
    }

    pub fn peer(&self) -> PeerDevice {
        PeerDevice {
            device_id: self.device_id.clone(),
            device_name: self.device_name.clone(),
        }
    }
}

/// Peer entry returned to a discovering device
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeerDevice {
    pub device_id: String,
    pub device_name: String,
}
