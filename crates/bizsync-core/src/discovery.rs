//! Peer discovery over the presence registry.

use std::sync::Arc;
use std::time::Duration;

use crate::models::PeerDevice;
use crate::presence::PresenceStore;
use crate::util::device_fingerprint;

/// Presence TTL used when none is configured
pub const DEFAULT_PRESENCE_TTL: Duration = Duration::from_secs(5 * 60);

/// Answers "who else is nearby" and keeps the caller's presence fresh
pub struct DiscoveryService<P> {
    presence: Arc<P>,
    ttl: Duration,
}

impl<P: PresenceStore> DiscoveryService<P> {
    pub const fn new(presence: Arc<P>, ttl: Duration) -> Self {
        Self { presence, ttl }
    }

    pub const fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Live peers on `network_id`, excluding the caller.
    ///
    /// Peers are collected before the caller's own presence is refreshed. A
    /// caller with no record is registered implicitly under `device_name`.
    pub async fn discover(
        &self,
        device_id: &str,
        device_name: &str,
        network_id: &str,
        now: i64,
    ) -> Vec<PeerDevice> {
        let peers: Vec<PeerDevice> = self
            .presence
            .list_live(device_id, network_id, now, self.ttl)
            .await
            .iter()
            .map(|record| record.peer())
            .collect();

        if !self.presence.touch(device_id, now).await {
            tracing::debug!(
                device = device_fingerprint(device_id),
                "Implicit register on discover"
            );
            self.presence
                .upsert(device_id, device_name, network_id, now)
                .await;
        }

        peers
    }
}
