//! Device presence registry
//!
//! Presence is process-local state with lazy expiry: a record stops being
//! reported once `now - last_seen_at` reaches the TTL, whether or not it has
//! been physically removed yet. Callers reach it through [`PresenceStore`] so a
//! shared store with native TTL support can stand in for the in-memory map.

use std::collections::HashMap;
use std::time::Duration;

use tokio::sync::Mutex;

use crate::models::DevicePresence;

/// Storage operations for device presence. None of them can fail.
#[allow(async_fn_in_trait)]
pub trait PresenceStore: Send + Sync {
    /// Insert or replace the presence record for `device_id`
    async fn upsert(&self, device_id: &str, device_name: &str, network_id: &str, now: i64);

    /// Refresh `last_seen_at`; returns `false` when no record exists
    async fn touch(&self, device_id: &str, now: i64) -> bool;

    /// Delete the record; returns `false` when no record existed
    async fn remove(&self, device_id: &str) -> bool;

    /// Live records on `network_id`, excluding `exclude_device_id`. Unordered.
    async fn list_live(
        &self,
        exclude_device_id: &str,
        network_id: &str,
        now: i64,
        ttl: Duration,
    ) -> Vec<DevicePresence>;

    /// Physically drop stale records and return how many were removed
    async fn prune_stale(&self, now: i64, ttl: Duration) -> usize;

    /// Number of live records across all networks
    async fn live_count(&self, now: i64, ttl: Duration) -> usize;
}

/// `PresenceStore` backed by a mutex-guarded map
#[derive(Debug, Default)]
pub struct InMemoryPresenceStore {
    devices: Mutex<HashMap<String, DevicePresence>>,
}

impl InMemoryPresenceStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PresenceStore for InMemoryPresenceStore {
    async fn upsert(&self, device_id: &str, device_name: &str, network_id: &str, now: i64) {
        let record = DevicePresence {
            device_id: device_id.to_string(),
            device_name: device_name.to_string(),
            network_id: network_id.to_string(),
            last_seen_at: now,
        };
        self.devices
            .lock()
            .await
            .insert(device_id.to_string(), record);
    }

    async fn touch(&self, device_id: &str, now: i64) -> bool {
        let mut devices = self.devices.lock().await;
        devices.get_mut(device_id).is_some_and(|record| {
            record.last_seen_at = now;
            true
        })
    }

    async fn remove(&self, device_id: &str) -> bool {
        self.devices.lock().await.remove(device_id).is_some()
    }

    async fn list_live(
        &self,
        exclude_device_id: &str,
        network_id: &str,
        now: i64,
        ttl: Duration,
    ) -> Vec<DevicePresence> {
        self.devices
            .lock()
            .await
            .values()
            .filter(|record| {
                record.network_id == network_id
                    && record.device_id != exclude_device_id
                    && record.is_live(now, ttl)
            })
            .cloned()
            .collect()
    }

    async fn prune_stale(&self, now: i64, ttl: Duration) -> usize {
        let mut devices = self.devices.lock().await;
        let before = devices.len();
        devices.retain(|_, record| record.is_live(now, ttl));
        before - devices.len()
    }

    async fn live_count(&self, now: i64, ttl: Duration) -> usize {
        self.devices
            .lock()
            .await
            .values()
            .filter(|record| record.is_live(now, ttl))
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TTL: Duration = Duration::from_secs(300);
    const MINUTE: i64 = 60_000;

    fn ids(records: &[DevicePresence]) -> Vec<&str> {
        let mut ids: Vec<&str> = records.iter().map(|r| r.device_id.as_str()).collect();
        ids.sort_unstable();
        ids
    }

    #[tokio::test]
    async fn upsert_replaces_existing_record() {
        let store = InMemoryPresenceStore::new();
        store.upsert("a", "Old name", "net-1", 0).await;
        store.upsert("a", "New name", "net-2", 10).await;

        let live = store.list_live("other", "net-2", 10, TTL).await;
        assert_eq!(live.len(), 1);
        assert_eq!(live[0].device_name, "New name");
        assert!(store.list_live("other", "net-1", 10, TTL).await.is_empty());
    }

    #[tokio::test]
    async fn list_live_filters_network_self_and_staleness() {
        let store = InMemoryPresenceStore::new();
        store.upsert("me", "Me", "net-1", 0).await;
        store.upsert("peer", "Peer", "net-1", 0).await;
        store.upsert("stale", "Stale", "net-1", -10 * MINUTE).await;
        store.upsert("elsewhere", "Elsewhere", "net-2", 0).await;

        let live = store.list_live("me", "net-1", MINUTE, TTL).await;
        assert_eq!(ids(&live), vec!["peer"]);
    }

    #[tokio::test]
    async fn touch_refreshes_only_known_devices() {
        let store = InMemoryPresenceStore::new();
        assert!(!store.touch("ghost", 0).await);

        store.upsert("a", "A", "net", 0).await;
        assert!(store.touch("a", 4 * MINUTE).await);

        let live = store.list_live("b", "net", 8 * MINUTE, TTL).await;
        assert_eq!(ids(&live), vec!["a"]);
    }

    #[tokio::test]
    async fn remove_is_a_noop_for_unknown_devices() {
        let store = InMemoryPresenceStore::new();
        assert!(!store.remove("ghost").await);

        store.upsert("a", "A", "net", 0).await;
        assert!(store.remove("a").await);
        assert!(store.list_live("b", "net", 0, TTL).await.is_empty());
    }

    #[tokio::test]
    async fn prune_drops_only_stale_records() {
        let store = InMemoryPresenceStore::new();
        store.upsert("old", "Old", "net", 0).await;
        store.upsert("fresh", "Fresh", "net", 5 * MINUTE).await;

        assert_eq!(store.prune_stale(6 * MINUTE, TTL).await, 1);
        assert_eq!(store.live_count(6 * MINUTE, TTL).await, 1);
        assert_eq!(store.prune_stale(6 * MINUTE, TTL).await, 0);
    }
}
