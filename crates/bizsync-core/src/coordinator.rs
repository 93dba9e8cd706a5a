//! Request-level façade over presence, discovery and reconciliation.
//!
//! Register, discover and unregister only touch the presence registry; sync is
//! the only operation that reaches the durable entity store.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::clock::Clock;
use crate::db::EntityStore;
use crate::discovery::DiscoveryService;
use crate::models::{DuplicateFinding, PeerDevice, SyncBatch};
use crate::presence::PresenceStore;
use crate::reconcile::{reconcile, ReconcileOutcome, SyncCounts};
use crate::util::device_fingerprint;

/// Operations a device can request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Register,
    Discover,
    Sync,
    Unregister,
}

impl Action {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "register" => Some(Self::Register),
            "discover" => Some(Self::Discover),
            "sync" => Some(Self::Sync),
            "unregister" => Some(Self::Unregister),
            _ => None,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Register => "register",
            Self::Discover => "discover",
            Self::Sync => "sync",
            Self::Unregister => "unregister",
        }
    }
}

/// Body of a device request
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncRequest {
    pub action: String,
    #[serde(default)]
    pub device_id: String,
    #[serde(default)]
    pub device_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<SyncBatch>,
}

impl SyncRequest {
    /// Check the request shape without touching any store.
    ///
    /// A sync must carry `data`; every action needs a non-blank device id.
    pub fn validate(&self) -> Result<Action, SyncError> {
        let action = Action::parse(&self.action)
            .ok_or_else(|| SyncError::UnknownAction(self.action.clone()))?;
        if self.device_id.trim().is_empty() {
            return Err(SyncError::MissingDeviceId);
        }
        if action == Action::Sync && self.data.is_none() {
            return Err(SyncError::MissingData);
        }
        Ok(action)
    }
}

/// Result of a sync action. Both variants are normal outcomes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SyncReport {
    DuplicatesFound {
        duplicates: Vec<DuplicateFinding>,
        message: String,
    },
    Synced {
        results: SyncCounts,
        message: String,
    },
}

impl From<ReconcileOutcome> for SyncReport {
    fn from(outcome: ReconcileOutcome) -> Self {
        let message = outcome.message();
        match outcome {
            ReconcileOutcome::DuplicatesFound(duplicates) => Self::DuplicatesFound {
                duplicates,
                message,
            },
            ReconcileOutcome::Synced(results) => Self::Synced { results, message },
        }
    }
}

/// Successful response body for any action
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SyncResponse {
    Ack { success: bool },
    Devices { devices: Vec<PeerDevice> },
    Report(SyncReport),
}

impl SyncResponse {
    const fn ack() -> Self {
        Self::Ack { success: true }
    }
}

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("No data provided for sync")]
    MissingData,
    #[error("Unknown action")]
    UnknownAction(String),
    #[error("deviceId is required")]
    MissingDeviceId,
    #[error(transparent)]
    Store(#[from] crate::Error),
}

impl SyncError {
    /// Whether the caller, not the server, is at fault
    pub const fn is_client_error(&self) -> bool {
        !matches!(self, Self::Store(_))
    }
}

/// Dispatches device requests. Holds no per-request state.
pub struct SyncCoordinator<S, P> {
    store: S,
    presence: Arc<P>,
    discovery: DiscoveryService<P>,
    clock: Arc<dyn Clock>,
}

impl<S: EntityStore, P: PresenceStore> SyncCoordinator<S, P> {
    pub fn new(store: S, presence: Arc<P>, presence_ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            discovery: DiscoveryService::new(Arc::clone(&presence), presence_ttl),
            presence,
            clock,
        }
    }

    pub const fn store(&self) -> &S {
        &self.store
    }

    /// Record the device as present on `network_id`
    pub async fn register(&self, device_id: &str, device_name: &str, network_id: &str) {
        let now = self.clock.now_millis();
        self.presence
            .upsert(device_id, device_name, network_id, now)
            .await;
        tracing::info!(device = device_fingerprint(device_id), "Device registered");
    }

    /// Live peers on the caller's network
    pub async fn discover(
        &self,
        device_id: &str,
        device_name: &str,
        network_id: &str,
    ) -> Vec<PeerDevice> {
        let now = self.clock.now_millis();
        let peers = self
            .discovery
            .discover(device_id, device_name, network_id, now)
            .await;
        tracing::debug!(
            device = device_fingerprint(device_id),
            peers = peers.len(),
            "Discovery answered"
        );
        peers
    }

    /// Reconcile a batch from one device
    pub async fn sync(
        &self,
        device_id: &str,
        batch: Option<&SyncBatch>,
    ) -> Result<SyncReport, SyncError> {
        let batch = batch.ok_or(SyncError::MissingData)?;
        let outcome = reconcile(batch, &self.store).await?;

        match &outcome {
            ReconcileOutcome::DuplicatesFound(findings) => tracing::warn!(
                device = device_fingerprint(device_id),
                duplicates = findings.len(),
                "Sync stopped for duplicate review"
            ),
            ReconcileOutcome::Synced(counts) => tracing::info!(
                device = device_fingerprint(device_id),
                records = counts.total(),
                "Batch synced"
            ),
        }

        Ok(outcome.into())
    }

    /// Forget the device; unknown devices are ignored
    pub async fn unregister(&self, device_id: &str) {
        let removed = self.presence.remove(device_id).await;
        tracing::info!(
            device = device_fingerprint(device_id),
            removed,
            "Device unregistered"
        );
    }

    /// Dispatch a raw request. `network_id` comes from the transport.
    pub async fn handle(
        &self,
        request: &SyncRequest,
        network_id: &str,
    ) -> Result<SyncResponse, SyncError> {
        let action = request.validate()?;
        let device_id = request.device_id.trim();

        match action {
            Action::Register => {
                self.register(device_id, &request.device_name, network_id)
                    .await;
                Ok(SyncResponse::ack())
            }
            Action::Discover => {
                let devices = self
                    .discover(device_id, &request.device_name, network_id)
                    .await;
                Ok(SyncResponse::Devices { devices })
            }
            Action::Sync => {
                let report = self.sync(device_id, request.data.as_ref()).await?;
                Ok(SyncResponse::Report(report))
            }
            Action::Unregister => {
                self.unregister(device_id).await;
                Ok(SyncResponse::ack())
            }
        }
    }

    /// Drop presence records that can no longer be discovered
    pub async fn prune_presence(&self) -> usize {
        self.presence
            .prune_stale(self.clock.now_millis(), self.discovery.ttl())
            .await
    }

    /// Devices currently discoverable on any network
    pub async fn live_devices(&self) -> usize {
        self.presence
            .live_count(self.clock.now_millis(), self.discovery.ttl())
            .await
    }
}
