//! bizsync-core - Core library for Bizsync
//!
//! This crate contains the device presence registry, peer discovery, the
//! duplicate-gated reconciliation engine, and the durable entity store used by
//! the HTTP service and the device CLI.

pub mod clock;
pub mod coordinator;
pub mod db;
pub mod discovery;
pub mod error;
pub mod models;
pub mod presence;
pub mod reconcile;
pub mod util;

pub use coordinator::{Action, SyncCoordinator, SyncError, SyncReport, SyncRequest, SyncResponse};
pub use error::{Error, Result};
pub use models::{DevicePresence, DuplicateFinding, Entity, EntityKind, PeerDevice, SyncBatch};
