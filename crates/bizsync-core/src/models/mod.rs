//! Data models for Bizsync

mod entity;
mod finding;
mod presence;

pub use entity::{Entity, EntityKind, SyncBatch};
pub use finding::DuplicateFinding;
pub use presence::{DevicePresence, PeerDevice};
