//! Database layer for Bizsync

mod connection;
mod entity_repository;
mod migrations;

pub use connection::{Database, ReplicaConfig};
pub use entity_repository::{EntityStore, LibSqlEntityStore};
