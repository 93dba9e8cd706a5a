//! Duplicate finding model

use serde::{Deserialize, Serialize};

use super::{Entity, EntityKind};

/// Evidence that an incoming candidate matches an already-stored record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DuplicateFinding {
    /// Kind of both records
    #[serde(rename = "type")]
    pub kind: EntityKind,
    /// The candidate submitted by the device
    pub incoming: Entity,
    /// The stored record it collides with
    pub existing: Entity,
    /// First match field that collided
    pub field: String,
}
