//! Candidate entity model

use std::fmt;

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// The business record kinds a device may submit in one batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    #[serde(rename = "company")]
    Company,
    #[serde(rename = "person")]
    Person,
    #[serde(rename = "item")]
    InventoryItem,
    #[serde(rename = "vendor")]
    Vendor,
}

impl EntityKind {
    /// Every kind, in the order batches are checked and written
    pub const ALL: [Self; 4] = [Self::Company, Self::Person, Self::InventoryItem, Self::Vendor];

    /// Key used for this kind inside a sync payload and its results
    pub const fn wire_key(self) -> &'static str {
        match self {
            Self::Company => "companies",
            Self::Person => "people",
            Self::InventoryItem => "items",
            Self::Vendor => "vendors",
        }
    }

    /// Table holding persisted rows of this kind
    pub const fn table(self) -> &'static str {
        self.wire_key()
    }

    /// Singular label used in duplicate findings
    pub const fn label(self) -> &'static str {
        match self {
            Self::Company => "company",
            Self::Person => "person",
            Self::InventoryItem => "item",
            Self::Vendor => "vendor",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A record proposed by a device for inclusion in the shared store
///
/// Only `id` is interpreted structurally; every other attribute is carried
/// through to storage untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
    /// Primary key, stable across devices once persisted
    #[serde(deserialize_with = "deserialize_entity_id")]
    pub id: String,
    /// Remaining attributes
    #[serde(flatten)]
    pub attributes: Map<String, Value>,
}

impl Entity {
    /// Build an entity from an id and a JSON object of attributes.
    ///
    /// Non-object values produce an entity with no attributes; an `id` key in
    /// `attributes` is dropped in favour of `id`.
    pub fn new(id: impl Into<String>, attributes: Value) -> Self {
        let mut attributes = match attributes {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        attributes.remove("id");
        Self {
            id: id.into(),
            attributes,
        }
    }

    /// Look up an attribute by name
    pub fn attribute(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name)
    }
}

fn deserialize_entity_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(id) if !id.trim().is_empty() => Ok(id),
        Value::Number(id) => Ok(id.to_string()),
        other => Err(de::Error::custom(format!(
            "entity id must be a non-empty string or a number, got {other}"
        ))),
    }
}

/// Candidate entities submitted by one device in one request
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncBatch {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub companies: Vec<Entity>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub people: Vec<Entity>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub items: Vec<Entity>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub vendors: Vec<Entity>,
}

impl SyncBatch {
    /// Entities of one kind
    pub fn entities(&self, kind: EntityKind) -> &[Entity] {
        match kind {
            EntityKind::Company => &self.companies,
            EntityKind::Person => &self.people,
            EntityKind::InventoryItem => &self.items,
            EntityKind::Vendor => &self.vendors,
        }
    }

    /// Total number of entities across all kinds
    pub fn len(&self) -> usize {
        EntityKind::ALL
            .iter()
            .map(|kind| self.entities(*kind).len())
            .sum()
    }

    /// Whether the batch carries no entities at all
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
