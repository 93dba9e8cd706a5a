//! Per-kind match-field table
//!
//! Adding an entity kind means adding a row here; the comparison code never
//! branches on kind.

use serde_json::Value;

use crate::models::{Entity, EntityKind};

/// One attribute compared for duplicate detection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchField {
    /// Canonical attribute name, reported in findings
    pub name: &'static str,
    /// Alternative spellings accepted from clients
    pub aliases: &'static [&'static str],
}

impl MatchField {
    const fn new(name: &'static str, aliases: &'static [&'static str]) -> Self {
        Self { name, aliases }
    }

    /// Normalized value of this field on `entity`, if it has a usable one
    pub fn value(&self, entity: &Entity) -> Option<String> {
        std::iter::once(self.name)
            .chain(self.aliases.iter().copied())
            .find_map(|name| entity.attribute(name).and_then(normalize))
    }
}

/// Match fields of one kind, in priority order
#[derive(Debug, Clone, Copy)]
pub struct MatchRule {
    pub kind: EntityKind,
    pub fields: &'static [MatchField],
}

pub const MATCH_RULES: &[MatchRule] = &[
    MatchRule {
        kind: EntityKind::Company,
        fields: &[MatchField::new("name", &[])],
    },
    MatchRule {
        kind: EntityKind::Person,
        fields: &[
            MatchField::new("name", &[]),
            MatchField::new("email", &[]),
            MatchField::new("phone", &[]),
        ],
    },
    MatchRule {
        kind: EntityKind::InventoryItem,
        fields: &[
            MatchField::new("part_number", &["partNumber"]),
            MatchField::new("serial_number", &["serialNumber"]),
        ],
    },
    MatchRule {
        kind: EntityKind::Vendor,
        fields: &[MatchField::new("name", &[]), MatchField::new("email", &[])],
    },
];

/// Match fields for `kind`; empty when the kind has no rule
pub fn match_fields(kind: EntityKind) -> &'static [MatchField] {
    MATCH_RULES
        .iter()
        .find(|rule| rule.kind == kind)
        .map(|rule| rule.fields)
        .unwrap_or_default()
}

/// Trimmed, lower-cased comparison key. Null, empty and structured values
/// never match anything.
pub fn normalize(value: &Value) -> Option<String> {
    let text = match value {
        Value::String(text) => text.trim().to_lowercase(),
        Value::Number(number) => number.to_string(),
        Value::Bool(flag) => flag.to_string(),
        Value::Null | Value::Array(_) | Value::Object(_) => return None,
    };
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}
