//! Duplicate-gated reconciliation
//!
//! A batch is compared against the stored rows of every kind before anything
//! is written. One collision anywhere stops the whole batch; there is no
//! partial merge. The snapshot read and the write are not isolated from
//! concurrent batches, so two devices racing with the same new record can
//! both pass the gate.

mod rules;

use serde::{Deserialize, Serialize};

use crate::db::EntityStore;
use crate::error::Result;
use crate::models::{DuplicateFinding, Entity, EntityKind, SyncBatch};

pub use rules::{match_fields, normalize, MatchField, MatchRule, MATCH_RULES};

/// Every cross-device duplicate between `incoming` and `existing`.
///
/// Pairs sharing an id are updates, not duplicates. Fields are tried in
/// order and only the first collision of a pair is reported. O(n·m).
pub fn find_duplicates(
    incoming: &[Entity],
    existing: &[Entity],
    kind: EntityKind,
    fields: &[MatchField],
) -> Vec<DuplicateFinding> {
    let mut findings = Vec::new();

    for candidate in incoming {
        for stored in existing {
            if candidate.id == stored.id {
                continue;
            }

            let collided = fields.iter().find(|field| {
                field
                    .value(candidate)
                    .is_some_and(|value| field.value(stored).as_deref() == Some(value.as_str()))
            });

            if let Some(field) = collided {
                findings.push(DuplicateFinding {
                    kind,
                    incoming: candidate.clone(),
                    existing: stored.clone(),
                    field: field.name.to_string(),
                });
            }
        }
    }

    findings
}

/// Rows written for one kind
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KindCount {
    pub added: usize,
}

/// Rows written per kind by a successful sync
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncCounts {
    pub companies: KindCount,
    pub people: KindCount,
    pub items: KindCount,
    pub vendors: KindCount,
}

impl SyncCounts {
    fn from_batch(batch: &SyncBatch) -> Self {
        let added = |kind| KindCount {
            added: batch.entities(kind).len(),
        };
        Self {
            companies: added(EntityKind::Company),
            people: added(EntityKind::Person),
            items: added(EntityKind::InventoryItem),
            vendors: added(EntityKind::Vendor),
        }
    }

    pub const fn get(&self, kind: EntityKind) -> KindCount {
        match kind {
            EntityKind::Company => self.companies,
            EntityKind::Person => self.people,
            EntityKind::InventoryItem => self.items,
            EntityKind::Vendor => self.vendors,
        }
    }

    pub const fn total(&self) -> usize {
        self.companies.added + self.people.added + self.items.added + self.vendors.added
    }
}

/// Terminal state of one reconciliation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// Nothing was written; a human has to resolve these first
    DuplicatesFound(Vec<DuplicateFinding>),
    /// Every entity in the batch was upserted
    Synced(SyncCounts),
}

impl ReconcileOutcome {
    /// Human-readable summary for the calling device
    pub fn message(&self) -> String {
        match self {
            Self::DuplicatesFound(findings) => format!(
                "Found {} potential duplicate(s). Review them before syncing.",
                findings.len()
            ),
            Self::Synced(counts) => format!("Synced {} record(s)", counts.total()),
        }
    }
}

/// Check `batch` against `store` and write it only if no kind collides.
pub async fn reconcile<S: EntityStore>(batch: &SyncBatch, store: &S) -> Result<ReconcileOutcome> {
    let mut findings = Vec::new();

    for kind in EntityKind::ALL {
        let incoming = batch.entities(kind);
        if incoming.is_empty() {
            continue;
        }
        let existing = store.fetch_all(kind).await?;
        findings.extend(find_duplicates(
            incoming,
            &existing,
            kind,
            match_fields(kind),
        ));
    }

    if !findings.is_empty() {
        return Ok(ReconcileOutcome::DuplicatesFound(findings));
    }

    store.upsert_batch(batch).await?;
    Ok(ReconcileOutcome::Synced(SyncCounts::from_batch(batch)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::LibSqlEntityStore;
    use crate::error::Error;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn entity(id: &str, attributes: serde_json::Value) -> Entity {
        Entity::new(id, attributes)
    }

    async fn seeded(batch: SyncBatch) -> LibSqlEntityStore {
        let store = LibSqlEntityStore::open_in_memory().await.unwrap();
        store.upsert_batch(&batch).await.unwrap();
        store
    }

    #[test]
    fn case_and_whitespace_do_not_hide_duplicates() {
        let existing = vec![entity("A", json!({"name": "Acme"}))];
        let incoming = vec![entity("B", json!({"name": "  ACME "}))];

        let findings = find_duplicates(
            &incoming,
            &existing,
            EntityKind::Company,
            match_fields(EntityKind::Company),
        );

        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].field, "name");
        assert_eq!(findings[0].incoming.id, "B");
        assert_eq!(findings[0].existing.id, "A");
    }

    #[test]
    fn same_id_is_never_a_duplicate() {
        let existing = vec![entity("A", json!({"name": "Acme"}))];
        let incoming = vec![entity("A", json!({"name": "Acme"}))];

        let findings = find_duplicates(
            &incoming,
            &existing,
            EntityKind::Company,
            match_fields(EntityKind::Company),
        );
        assert!(findings.is_empty());
    }

    #[test]
    fn only_first_colliding_field_is_reported() {
        let existing = vec![entity(
            "p-1",
            json!({"name": "Jo Park", "email": "jo@example.com", "phone": "555"}),
        )];
        let incoming = vec![entity(
            "p-2",
            json!({"name": "Joanna Park", "email": "JO@example.com", "phone": "555"}),
        )];

        let findings = find_duplicates(
            &incoming,
            &existing,
            EntityKind::Person,
            match_fields(EntityKind::Person),
        );

        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].field, "email");
    }

    #[test]
    fn empty_values_never_collide() {
        let existing = vec![entity("v-1", json!({"name": "", "email": null}))];
        let incoming = vec![entity("v-2", json!({"name": "  ", "email": null}))];

        let findings = find_duplicates(
            &incoming,
            &existing,
            EntityKind::Vendor,
            match_fields(EntityKind::Vendor),
        );
        assert!(findings.is_empty());
    }

    #[test]
    fn one_incoming_can_collide_with_several_stored_rows() {
        let existing = vec![
            entity("i-1", json!({"part_number": "PN-7"})),
            entity("i-2", json!({"serial_number": "SN-1"})),
        ];
        let incoming = vec![entity(
            "i-3",
            json!({"partNumber": "pn-7", "serialNumber": "sn-1"}),
        )];

        let findings = find_duplicates(
            &incoming,
            &existing,
            EntityKind::InventoryItem,
            match_fields(EntityKind::InventoryItem),
        );

        let fields: Vec<(&str, &str)> = findings
            .iter()
            .map(|f| (f.existing.id.as_str(), f.field.as_str()))
            .collect();
        assert_eq!(fields, vec![("i-1", "part_number"), ("i-2", "serial_number")]);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn duplicate_company_blocks_write() {
        let store = seeded(SyncBatch {
            companies: vec![entity("A", json!({"name": "Acme"}))],
            ..SyncBatch::default()
        })
        .await;

        let batch = SyncBatch {
            companies: vec![entity("B", json!({"name": "ACME"}))],
            ..SyncBatch::default()
        };
        let outcome = reconcile(&batch, &store).await.unwrap();

        let ReconcileOutcome::DuplicatesFound(findings) = outcome else {
            panic!("expected duplicates, got {outcome:?}");
        };
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].field, "name");
        assert_eq!(findings[0].kind, EntityKind::Company);
        assert_eq!(store.count(EntityKind::Company).await.unwrap(), 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn identity_match_is_an_update() {
        let store = seeded(SyncBatch {
            companies: vec![entity("A", json!({"name": "Acme"}))],
            ..SyncBatch::default()
        })
        .await;

        let batch = SyncBatch {
            companies: vec![entity("A", json!({"name": "Acme Updated"}))],
            ..SyncBatch::default()
        };
        let outcome = reconcile(&batch, &store).await.unwrap();

        let ReconcileOutcome::Synced(counts) = outcome else {
            panic!("expected synced, got {outcome:?}");
        };
        assert_eq!(counts.companies.added, 1);
        let stored = store.fetch_all(EntityKind::Company).await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].attribute("name"), Some(&json!("Acme Updated")));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn one_duplicate_aborts_every_kind() {
        let store = seeded(SyncBatch {
            people: vec![entity("p-1", json!({"name": "Dana Lee"}))],
            ..SyncBatch::default()
        })
        .await;

        let batch = SyncBatch {
            vendors: vec![entity("v-1", json!({"name": "Clean Vendor"}))],
            people: vec![entity("p-2", json!({"name": "dana lee"}))],
            ..SyncBatch::default()
        };
        let outcome = reconcile(&batch, &store).await.unwrap();

        assert!(matches!(outcome, ReconcileOutcome::DuplicatesFound(ref f) if f.len() == 1));
        assert_eq!(store.count(EntityKind::Vendor).await.unwrap(), 0);
        assert_eq!(store.count(EntityKind::Person).await.unwrap(), 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn findings_span_all_kinds() {
        let store = seeded(SyncBatch {
            companies: vec![entity("c-1", json!({"name": "Acme"}))],
            vendors: vec![entity("v-1", json!({"email": "sales@bolt.test"}))],
            ..SyncBatch::default()
        })
        .await;

        let batch = SyncBatch {
            companies: vec![entity("c-2", json!({"name": "acme"}))],
            vendors: vec![entity("v-2", json!({"name": "Bolt", "email": "SALES@bolt.test"}))],
            ..SyncBatch::default()
        };
        let outcome = reconcile(&batch, &store).await.unwrap();

        let ReconcileOutcome::DuplicatesFound(findings) = &outcome else {
            panic!("expected duplicates, got {outcome:?}");
        };
        let kinds: Vec<EntityKind> = findings.iter().map(|f| f.kind).collect();
        assert_eq!(kinds, vec![EntityKind::Company, EntityKind::Vendor]);
        assert!(outcome.message().contains('2'));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn clean_batch_is_idempotent() {
        let store = LibSqlEntityStore::open_in_memory().await.unwrap();
        let batch = SyncBatch {
            companies: vec![entity("c-1", json!({"name": "Acme"}))],
            items: vec![
                entity("i-1", json!({"part_number": "PN-1"})),
                entity("i-2", json!({"part_number": "PN-2"})),
            ],
            ..SyncBatch::default()
        };

        let first = reconcile(&batch, &store).await.unwrap();
        let second = reconcile(&batch, &store).await.unwrap();

        assert_eq!(first, second);
        let ReconcileOutcome::Synced(counts) = first else {
            panic!("expected synced");
        };
        assert_eq!(counts.items.added, 2);
        assert_eq!(counts.total(), 3);
        assert_eq!(store.count(EntityKind::InventoryItem).await.unwrap(), 2);
        assert_eq!(store.count(EntityKind::Company).await.unwrap(), 1);
    }

    struct UnreachableStore;

    impl EntityStore for UnreachableStore {
        async fn fetch_all(&self, _kind: EntityKind) -> Result<Vec<Entity>> {
            Err(Error::Database("connection refused".to_string()))
        }

        async fn upsert_batch(&self, _batch: &SyncBatch) -> Result<()> {
            panic!("must not write after a failed read");
        }
    }

    #[tokio::test]
    async fn snapshot_failure_propagates() {
        let batch = SyncBatch {
            companies: vec![entity("c-1", json!({"name": "Acme"}))],
            ..SyncBatch::default()
        };

        let err = reconcile(&batch, &UnreachableStore).await.unwrap_err();
        assert!(err.to_string().contains("connection refused"));
    }
}
