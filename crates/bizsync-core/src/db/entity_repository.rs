//! Entity store implementation

use std::future::Future;
use std::path::Path;
use std::sync::Arc;

use serde_json::{Map, Value};
use tokio::sync::Mutex;

use crate::error::Result;
use crate::models::{Entity, EntityKind, SyncBatch};

use super::{Database, ReplicaConfig};

/// Durable store the reconciliation engine reads from and writes to
pub trait EntityStore: Send + Sync {
    /// Every committed row of one kind
    fn fetch_all(&self, kind: EntityKind) -> impl Future<Output = Result<Vec<Entity>>> + Send;

    /// Insert-or-replace every entity in `batch`, keyed by id.
    ///
    /// Either every kind is written or none is.
    fn upsert_batch(&self, batch: &SyncBatch) -> impl Future<Output = Result<()>> + Send;
}

/// Roll back a transaction left open by a batch that was dropped mid-write
async fn discard_interrupted(conn: &libsql::Connection) -> Result<()> {
    if !conn.is_autocommit() {
        tracing::warn!("Rolling back interrupted entity batch");
        conn.execute("ROLLBACK", ()).await?;
    }
    Ok(())
}

/// libSQL implementation of `EntityStore`
#[derive(Clone)]
pub struct LibSqlEntityStore {
    db: Arc<Mutex<Database>>,
}

impl LibSqlEntityStore {
    pub fn new(db: Database) -> Self {
        Self {
            db: Arc::new(Mutex::new(db)),
        }
    }

    /// Open a local database file, creating parent directories as needed
    pub async fn open_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        Ok(Self::new(Database::open(path).await?))
    }

    /// Open an embedded replica backed by a remote primary
    pub async fn open_replica(path: impl AsRef<Path>, replica: ReplicaConfig) -> Result<Self> {
        tracing::info!("Entity store replicating from {}", replica.url);
        Ok(Self::new(Database::open_replica(path, replica).await?))
    }

    /// Open an in-memory store (primarily for tests).
    pub async fn open_in_memory() -> Result<Self> {
        Ok(Self::new(Database::open_in_memory().await?))
    }

    /// Number of stored rows of one kind
    pub async fn count(&self, kind: EntityKind) -> Result<usize> {
        let db = self.db.lock().await;
        discard_interrupted(db.connection()).await?;
        let mut rows = db
            .connection()
            .query(&format!("SELECT COUNT(*) FROM {}", kind.table()), ())
            .await?;
        let count = match rows.next().await? {
            Some(row) => row.get::<i64>(0)?,
            None => 0,
        };
        Ok(usize::try_from(count).unwrap_or_default())
    }

    async fn write_kind(
        conn: &libsql::Connection,
        kind: EntityKind,
        entities: &[Entity],
        now: i64,
    ) -> Result<()> {
        let sql = format!(
            "INSERT INTO {} (id, payload, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(id) DO UPDATE SET payload = excluded.payload, updated_at = excluded.updated_at",
            kind.table()
        );
        for entity in entities {
            let payload = serde_json::to_string(&entity.attributes)?;
            conn.execute(&sql, libsql::params![entity.id.clone(), payload, now])
                .await?;
        }
        Ok(())
    }
}

impl EntityStore for LibSqlEntityStore {
    async fn fetch_all(&self, kind: EntityKind) -> Result<Vec<Entity>> {
        let db = self.db.lock().await;
        discard_interrupted(db.connection()).await?;
        let mut rows = db
            .connection()
            .query(
                &format!("SELECT id, payload FROM {} ORDER BY rowid", kind.table()),
                (),
            )
            .await?;

        let mut entities = Vec::new();
        while let Some(row) = rows.next().await? {
            let id: String = row.get(0)?;
            let payload: String = row.get(1)?;
            let attributes: Map<String, Value> = serde_json::from_str(&payload)?;
            entities.push(Entity { id, attributes });
        }
        Ok(entities)
    }

    async fn upsert_batch(&self, batch: &SyncBatch) -> Result<()> {
        let now = chrono::Utc::now().timestamp_millis();
        let db = self.db.lock().await;
        let conn = db.connection();
        discard_interrupted(conn).await?;

        conn.execute("BEGIN TRANSACTION", ()).await?;
        for kind in EntityKind::ALL {
            let entities = batch.entities(kind);
            if entities.is_empty() {
                continue;
            }
            if let Err(e) = Self::write_kind(conn, kind, entities, now).await {
                conn.execute("ROLLBACK", ()).await.ok();
                tracing::warn!(kind = kind.label(), "Entity upsert failed, batch rolled back");
                return Err(e);
            }
        }

        if let Err(e) = conn.execute("COMMIT", ()).await {
            conn.execute("ROLLBACK", ()).await.ok();
            return Err(e.into());
        }
        Ok(())
    }
}
