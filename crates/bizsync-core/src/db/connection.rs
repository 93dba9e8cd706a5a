//! Database connection management

use std::fmt;
use std::path::Path;
use std::time::Duration;

use libsql::{Builder, Connection, Database as LibSqlDatabase};

use super::migrations;
use crate::error::{Error, Result};

const DEFAULT_PULL_INTERVAL: Duration = Duration::from_secs(60);

/// Remote libSQL primary that a local database replicates
#[derive(Clone)]
pub struct ReplicaConfig {
    /// Remote database URL (e.g., `libsql://shop.turso.io`)
    pub url: String,
    pub auth_token: String,
    /// Background pull interval; `None` pulls only on open
    pub sync_interval: Option<Duration>,
}

impl ReplicaConfig {
    pub fn new(url: impl Into<String>, auth_token: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            auth_token: auth_token.into(),
            sync_interval: Some(DEFAULT_PULL_INTERVAL),
        }
    }

    #[must_use]
    pub const fn with_sync_interval(mut self, interval: Option<Duration>) -> Self {
        self.sync_interval = interval;
        self
    }
}

impl fmt::Debug for ReplicaConfig {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("ReplicaConfig")
            .field("url", &self.url)
            .field("auth_token", &"[REDACTED]")
            .field("sync_interval", &self.sync_interval)
            .finish()
    }
}

/// Database wrapper for libSQL connections
pub struct Database {
    db: LibSqlDatabase,
    conn: Connection,
    replica: Option<ReplicaConfig>,
}

impl Database {
    /// Open a local-only database at the given path, creating it if it doesn't exist
    ///
    /// Runs migrations automatically.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let db = Builder::new_local(path.as_ref()).build().await?;
        Self::finish(db, None).await
    }

    pub async fn open_in_memory() -> Result<Self> {
        Self::open(":memory:").await
    }

    /// Open an embedded replica of a remote libSQL database
    ///
    /// Reads are served from the local file; writes go to the remote primary.
    pub async fn open_replica(local_path: impl AsRef<Path>, replica: ReplicaConfig) -> Result<Self> {
        if replica.url.trim().is_empty() || replica.auth_token.trim().is_empty() {
            return Err(Error::InvalidInput(
                "Replica URL and auth token are required".into(),
            ));
        }

        let mut builder = Builder::new_remote_replica(
            local_path.as_ref(),
            replica.url.clone(),
            replica.auth_token.clone(),
        );
        if let Some(interval) = replica.sync_interval {
            builder = builder.sync_interval(interval);
        }

        let db = builder.build().await?;
        Self::finish(db, Some(replica)).await
    }

    async fn finish(db: LibSqlDatabase, replica: Option<ReplicaConfig>) -> Result<Self> {
        let conn = db.connect()?;
        let database = Self { db, conn, replica };

        // Pull first so migrations see the remote schema
        database.pull().await?;
        database.configure().await;
        migrations::run(&database.conn).await?;
        Ok(database)
    }

    async fn configure(&self) {
        // Replicas reject journal pragmas; the local file keeps its defaults then
        for pragma in ["PRAGMA journal_mode = WAL;", "PRAGMA synchronous = NORMAL;"] {
            if let Err(e) = self.conn.execute(pragma, ()).await {
                tracing::debug!("Skipping {pragma}: {e}");
            }
        }
    }

    /// Pull remote changes into the embedded replica (no-op for local databases)
    pub async fn pull(&self) -> Result<()> {
        if self.replica.is_some() {
            self.db.sync().await?;
            tracing::debug!("Replica pulled from primary");
        }
        Ok(())
    }

    pub const fn is_replica(&self) -> bool {
        self.replica.is_some()
    }

    pub const fn connection(&self) -> &Connection {
        &self.conn
    }
}
