//! Database migrations

use crate::error::Result;
use crate::models::EntityKind;
use libsql::Connection;

/// Current schema version
const CURRENT_VERSION: i32 = 1;

/// Run all pending migrations
pub async fn run(conn: &Connection) -> Result<()> {
    if get_version(conn).await? < 1 {
        let mut statements =
            vec!["CREATE TABLE IF NOT EXISTS schema_version (version INTEGER PRIMARY KEY)".to_string()];
        statements.extend(EntityKind::ALL.iter().map(|kind| entity_table_ddl(*kind)));
        apply(conn, 1, &statements).await?;
    }

    Ok(())
}

/// One table per entity kind; attributes live in `payload` as JSON
fn entity_table_ddl(kind: EntityKind) -> String {
    format!(
        "CREATE TABLE IF NOT EXISTS {} (
            id TEXT PRIMARY KEY,
            payload TEXT NOT NULL,
            updated_at INTEGER NOT NULL
        )",
        kind.table()
    )
}

async fn table_exists(conn: &Connection, name: &str) -> Result<bool> {
    let mut rows = conn
        .query(
            "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1)",
            [name],
        )
        .await?;
    Ok(match rows.next().await? {
        Some(row) => row.get::<i32>(0)? != 0,
        None => false,
    })
}

async fn get_version(conn: &Connection) -> Result<i32> {
    if !table_exists(conn, "schema_version").await? {
        return Ok(0);
    }

    let mut rows = conn
        .query("SELECT COALESCE(MAX(version), 0) FROM schema_version", ())
        .await?;
    Ok(match rows.next().await? {
        Some(row) => row.get(0)?,
        None => 0,
    })
}

/// Execute `statements` and record `version`, all in one transaction
async fn apply(conn: &Connection, version: i32, statements: &[String]) -> Result<()> {
    conn.execute("BEGIN TRANSACTION", ()).await?;

    let recorded = format!("INSERT INTO schema_version (version) VALUES ({version})");
    for stmt in statements.iter().map(String::as_str).chain([recorded.as_str()]) {
        if let Err(e) = conn.execute(stmt, ()).await {
            conn.execute("ROLLBACK", ()).await.ok();
            return Err(e.into());
        }
    }

    if let Err(e) = conn.execute("COMMIT", ()).await {
        conn.execute("ROLLBACK", ()).await.ok();
        return Err(e.into());
    }

    tracing::info!(version, latest = CURRENT_VERSION, "Applied schema migration");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use libsql::Builder;

    async fn setup() -> Connection {
        let db = Builder::new_local(":memory:").build().await.unwrap();
        db.connect().unwrap()
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_migrations() {
        let conn = setup().await;
        run(&conn).await.unwrap();

        let version = get_version(&conn).await.unwrap();
        assert_eq!(version, CURRENT_VERSION);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_migrations_idempotent() {
        let conn = setup().await;
        run(&conn).await.unwrap();
        run(&conn).await.unwrap();

        let version = get_version(&conn).await.unwrap();
        assert_eq!(version, CURRENT_VERSION);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_migration_creates_entity_tables() {
        let conn = setup().await;
        run(&conn).await.unwrap();

        for kind in EntityKind::ALL {
            assert!(
                table_exists(&conn, kind.table()).await.unwrap(),
                "missing table {}",
                kind.table()
            );
        }
    }
}
