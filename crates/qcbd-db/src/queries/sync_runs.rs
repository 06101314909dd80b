//! Sync run log, shared by the SQLite and Neo4j adapters.

use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;

use crate::pool::{DbPool, DbResult};

/// A recorded sync run.
#[derive(Debug, Clone, Serialize)]
pub struct SyncRunRow {
    pub id: i64,
    pub backend: String,
    pub started_at: String,
    pub finished_at: String,
    pub entities: i64,
    pub relationships: i64,
}

/// Record a finished sync run for `backend`.
pub fn record_run(
    pool: &DbPool,
    backend: &str,
    started_at: &str,
    entities: usize,
    relationships: usize,
) -> DbResult<()> {
    pool.with_conn(|conn| record_run_tx(conn, backend, started_at, entities, relationships))
}

/// Same as [`record_run`] on an open connection or transaction.
pub fn record_run_tx(
    conn: &Connection,
    backend: &str,
    started_at: &str,
    entities: usize,
    relationships: usize,
) -> DbResult<()> {
    conn.execute(
        "INSERT INTO sync_runs (backend, started_at, finished_at, entities, relationships)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            backend,
            started_at,
            chrono::Utc::now().to_rfc3339(),
            entities as i64,
            relationships as i64
        ],
    )?;
    Ok(())
}

/// Most recent run for a backend.
pub fn last_run(pool: &DbPool, backend: &str) -> DbResult<Option<SyncRunRow>> {
    pool.with_conn(|conn| {
        let row = conn
            .query_row(
                "SELECT id, backend, started_at, finished_at, entities, relationships
                 FROM sync_runs WHERE backend = ?1
                 ORDER BY id DESC LIMIT 1",
                params![backend],
                |row| {
                    Ok(SyncRunRow {
                        id: row.get(0)?,
                        backend: row.get(1)?,
                        started_at: row.get(2)?,
                        finished_at: row.get(3)?,
                        entities: row.get(4)?,
                        relationships: row.get(5)?,
                    })
                },
            )
            .optional()?;
        Ok(row)
    })
}
