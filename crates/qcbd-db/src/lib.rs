//! QCBD Database Layer
//!
//! SQLite mirror of the knowledge graph: entity rows, a flat relationship
//! table, the embedding cache and a log of sync runs.

pub mod migrations;
pub mod pool;
pub mod queries;
pub mod sync;

use std::path::Path;

pub use pool::{DbError, DbPool, DbResult};
pub use sync::{sync_graph, SyncStats};

/// Open (or create) the SQLite store at `path` and bring its schema up to date.
pub fn init_pool(path: &Path) -> DbResult<DbPool> {
    let pool = DbPool::open(path)?;
    migrations::run_migrations(&pool)?;
    Ok(pool)
}

/// In-memory store with the schema applied.
pub fn init_memory_pool() -> DbResult<DbPool> {
    let pool = DbPool::in_memory()?;
    migrations::run_migrations(&pool)?;
    Ok(pool)
}

/// SHA-256 of an entity's canonical JSON, used to skip unchanged rows.
pub fn content_hash(data: &str) -> String {
    use sha2::{Digest, Sha256};
    hex::encode(Sha256::digest(data.as_bytes()))
}
