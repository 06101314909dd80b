//! Knowledge graph to SQLite synchronization.
//!
//! Entities are upserted keyed by ID. Rows whose content hash has not
//! changed are left alone, so re-running a sync on the same graph writes
//! nothing. Everything happens in one transaction.

use std::collections::HashSet;

use rusqlite::{params, OptionalExtension, Transaction};
use serde::Serialize;
use tracing::{debug, info, warn};

use qcbd_core::{Entity, EntityKind, KnowledgeGraph};

use crate::content_hash;
use crate::pool::{DbPool, DbResult};
use crate::queries::sync_runs;

/// Result of a SQLite sync.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncStats {
    pub inserted: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub removed: usize,
    pub relationships: usize,
}

/// Write every entity of `graph` into the store. With `prune`, rows for
/// entities no longer in the graph are deleted.
pub fn sync_graph(pool: &DbPool, graph: &KnowledgeGraph, prune: bool) -> DbResult<SyncStats> {
    let started_at = chrono::Utc::now().to_rfc3339();
    info!(entities = graph.len(), prune, "Starting SQLite sync");

    let stats = pool.with_conn_mut(|conn| {
        let tx = conn.transaction()?;
        let mut stats = SyncStats::default();
        let mut seen: HashSet<&str> = HashSet::with_capacity(graph.len());

        for (kind, entity) in graph.entities() {
            if !seen.insert(entity.id.as_str()) {
                warn!(id = %entity.id, "Duplicate id in graph, keeping first occurrence");
                continue;
            }
            upsert_entity(&tx, kind, entity, &mut stats)?;
        }

        if prune {
            stats.removed = prune_missing(&tx, &seen)?;
        }

        sync_runs::record_run_tx(
            &tx,
            "sqlite",
            &started_at,
            stats.inserted + stats.updated,
            stats.relationships,
        )?;
        tx.commit()?;
        Ok(stats)
    })?;

    info!(
        inserted = stats.inserted,
        updated = stats.updated,
        unchanged = stats.unchanged,
        removed = stats.removed,
        relationships = stats.relationships,
        "SQLite sync complete"
    );
    Ok(stats)
}

fn upsert_entity(tx: &Transaction<'_>, kind: EntityKind, entity: &Entity, stats: &mut SyncStats) -> DbResult<()> {
    let data = serde_json::to_string(entity)?;
    let hash = content_hash(&data);

    let existing: Option<String> = tx
        .query_row(
            "SELECT content_hash FROM entities WHERE id = ?1",
            params![entity.id],
            |row| row.get(0),
        )
        .optional()?;

    match existing {
        Some(ref h) if *h == hash => {
            stats.unchanged += 1;
            return Ok(());
        }
        Some(_) => stats.updated += 1,
        None => stats.inserted += 1,
    }

    tx.execute(
        "INSERT INTO entities (id, kind, name, description, category, data, content_hash, is_stub, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, datetime('now'))
         ON CONFLICT(id) DO UPDATE SET
             kind = excluded.kind,
             name = excluded.name,
             description = excluded.description,
             category = excluded.category,
             data = excluded.data,
             content_hash = excluded.content_hash,
             is_stub = excluded.is_stub,
             updated_at = excluded.updated_at",
        params![
            entity.id,
            kind.as_str(),
            entity.name,
            entity.description,
            entity.category,
            data,
            hash,
            entity.is_stub(),
        ],
    )?;

    tx.execute("DELETE FROM relationships WHERE source_id = ?1", params![entity.id])?;
    for (relation, target) in entity.relationships().filter(|(r, _)| !r.is_derived()) {
        stats.relationships += tx.execute(
            "INSERT OR IGNORE INTO relationships (source_id, target_id, rel_type) VALUES (?1, ?2, ?3)",
            params![entity.id, target, relation.edge_type()],
        )?;
    }

    debug!(id = %entity.id, kind = kind.as_str(), "Synced entity");
    Ok(())
}

fn prune_missing(tx: &Transaction<'_>, keep: &HashSet<&str>) -> DbResult<usize> {
    let stale: Vec<String> = {
        let mut stmt = tx.prepare("SELECT id FROM entities")?;
        let ids = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        ids.into_iter().filter(|id| !keep.contains(id.as_str())).collect()
    };

    for id in &stale {
        tx.execute("DELETE FROM relationships WHERE source_id = ?1", params![id])?;
        tx.execute("DELETE FROM entities WHERE id = ?1", params![id])?;
        debug!(id = %id, "Pruned entity");
    }
    Ok(stale.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::init_memory_pool;
    use crate::queries::entities;

    fn graph() -> KnowledgeGraph {
        let mut graph = KnowledgeGraph::default();
        let mut dft = Entity::new("method.dft", "DFT");
        dft.implemented_in = vec!["tool.pyscf".into(), "tool.orca".into()];
        graph.insert(dft).unwrap();
        let mut pyscf = Entity::new("tool.pyscf", "PySCF");
        pyscf.implements = vec!["method.dft".into()];
        graph.insert(pyscf).unwrap();
        graph
    }

    #[test]
    fn test_sync_is_idempotent() {
        let pool = init_memory_pool().unwrap();
        let g = graph();

        let first = sync_graph(&pool, &g, false).unwrap();
        assert_eq!(first.inserted, 2);
        // Derived `implements` links are not stored.
        assert_eq!(first.relationships, 2);

        let second = sync_graph(&pool, &g, false).unwrap();
        assert_eq!(second, SyncStats { unchanged: 2, ..Default::default() });
    }

    #[test]
    fn test_update_replaces_relationships() {
        let pool = init_memory_pool().unwrap();
        let mut g = graph();
        sync_graph(&pool, &g, false).unwrap();

        g.methods[0].implemented_in = vec!["tool.pyscf".into()];
        g.methods[0].description = Some("Kohn-Sham DFT".into());
        let stats = sync_graph(&pool, &g, false).unwrap();
        assert_eq!(stats.updated, 1);
        assert_eq!(stats.unchanged, 1);

        let out = entities::neighbors(&pool, "method.dft").unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].id, "tool.pyscf");
        let row = entities::get_entity(&pool, "method.dft").unwrap();
        assert_eq!(row.description.as_deref(), Some("Kohn-Sham DFT"));
    }

    #[test]
    fn test_prune_removes_missing() {
        let pool = init_memory_pool().unwrap();
        let mut g = graph();
        sync_graph(&pool, &g, false).unwrap();

        g.tools.clear();
        let kept = sync_graph(&pool, &g, false).unwrap();
        assert_eq!(kept.removed, 0);
        assert!(entities::get_entity(&pool, "tool.pyscf").is_ok());

        let pruned = sync_graph(&pool, &g, true).unwrap();
        assert_eq!(pruned.removed, 1);
        assert!(entities::get_entity(&pool, "tool.pyscf").is_err());

        let last = crate::queries::sync_runs::last_run(&pool, "sqlite").unwrap().unwrap();
        assert_eq!(last.backend, "sqlite");
    }
}
