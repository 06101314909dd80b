//! Embedding cache in the SQLite `embeddings` table.
//!
//! A cached vector is reused while the entity's text hash and the embedder
//! model both match; anything else is re-embedded.

use std::collections::{HashMap, HashSet};

use anyhow::{Context, Result};
use rusqlite::params;
use serde::Serialize;
use tracing::{debug, info};

use qcbd_core::{EntityKind, KnowledgeGraph};
use qcbd_db::{content_hash, DbPool};

use crate::hash::{blob_to_vec, entity_text, vec_to_blob, HashEmbedder};

/// Outcome of [`EmbeddingCache::refresh`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RefreshStats {
    pub embedded: usize,
    pub reused: usize,
    pub removed: usize,
}

/// A cached vector with its entity name, when the entity row exists.
#[derive(Debug, Clone)]
pub struct CachedVector {
    pub entity_id: String,
    pub name: String,
    pub vector: Vec<f32>,
}

pub struct EmbeddingCache {
    pool: DbPool,
    embedder: HashEmbedder,
}

impl EmbeddingCache {
    pub fn new(pool: DbPool, embedder: HashEmbedder) -> Self {
        Self { pool, embedder }
    }

    pub fn embedder(&self) -> &HashEmbedder {
        &self.embedder
    }

    /// Bring the cache in line with `graph`: embed new or changed entities,
    /// drop rows for entities that are gone.
    pub fn refresh(&self, graph: &KnowledgeGraph) -> Result<RefreshStats> {
        let model = self.embedder.model_name();
        let dims = self.embedder.dims() as i64;

        let stats = self
            .pool
            .with_conn_mut(|conn| {
                let tx = conn.transaction()?;
                let mut stats = RefreshStats::default();

                let cached: HashMap<String, (String, String)> = {
                    let mut stmt = tx.prepare("SELECT entity_id, content_hash, model FROM embeddings")?;
                    let rows = stmt.query_map([], |row| {
                        Ok((row.get::<_, String>(0)?, (row.get(1)?, row.get(2)?)))
                    })?;
                    rows.collect::<Result<_, _>>()?
                };

                let mut seen: HashSet<&str> = HashSet::with_capacity(graph.len());
                for (_, entity) in graph.entities() {
                    if !seen.insert(entity.id.as_str()) {
                        continue;
                    }
                    let text = entity_text(entity);
                    let hash = content_hash(&text);

                    if let Some((cached_hash, cached_model)) = cached.get(&entity.id) {
                        if *cached_hash == hash && *cached_model == model {
                            stats.reused += 1;
                            continue;
                        }
                    }

                    let vector = self.embedder.embed(&text);
                    tx.execute(
                        "INSERT INTO embeddings (entity_id, content_hash, model, dims, vector, updated_at)
                         VALUES (?1, ?2, ?3, ?4, ?5, datetime('now'))
                         ON CONFLICT(entity_id) DO UPDATE SET
                             content_hash = excluded.content_hash,
                             model = excluded.model,
                             dims = excluded.dims,
                             vector = excluded.vector,
                             updated_at = excluded.updated_at",
                        params![entity.id, hash, model, dims, vec_to_blob(&vector)],
                    )?;
                    stats.embedded += 1;
                }

                for id in cached.keys().filter(|id| !seen.contains(id.as_str())) {
                    tx.execute("DELETE FROM embeddings WHERE entity_id = ?1", params![id])?;
                    stats.removed += 1;
                }

                tx.commit()?;
                Ok(stats)
            })
            .context("Failed to refresh embedding cache")?;

        info!(
            embedded = stats.embedded,
            reused = stats.reused,
            removed = stats.removed,
            model = %model,
            "Embedding cache refreshed"
        );
        Ok(stats)
    }

    /// Cached vectors for the current model, optionally restricted to one kind.
    pub fn load(&self, kind: Option<EntityKind>) -> Result<Vec<CachedVector>> {
        let model = self.embedder.model_name();
        let vectors = self
            .pool
            .with_conn(|conn| {
                let mut stmt = conn.prepare(
                    "SELECT e.entity_id, COALESCE(n.name, ''), e.vector
                     FROM embeddings e LEFT JOIN entities n ON n.id = e.entity_id
                     WHERE e.model = ?1
                     ORDER BY e.entity_id",
                )?;
                let rows = stmt.query_map(params![model], |row| {
                    let blob: Vec<u8> = row.get(2)?;
                    Ok(CachedVector {
                        entity_id: row.get(0)?,
                        name: row.get(1)?,
                        vector: blob_to_vec(&blob),
                    })
                })?;
                Ok(rows.collect::<Result<Vec<_>, _>>()?)
            })
            .context("Failed to load cached embeddings")?;

        let filtered: Vec<CachedVector> = vectors
            .into_iter()
            .filter(|v| kind.map_or(true, |k| EntityKind::from_id(&v.entity_id) == Some(k)))
            .collect();
        debug!(count = filtered.len(), "Loaded cached embeddings");
        Ok(filtered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use qcbd_core::Entity;

    fn graph() -> KnowledgeGraph {
        let mut graph = KnowledgeGraph::default();
        graph.insert(Entity::new("method.dft", "Density functional theory")).unwrap();
        graph.insert(Entity::new("tool.pyscf", "PySCF python chemistry")).unwrap();
        graph
    }

    #[test]
    fn test_refresh_reuses_unchanged() {
        let pool = qcbd_db::init_memory_pool().unwrap();
        let cache = EmbeddingCache::new(pool, HashEmbedder::new(32));
        let mut g = graph();

        let first = cache.refresh(&g).unwrap();
        assert_eq!(first, RefreshStats { embedded: 2, reused: 0, removed: 0 });

        g.methods[0].description = Some("Kohn-Sham".into());
        g.tools.clear();
        let second = cache.refresh(&g).unwrap();
        assert_eq!(second, RefreshStats { embedded: 1, reused: 0, removed: 1 });

        let third = cache.refresh(&g).unwrap();
        assert_eq!(third, RefreshStats { embedded: 0, reused: 1, removed: 0 });
    }

    #[test]
    fn test_model_change_reembeds() {
        let pool = qcbd_db::init_memory_pool().unwrap();
        EmbeddingCache::new(pool.clone(), HashEmbedder::new(32)).refresh(&graph()).unwrap();

        let wider = EmbeddingCache::new(pool, HashEmbedder::new(64));
        assert!(wider.load(None).unwrap().is_empty());
        let stats = wider.refresh(&graph()).unwrap();
        assert_eq!(stats.embedded, 2);

        let tools = wider.load(Some(EntityKind::Tool)).unwrap();
        assert_eq!(tools.len(), 1);
        assert_eq!(tools[0].vector.len(), 64);
        // Entity rows were never synced, so names are empty.
        assert_eq!(tools[0].name, "");
    }
}
