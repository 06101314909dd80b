//! Semantic similarity search.
//!
//! Embeds the query with the cache's embedder and ranks cached vectors by
//! cosine similarity.

use anyhow::Result;
use serde::Serialize;
use tracing::debug;

use qcbd_core::EntityKind;

use crate::cache::EmbeddingCache;
use crate::hash::cosine_similarity;

/// A semantic search hit.
#[derive(Debug, Clone, Serialize)]
pub struct SemanticSearchResult {
    pub id: String,
    pub name: String,
    pub kind: Option<EntityKind>,
    pub score: f32,
}

pub struct SemanticSearch<'a> {
    cache: &'a EmbeddingCache,
}

impl<'a> SemanticSearch<'a> {
    pub fn new(cache: &'a EmbeddingCache) -> Self {
        Self { cache }
    }

    /// Top `top_k` entities by similarity, highest first, ties by ID.
    /// Hits with non-positive similarity are dropped.
    pub fn search(&self, query: &str, kind: Option<EntityKind>, top_k: usize) -> Result<Vec<SemanticSearchResult>> {
        let query_vector = self.cache.embedder().embed(query);
        if query_vector.iter().all(|v| *v == 0.0) {
            debug!(query, "Query has no tokens");
            return Ok(Vec::new());
        }

        let mut results: Vec<SemanticSearchResult> = self
            .cache
            .load(kind)?
            .into_iter()
            .map(|cached| SemanticSearchResult {
                score: cosine_similarity(&query_vector, &cached.vector),
                kind: EntityKind::from_id(&cached.entity_id),
                id: cached.entity_id,
                name: cached.name,
            })
            .filter(|r| r.score > 0.0)
            .collect();

        results.sort_by(|a, b| b.score.total_cmp(&a.score).then_with(|| a.id.cmp(&b.id)));
        results.truncate(top_k);

        debug!(query, hits = results.len(), "Semantic search finished");
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::HashEmbedder;
    use qcbd_core::{Entity, KnowledgeGraph};

    fn setup() -> EmbeddingCache {
        let mut graph = KnowledgeGraph::default();
        graph.insert(Entity::new("method.dft", "Density functional theory")).unwrap();
        graph.insert(Entity::new("method.qmc", "Quantum Monte Carlo")).unwrap();
        graph.insert(Entity::new("concept.dft_functional", "Exchange correlation functional")).unwrap();

        let pool = qcbd_db::init_memory_pool().unwrap();
        qcbd_db::sync_graph(&pool, &graph, false).unwrap();
        let cache = EmbeddingCache::new(pool, HashEmbedder::new(512));
        cache.refresh(&graph).unwrap();
        cache
    }

    #[test]
    fn test_best_match_first() {
        let cache = setup();
        let results = SemanticSearch::new(&cache).search("density functional", None, 5).unwrap();
        assert_eq!(results[0].id, "method.dft");
        assert_eq!(results[0].name, "Density functional theory");
        assert_eq!(results[0].kind, Some(EntityKind::Method));
        assert!(results.windows(2).all(|w| w[0].score >= w[1].score));
    }

    #[test]
    fn test_kind_filter_and_limit() {
        let cache = setup();
        let search = SemanticSearch::new(&cache);
        let concepts = search.search("functional", Some(EntityKind::Concept), 5).unwrap();
        assert_eq!(concepts.len(), 1);
        assert_eq!(concepts[0].id, "concept.dft_functional");

        assert!(search.search("density functional theory", None, 1).unwrap().len() <= 1);
        assert!(search.search("!!!", None, 5).unwrap().is_empty());
    }

    #[test]
    fn test_equal_scores_ordered_by_id() {
        let mut graph = KnowledgeGraph::default();
        graph.insert(Entity::new("tool.gaussian_16", "Gaussian quantum chemistry")).unwrap();
        graph.insert(Entity::new("tool.gaussian_09", "Gaussian quantum chemistry")).unwrap();
        graph.insert(Entity::new("method.gaussian_basis", "Gaussian quantum chemistry")).unwrap();

        let pool = qcbd_db::init_memory_pool().unwrap();
        let cache = EmbeddingCache::new(pool, HashEmbedder::new(128));
        cache.refresh(&graph).unwrap();

        let results = SemanticSearch::new(&cache).search("gaussian chemistry", None, 10).unwrap();
        let ids: Vec<&str> = results.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["method.gaussian_basis", "tool.gaussian_09", "tool.gaussian_16"]);
        assert!(results.windows(2).all(|w| w[0].score == w[1].score));
    }
}
