//! Translate a knowledge graph into Cypher statements.
//!
//! Order: one node MERGE per entity, then one statement per entity clearing
//! its outgoing edges, then one MERGE per relationship. Edges whose
//! target is not in the graph are skipped; derived relations are never
//! written.

use std::collections::HashSet;

use tracing::debug;

use qcbd_core::{Entity, EntityKind, KnowledgeGraph};

use super::statement::Statement;

/// Shared label on every node this pipeline writes.
pub const NODE_LABEL: &str = "Qcbd";

fn node_statement(kind: EntityKind, entity: &Entity) -> Statement {
    Statement::new(format!(
        "MERGE (n:{label}:{kind_label} {{id: $id}})
         SET n.kind = $kind,
             n.name = $name,
             n.description = $description,
             n.category = $category,
             n.tags = $tags,
             n.stub = $stub",
        label = NODE_LABEL,
        kind_label = kind.label()
    ))
    .param("id", entity.id.as_str())
    .param("kind", kind.as_str())
    .param("name", entity.name.as_str())
    .param("description", entity.description.as_deref().unwrap_or(""))
    .param("category", entity.category.as_deref().unwrap_or(""))
    .param("tags", entity.tags.clone())
    .param("stub", entity.is_stub())
}

fn clear_edges_statement(id: &str) -> Statement {
    Statement::new(format!(
        "MATCH (n:{label} {{id: $id}})-[r]->(:{label})
         DELETE r",
        label = NODE_LABEL
    ))
    .param("id", id)
}

fn edge_statement(source: &str, edge_type: &str, target: &str) -> Statement {
    Statement::new(format!(
        "MATCH (a:{label} {{id: $source}}), (b:{label} {{id: $target}})
         MERGE (a)-[:{edge_type}]->(b)",
        label = NODE_LABEL,
        edge_type = edge_type
    ))
    .param("source", source)
    .param("target", target)
}

/// Statement deleting every pipeline node whose ID is not in `keep`.
/// Returns the number of removed nodes in the `removed` column.
pub fn prune_statement(keep: Vec<String>) -> Statement {
    Statement::new(format!(
        "MATCH (n:{label})
         WHERE NOT n.id IN $ids
         WITH collect(n) AS stale
         FOREACH (x IN stale | DETACH DELETE x)
         RETURN size(stale) AS removed",
        label = NODE_LABEL
    ))
    .param("ids", keep)
}

/// A planned sync, executed in field order.
#[derive(Debug, Clone, Default)]
pub struct SyncPlan {
    pub nodes: Vec<Statement>,
    pub clears: Vec<Statement>,
    pub edges: Vec<Statement>,
    pub skipped_edges: usize,
}

/// Build the statements that mirror `graph` into Neo4j.
pub fn plan_sync(graph: &KnowledgeGraph) -> SyncPlan {
    let mut plan = SyncPlan::default();
    let mut seen: HashSet<&str> = HashSet::with_capacity(graph.len());
    let index = graph.index();

    for (kind, entity) in graph.entities() {
        if !seen.insert(entity.id.as_str()) {
            continue;
        }
        plan.nodes.push(node_statement(kind, entity));
    }

    seen.clear();
    for (_, entity) in graph.entities() {
        if !seen.insert(entity.id.as_str()) {
            continue;
        }
        plan.clears.push(clear_edges_statement(&entity.id));
        for (relation, target) in entity.relationships().filter(|(r, _)| !r.is_derived()) {
            if !index.contains_key(target) {
                plan.skipped_edges += 1;
                continue;
            }
            plan.edges.push(edge_statement(&entity.id, relation.edge_type(), target));
        }
    }

    debug!(
        nodes = plan.nodes.len(),
        edges = plan.edges.len(),
        skipped = plan.skipped_edges,
        "Planned Neo4j sync"
    );
    plan
}
