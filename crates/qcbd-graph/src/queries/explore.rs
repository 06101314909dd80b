//! Neighbourhood queries around one entity.

use anyhow::Result;
use neo4rs::Query;
use serde::Serialize;

use crate::sync::NODE_LABEL;
use crate::GraphClient;

/// Depth is capped to keep variable-length matches bounded.
pub const MAX_DEPTH: u32 = 4;

/// A node reached from the start entity.
#[derive(Debug, Clone, Serialize)]
pub struct NeighborNode {
    pub id: String,
    pub kind: String,
    pub name: String,
    pub distance: i64,
    /// Relationship type of the first hop on the shortest path.
    pub via: String,
}

/// Entities within `depth` hops of `entity_id`, nearest first.
pub async fn neighbors(client: &GraphClient, entity_id: &str, depth: u32) -> Result<Vec<NeighborNode>> {
    let depth = depth.clamp(1, MAX_DEPTH);
    let query = Query::new(format!(
        "MATCH p = (start:{label} {{id: $id}})-[*1..{depth}]-(other:{label})
         WHERE start <> other
         WITH other, p ORDER BY length(p)
         WITH other, min(length(p)) AS distance,
              head(collect(type(relationships(p)[0]))) AS via
         RETURN other.id AS id, other.kind AS kind,
                COALESCE(other.name, other.id) AS name, distance, via
         ORDER BY distance, id
         LIMIT 100",
        label = NODE_LABEL,
        depth = depth
    ))
    .param("id", entity_id);

    let mut nodes = Vec::new();
    for row in client.query(query).await? {
        let id: String = row.get("id").unwrap_or_default();
        if id.is_empty() {
            continue;
        }
        nodes.push(NeighborNode {
            id,
            kind: row.get("kind").unwrap_or_default(),
            name: row.get("name").unwrap_or_default(),
            distance: row.get("distance").unwrap_or(0),
            via: row.get("via").unwrap_or_default(),
        });
    }
    Ok(nodes)
}
