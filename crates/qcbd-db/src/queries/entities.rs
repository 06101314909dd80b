//! Entity and relationship queries.

use std::collections::BTreeMap;

use rusqlite::{params, OptionalExtension, Row};
use serde::Serialize;

use qcbd_core::{Entity, EntityKind};

use crate::pool::{DbError, DbPool, DbResult};

/// Entity row from database.
#[derive(Debug, Clone, Serialize)]
pub struct EntityRow {
    pub id: String,
    pub kind: String,
    pub name: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub data: String,
    pub is_stub: bool,
    pub updated_at: String,
}

impl EntityRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            kind: row.get(1)?,
            name: row.get(2)?,
            description: row.get(3)?,
            category: row.get(4)?,
            data: row.get(5)?,
            is_stub: row.get(6)?,
            updated_at: row.get(7)?,
        })
    }

    /// Decode the full entity from its stored JSON.
    pub fn entity(&self) -> DbResult<Entity> {
        Ok(serde_json::from_str(&self.data)?)
    }
}

const ENTITY_COLUMNS: &str = "id, kind, name, description, category, data, is_stub, updated_at";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Outgoing,
    Incoming,
}

/// An entity connected to another by one relationship.
#[derive(Debug, Clone, Serialize)]
pub struct Neighbor {
    pub direction: Direction,
    pub rel_type: String,
    pub id: String,
    /// `None` when the relationship target is dangling.
    pub name: Option<String>,
}

/// Row counts for status display.
#[derive(Debug, Clone, Default, Serialize)]
pub struct StoreCounts {
    pub entities: BTreeMap<String, usize>,
    pub relationships: usize,
    pub embeddings: usize,
}

/// Get an entity by ID.
pub fn get_entity(pool: &DbPool, id: &str) -> DbResult<EntityRow> {
    pool.with_conn(|conn| {
        conn.query_row(
            &format!("SELECT {} FROM entities WHERE id = ?1", ENTITY_COLUMNS),
            params![id],
            EntityRow::from_row,
        )
        .optional()?
        .ok_or_else(|| DbError::NotFound(id.to_string()))
    })
}

/// List entities, optionally filtered by kind, ordered by ID.
pub fn list_entities(pool: &DbPool, kind: Option<EntityKind>) -> DbResult<Vec<EntityRow>> {
    pool.with_conn(|conn| {
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM entities WHERE (?1 IS NULL OR kind = ?1) ORDER BY id",
            ENTITY_COLUMNS
        ))?;
        let rows = stmt
            .query_map(params![kind.map(|k| k.as_str())], EntityRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    })
}

fn escape_like(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Case-insensitive keyword search over name, description and category.
///
/// Name matches rank before description-only matches.
pub fn search_keyword(
    pool: &DbPool,
    text: &str,
    kind: Option<EntityKind>,
    limit: usize,
) -> DbResult<Vec<EntityRow>> {
    let pattern = format!("%{}%", escape_like(text.trim()));
    pool.with_conn(|conn| {
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM entities
             WHERE (?2 IS NULL OR kind = ?2)
               AND (name LIKE ?1 ESCAPE '\\'
                    OR description LIKE ?1 ESCAPE '\\'
                    OR category LIKE ?1 ESCAPE '\\'
                    OR id LIKE ?1 ESCAPE '\\')
             ORDER BY CASE WHEN name LIKE ?1 ESCAPE '\\' THEN 0 ELSE 1 END, name, id
             LIMIT ?3",
            ENTITY_COLUMNS
        ))?;
        let rows = stmt
            .query_map(
                params![pattern, kind.map(|k| k.as_str()), limit as i64],
                EntityRow::from_row,
            )?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    })
}

/// Entities one relationship away from `id`, in both directions.
pub fn neighbors(pool: &DbPool, id: &str) -> DbResult<Vec<Neighbor>> {
    pool.with_conn(|conn| {
        let mut stmt = conn.prepare(
            "SELECT 'out', r.rel_type, r.target_id, e.name
             FROM relationships r LEFT JOIN entities e ON e.id = r.target_id
             WHERE r.source_id = ?1
             UNION ALL
             SELECT 'in', r.rel_type, r.source_id, e.name
             FROM relationships r LEFT JOIN entities e ON e.id = r.source_id
             WHERE r.target_id = ?1
             ORDER BY 1 DESC, 2, 3",
        )?;
        let rows = stmt
            .query_map(params![id], |row| {
                let dir: String = row.get(0)?;
                Ok(Neighbor {
                    direction: if dir == "out" { Direction::Outgoing } else { Direction::Incoming },
                    rel_type: row.get(1)?,
                    id: row.get(2)?,
                    name: row.get(3)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    })
}

/// Row counts per kind plus relationship and embedding totals.
pub fn counts(pool: &DbPool) -> DbResult<StoreCounts> {
    pool.with_conn(|conn| {
        let mut counts = StoreCounts::default();
        let mut stmt = conn.prepare("SELECT kind, COUNT(*) FROM entities GROUP BY kind")?;
        let mut rows = stmt.query([])?;
        while let Some(row) = rows.next()? {
            let kind: String = row.get(0)?;
            let n: i64 = row.get(1)?;
            counts.entities.insert(kind, n as usize);
        }
        counts.relationships =
            conn.query_row("SELECT COUNT(*) FROM relationships", [], |r| r.get::<_, i64>(0))? as usize;
        counts.embeddings =
            conn.query_row("SELECT COUNT(*) FROM embeddings", [], |r| r.get::<_, i64>(0))? as usize;
        Ok(counts)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{init_memory_pool, sync_graph};
    use qcbd_core::KnowledgeGraph;

    fn seeded() -> DbPool {
        let mut graph = KnowledgeGraph::default();
        let mut dft = Entity::new("method.dft", "Density Functional Theory");
        dft.description = Some("Ground-state electronic structure".into());
        dft.theoretical_basis = vec!["concept.hohenberg_kohn".into()];
        dft.implemented_in = vec!["tool.missing".into()];
        graph.insert(dft).unwrap();
        let mut ccsd = Entity::new("method.ccsd_t", "CCSD(T)");
        ccsd.description = Some("Gold standard for electronic structure".into());
        graph.insert(ccsd).unwrap();
        graph.insert(Entity::new("concept.hohenberg_kohn", "Hohenberg-Kohn theorems")).unwrap();
        graph.insert(Entity::new("tool.x_100%", "Odd tool")).unwrap();

        let pool = init_memory_pool().unwrap();
        sync_graph(&pool, &graph, false).unwrap();
        pool
    }

    #[test]
    fn test_get_and_list() {
        let pool = seeded();
        let row = get_entity(&pool, "method.dft").unwrap();
        assert_eq!(row.kind, "method");
        assert_eq!(row.entity().unwrap().theoretical_basis, vec!["concept.hohenberg_kohn"]);
        assert!(matches!(get_entity(&pool, "method.nope"), Err(DbError::NotFound(_))));

        let methods = list_entities(&pool, Some(EntityKind::Method)).unwrap();
        let ids: Vec<&str> = methods.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["method.ccsd_t", "method.dft"]);
        assert_eq!(list_entities(&pool, None).unwrap().len(), 4);
    }

    #[test]
    fn test_keyword_search_ranks_name_matches() {
        let pool = seeded();
        let hits = search_keyword(&pool, "ELECTRONIC", None, 10).unwrap();
        assert_eq!(hits.len(), 2);

        let hits = search_keyword(&pool, "theor", None, 10).unwrap();
        let ids: Vec<&str> = hits.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["method.dft", "concept.hohenberg_kohn"]);

        let hits = search_keyword(&pool, "theor", Some(EntityKind::Concept), 10).unwrap();
        assert_eq!(hits.len(), 1);

        let hits = search_keyword(&pool, "100%", None, 10).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(search_keyword(&pool, "%", None, 10).unwrap().len(), 1);
    }

    #[test]
    fn test_neighbors_both_directions() {
        let pool = seeded();
        let out = neighbors(&pool, "method.dft").unwrap();
        assert_eq!(out.len(), 2);
        let missing = out.iter().find(|n| n.id == "tool.missing").unwrap();
        assert_eq!(missing.name, None);
        assert_eq!(missing.direction, Direction::Outgoing);

        let incoming = neighbors(&pool, "concept.hohenberg_kohn").unwrap();
        assert_eq!(incoming.len(), 1);
        assert_eq!(incoming[0].direction, Direction::Incoming);
        assert_eq!(incoming[0].rel_type, "BASED_ON");
        assert_eq!(incoming[0].name.as_deref(), Some("Density Functional Theory"));
    }

    #[test]
    fn test_counts() {
        let pool = seeded();
        let counts = counts(&pool).unwrap();
        assert_eq!(counts.entities["method"], 2);
        assert_eq!(counts.relationships, 2);
        assert_eq!(counts.embeddings, 0);
    }
}
