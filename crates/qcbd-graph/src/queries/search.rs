//! Full-text search and Cypher passthrough.

use anyhow::Result;
use neo4rs::Query;
use serde::Serialize;

use crate::GraphClient;

/// A search result from the graph.
#[derive(Debug, Clone, Serialize)]
pub struct SearchResult {
    pub id: String,
    pub kind: String,
    pub name: String,
    pub score: f64,
    pub snippet: String,
}

/// Search names, descriptions and categories through the `qcbd_search` index.
pub async fn search(client: &GraphClient, query_text: &str, limit: usize) -> Result<Vec<SearchResult>> {
    let query = Query::new(
        "CALL db.index.fulltext.queryNodes('qcbd_search', $query)
         YIELD node, score
         RETURN node.id as id, node.kind as kind, node.name as name,
                score, COALESCE(node.description, '') as snippet
         ORDER BY score DESC
         LIMIT $limit"
            .to_string(),
    )
    .param("query", escape_lucene(query_text))
    .param("limit", limit as i64);

    let mut results = Vec::new();
    for row in client.query(query).await? {
        let id: String = row.get("id").unwrap_or_default();
        if id.is_empty() {
            continue;
        }
        results.push(SearchResult {
            id,
            kind: row.get("kind").unwrap_or_default(),
            name: row.get("name").unwrap_or_default(),
            score: row.get("score").unwrap_or(0.0),
            snippet: row.get("snippet").unwrap_or_default(),
        });
    }
    Ok(results)
}

/// Escape Lucene query syntax so names like `B3LYP/6-31G*` match literally.
fn escape_lucene(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(
            c,
            '+' | '-' | '&' | '|' | '!' | '(' | ')' | '{' | '}' | '[' | ']' | '^' | '"' | '~' | '*' | '?' | ':'
                | '\\' | '/'
        ) {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Execute a raw Cypher query and return each row as a JSON object.
pub async fn raw_query(client: &GraphClient, cypher: &str) -> Result<Vec<serde_json::Value>> {
    let rows = client.query(Query::new(cypher.to_string())).await?;

    Ok(rows
        .into_iter()
        .map(|row| {
            row.to::<serde_json::Value>()
                .unwrap_or_else(|_| serde_json::json!({ "row": format!("{:?}", row) }))
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_lucene() {
        assert_eq!(escape_lucene("B3LYP/6-31G*"), r"B3LYP\/6\-31G\*");
        assert_eq!(escape_lucene("CCSD(T)"), r"CCSD\(T\)");
        assert_eq!(escape_lucene("density functional"), "density functional");
        assert_eq!(escape_lucene(r"a\b"), r"a\\b");
    }
}
