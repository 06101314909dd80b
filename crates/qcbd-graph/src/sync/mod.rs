//! Knowledge graph to Neo4j synchronization pipeline.
//!
//! Builds a statement plan from the merged graph and runs it against a
//! [`StatementSink`]. All writes are MERGEs, so re-running is safe.

pub mod plan;
pub mod statement;

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::info;

use qcbd_core::KnowledgeGraph;

pub use plan::{plan_sync, prune_statement, SyncPlan, NODE_LABEL};
pub use statement::{ParamValue, Statement, StatementSink};

/// Result of a sync operation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncResult {
    pub nodes_merged: usize,
    pub relationships_merged: usize,
    pub relationships_skipped: usize,
    pub nodes_pruned: usize,
}

/// Run a full sync of `graph` into the sink.
pub async fn run_sync<S: StatementSink + ?Sized>(
    sink: &S,
    graph: &KnowledgeGraph,
    prune: bool,
) -> Result<SyncResult> {
    info!(entities = graph.len(), prune, "Starting Neo4j sync");

    let plan = plan_sync(graph);
    let mut result = SyncResult {
        relationships_skipped: plan.skipped_edges,
        ..Default::default()
    };

    for statement in &plan.nodes {
        sink.execute(statement).await.context("Failed to sync nodes")?;
        result.nodes_merged += 1;
    }

    for statement in &plan.clears {
        sink.execute(statement).await.context("Failed to clear stale relationships")?;
    }

    for statement in &plan.edges {
        sink.execute(statement).await.context("Failed to sync relationships")?;
        result.relationships_merged += 1;
    }

    if prune {
        let keep: Vec<String> = graph.entities().map(|(_, e)| e.id.clone()).collect();
        let removed = sink
            .fetch_count(&prune_statement(keep), "removed")
            .await
            .context("Failed to prune stale nodes")?;
        result.nodes_pruned = removed.max(0) as usize;
    }

    info!(
        nodes = result.nodes_merged,
        relationships = result.relationships_merged,
        skipped = result.relationships_skipped,
        pruned = result.nodes_pruned,
        "Neo4j sync complete"
    );
    Ok(result)
}
