//! `qcbd sync`: push the knowledge graph into SQLite or Neo4j.

use std::time::Duration;

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::warn;

use qcbd_core::config::Config;
use qcbd_core::loader;

#[derive(Subcommand)]
pub enum SyncCommands {
    /// Upsert entities and relationships into the SQLite store
    Sqlite {
        /// Delete rows for entities no longer in the graph
        #[arg(long)]
        prune: bool,
    },

    /// Merge nodes and relationships into Neo4j
    Neo4j {
        /// Detach-delete nodes no longer in the graph
        #[arg(long)]
        prune: bool,
    },
}

pub async fn execute(cmd: SyncCommands, config: &Config) -> Result<()> {
    let graph = loader::load_graph(&config.paths.graph)
        .with_context(|| format!("Failed to read {}", config.paths.graph.display()))?;
    if graph.is_empty() {
        anyhow::bail!(
            "Knowledge graph {} is empty. Run 'qcbd build' first.",
            config.paths.graph.display()
        );
    }

    match cmd {
        SyncCommands::Sqlite { prune } => {
            let pool = qcbd_db::init_pool(&config.paths.sqlite)?;
            let stats = qcbd_db::sync_graph(&pool, &graph, prune)?;

            println!("{}", "SQLite sync complete:".green().bold());
            println!("  Database:      {}", config.paths.sqlite.display());
            println!("  Inserted:      {}", stats.inserted.to_string().cyan());
            println!("  Updated:       {}", stats.updated.to_string().cyan());
            println!("  Unchanged:     {}", stats.unchanged);
            println!("  Removed:       {}", stats.removed);
            println!("  Relationships: {}", stats.relationships);
        }
        SyncCommands::Neo4j { prune } => {
            let started_at = chrono::Utc::now().to_rfc3339();
            let client = super::connect_graph(config).await?;
            qcbd_graph::schema::initialize_schema(&client).await?;

            let spinner = ProgressBar::new_spinner();
            spinner.set_style(ProgressStyle::with_template("{spinner:.cyan} {msg}")?);
            spinner.enable_steady_tick(Duration::from_millis(80));
            spinner.set_message(format!("Syncing {} entities to Neo4j...", graph.len()));

            let result = qcbd_graph::run_sync(&client, &graph, prune).await;
            spinner.finish_and_clear();
            let result = result?;

            // The run log lives in SQLite; a missing store must not fail the sync.
            match qcbd_db::init_pool(&config.paths.sqlite) {
                Ok(pool) => {
                    if let Err(e) = qcbd_db::queries::sync_runs::record_run(
                        &pool,
                        "neo4j",
                        &started_at,
                        result.nodes_merged,
                        result.relationships_merged,
                    ) {
                        warn!(error = %e, "Could not record Neo4j sync run");
                    }
                }
                Err(e) => warn!(error = %e, "Could not open SQLite store to record sync run"),
            }

            println!("{}", "Neo4j sync complete:".green().bold());
            println!("  Nodes merged:          {}", result.nodes_merged.to_string().cyan());
            println!("  Relationships merged:  {}", result.relationships_merged.to_string().cyan());
            println!("  Relationships skipped: {}", result.relationships_skipped);
            if prune {
                println!("  Nodes pruned:          {}", result.nodes_pruned);
            }
        }
    }

    Ok(())
}
