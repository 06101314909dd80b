//! `qcbd status`: graph file, SQLite store and optional Neo4j summary.

use anyhow::Result;
use clap::Args;
use colored::Colorize;

use qcbd_core::config::Config;
use qcbd_core::loader;
use qcbd_db::queries::{entities, sync_runs};

#[derive(Args)]
pub struct StatusArgs {
    /// Also query Neo4j node and relationship counts
    #[arg(long)]
    pub neo4j: bool,
}

pub async fn execute(args: StatusArgs, config: &Config) -> Result<()> {
    println!("{}", "QCBD Status".bold());
    println!("{}", "─".repeat(40));

    let graph_path = &config.paths.graph;
    if graph_path.exists() {
        let graph = loader::load_graph(graph_path)?;
        println!("{} {}", "Graph:".bold(), graph_path.display());
        if !graph.metadata.version.is_empty() {
            println!("  Built by:      qcbd {}", graph.metadata.version);
        }
        if let Some(at) = &graph.metadata.generated_at {
            println!("  Generated:     {}", at);
        }
        for (collection, count) in graph.counts() {
            println!("  {:<14} {}", format!("{}:", collection), count.to_string().cyan());
        }
    } else {
        println!("{} {} {}", "Graph:".bold(), graph_path.display(), "(missing)".yellow());
    }

    println!();
    if config.paths.sqlite.exists() {
        let pool = qcbd_db::init_pool(&config.paths.sqlite)?;
        let counts = entities::counts(&pool)?;
        println!("{} {}", "SQLite:".bold(), config.paths.sqlite.display());
        for (kind, count) in &counts.entities {
            println!("  {:<14} {}", format!("{}:", kind), count);
        }
        println!("  {:<14} {}", "relationships:", counts.relationships);
        println!("  {:<14} {}", "embeddings:", counts.embeddings);

        for backend in ["sqlite", "neo4j"] {
            match sync_runs::last_run(&pool, backend)? {
                Some(run) => println!(
                    "  Last {:<8} {} ({} entities)",
                    format!("{}:", backend),
                    run.finished_at.green(),
                    run.entities
                ),
                None => println!("  Last {:<8} {}", format!("{}:", backend), "never".yellow()),
            }
        }
    } else {
        println!("{} {} {}", "SQLite:".bold(), config.paths.sqlite.display(), "(not created)".yellow());
    }

    if args.neo4j {
        println!();
        println!("{} {}", "Neo4j:".bold(), config.neo4j.uri);
        match super::connect_graph(config).await {
            Ok(client) => {
                let counts = client.get_counts().await?;
                println!("  Nodes:         {}", counts.nodes.to_string().cyan());
                println!("  Relationships: {}", counts.relationships.to_string().cyan());
            }
            Err(e) => println!("  {} {}", "unreachable:".red(), e),
        }
    }

    println!("{}", "─".repeat(40));
    Ok(())
}
