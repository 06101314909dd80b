//! CLI command definitions and handlers.

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use qcbd_core::config::Config;

pub mod build;
pub mod export;
pub mod query;
pub mod search;
pub mod show;
pub mod stats;
pub mod status;
pub mod sync;
pub mod validate;

/// QCBD - Quantum Chemistry/Physics Database knowledge toolkit
#[derive(Parser)]
#[command(name = "qcbd")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to qcbd.toml (defaults to ./qcbd.toml, then the user config dir)
    #[arg(short, long, global = true, env = "QCBD_CONFIG")]
    pub config: Option<PathBuf>,

    /// Also write logs to this file
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Merge inputs into the knowledge graph
    Build(build::BuildArgs),

    /// Check IDs and cross-references
    Validate(validate::ValidateArgs),

    /// Benchmark error statistics
    Stats(stats::StatsArgs),

    /// Sync the knowledge graph to a backend
    #[command(subcommand)]
    Sync(sync::SyncCommands),

    /// Search entities
    Search(search::SearchArgs),

    /// Execute a Cypher query against Neo4j
    Query(query::QueryArgs),

    /// Show one entity and its neighbours
    Show(show::ShowArgs),

    /// Export entities as JSON or JSONL
    Export(export::ExportArgs),

    /// Show store status
    Status(status::StatusArgs),
}

impl Cli {
    pub async fn execute(self) -> Result<()> {
        let config = Config::load(self.config.as_deref())?;

        match self.command {
            Commands::Build(args) => build::execute(args, &config),
            Commands::Validate(args) => validate::execute(args, &config),
            Commands::Stats(args) => stats::execute(args, &config),
            Commands::Sync(cmd) => sync::execute(cmd, &config).await,
            Commands::Search(args) => search::execute(args, &config).await,
            Commands::Query(args) => query::execute(args, &config).await,
            Commands::Show(args) => show::execute(args, &config).await,
            Commands::Export(args) => export::execute(args, &config),
            Commands::Status(args) => status::execute(args, &config).await,
        }
    }
}

/// Connect to Neo4j, failing fast when it is unreachable.
pub(crate) async fn connect_graph(config: &Config) -> Result<qcbd_graph::GraphClient> {
    let graph_config = qcbd_graph::GraphConfig::from(config.neo4j.clone());
    match tokio::time::timeout(
        std::time::Duration::from_secs(10),
        qcbd_graph::GraphClient::connect(&graph_config),
    )
    .await
    {
        Ok(client) => client,
        Err(_) => anyhow::bail!("Timed out connecting to Neo4j at {}", graph_config.uri),
    }
}
