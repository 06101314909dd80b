//! `qcbd query`: raw Cypher against Neo4j.

use anyhow::Result;
use clap::Args;
use colored::Colorize;

use qcbd_core::config::Config;

#[derive(Args)]
pub struct QueryArgs {
    /// Cypher query string
    pub cypher: String,
}

pub async fn execute(args: QueryArgs, config: &Config) -> Result<()> {
    let client = super::connect_graph(config).await?;
    let results = qcbd_graph::queries::search::raw_query(&client, &args.cypher).await?;

    if results.is_empty() {
        println!("{}", "No results.".dimmed());
    } else {
        for (i, result) in results.iter().enumerate() {
            println!("{}: {}", (i + 1).to_string().dimmed(), result);
        }
    }

    Ok(())
}
