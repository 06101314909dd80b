//! `qcbd search`: keyword, semantic or Neo4j full-text search.

use anyhow::Result;
use clap::Args;
use colored::Colorize;

use qcbd_core::config::Config;
use qcbd_core::{loader, EntityKind};
use qcbd_embedding::{EmbeddingCache, HashEmbedder, SemanticSearch};

use crate::output::{self, kind_label, truncate};

#[derive(Args)]
pub struct SearchArgs {
    /// Search text
    pub text: String,

    /// Restrict results to one entity kind
    #[arg(short, long)]
    pub kind: Option<EntityKind>,

    /// Maximum number of results
    #[arg(short, long, default_value = "10")]
    pub limit: usize,

    /// Rank by hashed-embedding similarity instead of keywords
    #[arg(long, conflicts_with = "neo4j")]
    pub semantic: bool,

    /// Use the Neo4j full-text index
    #[arg(long)]
    pub neo4j: bool,

    /// Print results as JSON
    #[arg(long)]
    pub json: bool,
}

pub async fn execute(args: SearchArgs, config: &Config) -> Result<()> {
    if args.neo4j {
        return search_neo4j(&args, config).await;
    }
    if args.semantic {
        return search_semantic(&args, config);
    }

    let pool = qcbd_db::init_pool(&config.paths.sqlite)?;
    let rows = qcbd_db::queries::entities::search_keyword(&pool, &args.text, args.kind, args.limit)?;
    if args.json {
        return output::print_json(&rows);
    }
    output::print_entities_table(&rows);
    Ok(())
}

fn search_semantic(args: &SearchArgs, config: &Config) -> Result<()> {
    let graph = loader::load_graph(&config.paths.graph)?;
    let pool = qcbd_db::init_pool(&config.paths.sqlite)?;
    let cache = EmbeddingCache::new(pool, HashEmbedder::new(config.embedding.dims));
    cache.refresh(&graph)?;

    let mut results = SemanticSearch::new(&cache).search(&args.text, args.kind, args.limit)?;
    // Entity rows may not be synced yet; fall back to names from the graph file.
    for result in results.iter_mut().filter(|r| r.name.is_empty()) {
        if let Some(entity) = graph.get(&result.id) {
            result.name = entity.name.clone();
        }
    }

    if args.json {
        return output::print_json(&results);
    }
    if results.is_empty() {
        println!("{}", "No similar entities found.".dimmed());
        return Ok(());
    }

    println!("{:<8} {:<40} {:<10} {}", "Score", "ID", "Kind", "Name");
    println!("{}", "─".repeat(92));
    for r in &results {
        let kind = r.kind.map(|k| k.as_str()).unwrap_or("?");
        println!(
            "{:<8.3} {:<40} {:<10} {}",
            r.score,
            truncate(&r.id, 38),
            kind_label(kind),
            truncate(&r.name, 38)
        );
    }
    Ok(())
}

async fn search_neo4j(args: &SearchArgs, config: &Config) -> Result<()> {
    let client = super::connect_graph(config).await?;
    // Over-fetch so a kind filter still fills the page.
    let fetch = if args.kind.is_some() { args.limit * 4 } else { args.limit };
    let mut results = qcbd_graph::queries::search::search(&client, &args.text, fetch).await?;
    if let Some(kind) = args.kind {
        results.retain(|r| r.kind == kind.as_str());
    }
    results.truncate(args.limit);

    if args.json {
        return output::print_json(&results);
    }
    if results.is_empty() {
        println!("{}", "No results.".dimmed());
        return Ok(());
    }

    for r in &results {
        println!(
            "  {:>6.2} [{}] {} {}",
            r.score,
            kind_label(&r.kind),
            r.name.bold(),
            format!("({})", r.id).dimmed()
        );
        if !r.snippet.is_empty() {
            println!("         {}", truncate(&r.snippet, 80).dimmed());
        }
    }
    Ok(())
}
