//! `qcbd show`: one entity and its neighbourhood.

use anyhow::Result;
use clap::Args;
use colored::Colorize;

use qcbd_core::config::Config;
use qcbd_core::ids::normalize_id;
use qcbd_db::queries::entities::{self, Direction};

use crate::output::{self, kind_label};

#[derive(Args)]
pub struct ShowArgs {
    /// Entity ID, e.g. method.ccsd_t
    pub id: String,

    /// Explore the neighbourhood in Neo4j instead of SQLite
    #[arg(long)]
    pub graph: bool,

    /// Traversal depth for --graph
    #[arg(long, default_value = "2")]
    pub depth: u32,

    /// Print the entity as JSON
    #[arg(long)]
    pub json: bool,
}

pub async fn execute(args: ShowArgs, config: &Config) -> Result<()> {
    let id = normalize_id(&args.id);
    if args.graph {
        return show_graph(&id, args.depth, args.json, config).await;
    }

    let pool = qcbd_db::init_pool(&config.paths.sqlite)?;
    let row = match entities::get_entity(&pool, &id) {
        Ok(row) => row,
        Err(qcbd_db::DbError::NotFound(_)) => {
            anyhow::bail!("Entity '{}' not found. Run 'qcbd sync sqlite' after building.", id)
        }
        Err(e) => return Err(e.into()),
    };
    let links = entities::neighbors(&pool, &id)?;

    if args.json {
        let entity = row.entity()?;
        return output::print_json(&serde_json::json!({ "entity": entity, "neighbors": links }));
    }

    println!("{} [{}]", row.name.bold(), kind_label(&row.kind));
    println!("  {}", row.id.dimmed());
    if row.is_stub {
        println!("  {}", "(stub: referenced but never described)".yellow());
    }
    if let Some(category) = &row.category {
        println!("  Category: {}", category);
    }
    if let Some(description) = &row.description {
        println!();
        println!("{}", description);
    }

    let entity = row.entity()?;
    if !entity.tags.is_empty() {
        println!();
        println!("  Tags: {}", entity.tags.join(", "));
    }
    if !entity.results.is_empty() {
        println!();
        println!("{}", "Results".bold());
        for r in &entity.results {
            println!(
                "  {:<30} {} {}",
                r.method,
                r.value,
                r.unit.as_deref().unwrap_or("").dimmed()
            );
        }
    }

    if !links.is_empty() {
        println!();
        println!("{} ({})", "Relationships".bold(), links.len());
        for n in &links {
            let arrow = match n.direction {
                Direction::Outgoing => "→",
                Direction::Incoming => "←",
            };
            let name = match &n.name {
                Some(name) => name.normal(),
                None => "(missing)".red(),
            };
            println!("  {} {:<16} {} {}", arrow.dimmed(), n.rel_type.yellow(), n.id, name);
        }
    }

    Ok(())
}

async fn show_graph(id: &str, depth: u32, json: bool, config: &Config) -> Result<()> {
    let client = super::connect_graph(config).await?;
    let nodes = qcbd_graph::queries::explore::neighbors(&client, id, depth).await?;

    if json {
        return output::print_json(&nodes);
    }

    println!("{} {} (depth={})", "Exploring".bold(), id.yellow(), depth);
    println!("{}", "─".repeat(50));
    if nodes.is_empty() {
        println!("{}", "No connected entities found.".dimmed());
        return Ok(());
    }
    for node in &nodes {
        println!(
            "  {} [{}] {} {} {}",
            node.distance.to_string().dimmed(),
            kind_label(&node.kind),
            node.name,
            format!("({})", node.id).dimmed(),
            node.via.yellow()
        );
    }
    println!("\n{} connected entities.", nodes.len().to_string().bold());
    Ok(())
}
