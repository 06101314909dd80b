//! `qcbd build`: merge inputs into the knowledge graph.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use qcbd_core::builder::{BuildOptions, GraphBuilder, Precedence};
use qcbd_core::config::Config;
use qcbd_core::loader;

use crate::output;

#[derive(Args)]
pub struct BuildArgs {
    /// JSONL input files or directories (defaults to `paths.inputs`)
    #[arg(short, long = "input")]
    pub inputs: Vec<PathBuf>,

    /// Curated graph whose values override harvested ones
    #[arg(long)]
    pub expert: Option<PathBuf>,

    /// Ignore the existing graph file instead of enriching it
    #[arg(long)]
    pub fresh: bool,

    /// Create placeholder entities for dangling references
    #[arg(long)]
    pub stubs: bool,

    /// Skip the timestamped snapshot of the previous graph
    #[arg(long)]
    pub no_snapshot: bool,

    /// Print the build report as JSON
    #[arg(long)]
    pub json: bool,
}

pub fn execute(args: BuildArgs, config: &Config) -> Result<()> {
    let graph_path = &config.paths.graph;
    let mut builder = GraphBuilder::new(BuildOptions {
        create_stubs: args.stubs || config.validation.create_stubs,
    });

    if !args.fresh {
        let existing = loader::load_graph(graph_path)
            .with_context(|| format!("Failed to read {}", graph_path.display()))?;
        if !existing.is_empty() {
            builder.add_graph(&graph_path.display().to_string(), existing, Precedence::Harvested);
        }
    }

    let inputs = if args.inputs.is_empty() { config.paths.inputs.clone() } else { args.inputs };
    let mut skipped = 0;
    for file in loader::collect_inputs(&inputs)? {
        let batch = loader::load_jsonl(&file).with_context(|| format!("Failed to read {}", file.display()))?;
        skipped += batch.skipped;
        builder.add_source(&file.display().to_string(), batch.entities, Precedence::Harvested);
    }

    if let Some(expert) = args.expert.as_ref().or(config.paths.expert.as_ref()) {
        let graph = loader::load_expert_graph(expert)
            .with_context(|| format!("Failed to read expert graph {}", expert.display()))?;
        builder.add_graph(&expert.display().to_string(), graph, Precedence::Expert);
    }

    let mut outcome = builder.build();
    outcome.report.skipped += skipped;

    let snapshot_dir = (!args.no_snapshot).then_some(config.paths.snapshots.as_path());
    let snapshot = loader::save_graph(graph_path, &outcome.graph, snapshot_dir)?;

    if args.json {
        return output::print_json(&outcome.report);
    }

    let report = &outcome.report;
    println!("{}", "Knowledge graph built:".green().bold());
    println!("  Output:          {}", graph_path.display());
    if let Some(snap) = snapshot {
        println!("  Snapshot:        {}", snap.display().to_string().dimmed());
    }
    for (collection, count) in &outcome.graph.metadata.counts {
        println!("  {:<16} {}", format!("{}:", collection), count.to_string().cyan());
    }
    println!("  Records read:    {}", report.inputs);
    println!("  Merged dupes:    {}", report.merged);
    println!("  Skipped:         {}", report.skipped);
    println!("  Inverse links:   {}", report.inverse_links);
    println!("  Stubs created:   {}", report.stubs_created);

    if report.dangling.is_empty() {
        println!("  Dangling refs:   {}", "0".green());
    } else {
        println!("  Dangling refs:   {}", report.dangling.len().to_string().yellow());
        for d in report.dangling.iter().take(10) {
            println!("    {} {} {}", d.source.dimmed(), d.relation.field(), d.target.yellow());
        }
        if report.dangling.len() > 10 {
            println!("    {}", format!("... and {} more", report.dangling.len() - 10).dimmed());
        }
    }

    Ok(())
}
