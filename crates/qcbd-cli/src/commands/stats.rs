//! `qcbd stats`: benchmark error statistics.

use anyhow::Result;
use clap::Args;
use colored::Colorize;

use qcbd_core::config::Config;
use qcbd_core::{loader, stats};

use crate::output::{self, truncate};

#[derive(Args)]
pub struct StatsArgs {
    /// Number of methods to list
    #[arg(long, default_value = "20")]
    pub top: usize,

    /// Print the statistics as JSON
    #[arg(long)]
    pub json: bool,
}

pub fn execute(args: StatsArgs, config: &Config) -> Result<()> {
    let graph = loader::load_graph(&config.paths.graph)?;
    let report = stats::compute(&graph);

    if args.json {
        return output::print_json(&report);
    }

    if report.benchmarks.is_empty() {
        println!("{}", "No benchmark results with reference values.".dimmed());
        return Ok(());
    }

    println!("{}", "Benchmarks".bold());
    println!(
        "{:<30} {:>6} {:>10} {:>10} {:>10} {:>10}  {}",
        "ID", "N", "ME", "MAE", "RMSE", "MaxAE", "Best"
    );
    println!("{}", "─".repeat(100));
    for b in &report.benchmarks {
        println!(
            "{:<30} {:>6} {:>10.4} {:>10.4} {:>10.4} {:>10.4}  {}",
            truncate(&b.benchmark_id, 28),
            b.count,
            b.mean_error,
            b.mean_abs_error,
            b.rmse,
            b.max_abs_error,
            b.best_method.as_deref().unwrap_or("-").green()
        );
    }

    println!();
    println!("{}", "Methods (by MAE)".bold());
    println!("{:<30} {:>10} {:>8} {:>10} {:>10}", "ID", "Benchmarks", "N", "MAE", "RMSE");
    println!("{}", "─".repeat(72));
    for m in report.methods.iter().take(args.top) {
        println!(
            "{:<30} {:>10} {:>8} {:>10.4} {:>10.4}",
            truncate(&m.method_id, 28),
            m.benchmarks,
            m.results,
            m.mean_abs_error,
            m.rmse
        );
    }

    if report.skipped_results > 0 {
        println!();
        println!(
            "{}",
            format!("{} result(s) without a reference value skipped", report.skipped_results).dimmed()
        );
    }
    Ok(())
}
