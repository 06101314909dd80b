//! `qcbd validate`: namespace and reference checks.

use anyhow::Result;
use clap::Args;
use colored::Colorize;

use qcbd_core::config::Config;
use qcbd_core::loader;
use qcbd_core::validate::{validate, ValidateOptions};

use crate::output;

#[derive(Args)]
pub struct ValidateArgs {
    /// Treat every issue as an error and exit non-zero when any is found
    #[arg(long)]
    pub strict: bool,

    /// Print the report as JSON
    #[arg(long)]
    pub json: bool,
}

pub fn execute(args: ValidateArgs, config: &Config) -> Result<()> {
    let graph = loader::load_graph(&config.paths.graph)?;
    let options = ValidateOptions {
        strict: args.strict || config.validation.strict,
    };
    let report = validate(&graph, &options);

    if args.json {
        output::print_json(&report)?;
    } else {
        println!("{} ({} entities)", "Validation".bold(), report.entities_checked);
        println!("{}", "─".repeat(50));

        if report.issues.is_empty() {
            println!("{}", "No issues found.".green());
        } else {
            for issue in &report.issues {
                output::print_issue(issue);
            }
            println!();
            for (kind, count) in report.count_by_kind() {
                println!("  {:<26} {}", kind.as_str(), count);
            }
        }
    }

    if !report.is_ok() {
        anyhow::bail!("validation failed with {} error(s)", report.errors().count());
    }
    Ok(())
}
