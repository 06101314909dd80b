//! Terminal output formatting.

use colored::{ColoredString, Colorize};

use qcbd_core::validate::{Issue, Severity};
use qcbd_core::EntityKind;
use qcbd_db::queries::entities::EntityRow;

/// Color an entity kind consistently across commands.
pub fn kind_label(kind: &str) -> ColoredString {
    match EntityKind::parse(kind) {
        Some(EntityKind::Method) => kind.cyan(),
        Some(EntityKind::Concept) => kind.magenta(),
        Some(EntityKind::Tool) => kind.green(),
        Some(EntityKind::Benchmark) => kind.yellow(),
        Some(EntityKind::UseCase) => kind.blue(),
        Some(EntityKind::Source) => kind.white(),
        None => kind.normal(),
    }
}

/// Print entity rows as a table.
pub fn print_entities_table(rows: &[EntityRow]) {
    if rows.is_empty() {
        println!("{}", "No entities found.".dimmed());
        return;
    }

    println!("{:<40} {:<10} {:<40}", "ID", "Kind", "Name");
    println!("{}", "─".repeat(92));

    for row in rows {
        println!(
            "{:<40} {:<10} {:<40}",
            truncate(&row.id, 38),
            kind_label(&row.kind),
            truncate(&row.name, 38)
        );
    }

    println!();
    println!("{} result(s)", rows.len());
}

/// Print one validation issue.
pub fn print_issue(issue: &Issue) {
    let severity = match issue.severity {
        Severity::Error => "error".red().bold(),
        Severity::Warning => "warn".yellow(),
    };
    println!(
        "  {} [{}] {}: {}",
        severity,
        issue.kind.as_str().dimmed(),
        issue.entity_id.bold(),
        issue.message
    );
}

/// Print a pretty JSON value on stdout.
pub fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Truncate a string to `max` characters, appending an ellipsis.
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(1)).collect();
        format!("{}…", kept)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("Hohenberg-Kohn theorems", 10), "Hohenberg…");
        assert_eq!(truncate("Møller–Plesset", 6), "Mølle…");
    }
}
