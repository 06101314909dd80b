//! ID namespace conventions.
//!
//! Every entity ID is `<prefix>.<local>` where the prefix names the kind
//! (`method.`, `concept.`, ...). Local parts are lowercase and use `_` in
//! place of whitespace.

use std::fmt;

use crate::model::EntityKind;

/// Normalize a raw ID: trim, lowercase, collapse whitespace runs to `_`.
pub fn normalize_id(raw: &str) -> String {
    raw.split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
        .to_lowercase()
}

/// Split an ID into its kind and local part.
pub fn split_id(id: &str) -> Option<(EntityKind, &str)> {
    let kind = EntityKind::from_id(id)?;
    Some((kind, &id[kind.prefix().len()..]))
}

/// Build a namespaced ID from a kind and a (possibly unnormalized) local part.
pub fn make_id(kind: EntityKind, local: &str) -> String {
    format!("{}{}", kind.prefix(), normalize_id(local))
}

/// Human-readable name derived from an ID's local part.
pub fn display_name(id: &str) -> String {
    let local = split_id(id).map(|(_, l)| l).unwrap_or(id);
    local.replace(['_', '-'], " ")
}

fn is_allowed(c: char) -> bool {
    c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '_' | '.' | '-' | '+' | '(' | ')')
}

/// Problem with an ID's namespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NamespaceIssue {
    MissingPrefix,
    WrongPrefix { expected: EntityKind, found: EntityKind },
    EmptyLocal,
    IllegalChars(String),
}

impl fmt::Display for NamespaceIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingPrefix => write!(f, "no known namespace prefix"),
            Self::WrongPrefix { expected, found } => write!(
                f,
                "expected prefix '{}' but found '{}'",
                expected.prefix(),
                found.prefix()
            ),
            Self::EmptyLocal => write!(f, "empty local part"),
            Self::IllegalChars(chars) => write!(f, "illegal characters: {}", chars),
        }
    }
}

/// Check that `id` lives in the namespace of `expected`.
pub fn check_namespace(id: &str, expected: EntityKind) -> Result<(), NamespaceIssue> {
    let (found, local) = split_id(id).ok_or(NamespaceIssue::MissingPrefix)?;
    if found != expected {
        return Err(NamespaceIssue::WrongPrefix { expected, found });
    }
    if local.is_empty() {
        return Err(NamespaceIssue::EmptyLocal);
    }
    let illegal: String = local.chars().filter(|c| !is_allowed(*c)).collect();
    if !illegal.is_empty() {
        return Err(NamespaceIssue::IllegalChars(illegal));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize() {
        assert_eq!(normalize_id("  Method.CCSD(T)  "), "method.ccsd(t)");
        assert_eq!(normalize_id("concept.density  functional\ttheory"), "concept.density_functional_theory");
    }

    #[test]
    fn test_make_and_display() {
        let id = make_id(EntityKind::Tool, "Quantum ESPRESSO");
        assert_eq!(id, "tool.quantum_espresso");
        assert_eq!(display_name(&id), "quantum espresso");
    }

    #[test]
    fn test_check_namespace() {
        assert!(check_namespace("method.ccsd(t)", EntityKind::Method).is_ok());
        assert_eq!(check_namespace("ccsd", EntityKind::Method), Err(NamespaceIssue::MissingPrefix));
        assert_eq!(
            check_namespace("tool.pyscf", EntityKind::Method),
            Err(NamespaceIssue::WrongPrefix { expected: EntityKind::Method, found: EntityKind::Tool })
        );
        assert_eq!(check_namespace("src.", EntityKind::Source), Err(NamespaceIssue::EmptyLocal));
        assert_eq!(
            check_namespace("concept.Spin Orbit", EntityKind::Concept),
            Err(NamespaceIssue::IllegalChars("S O".to_string()))
        );
    }
}
