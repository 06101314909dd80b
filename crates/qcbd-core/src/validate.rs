//! Knowledge-graph validation.
//!
//! Checks ID uniqueness, namespace prefixes and reference integrity. Every
//! finding is a warning unless strict mode promotes it to an error.

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;
use tracing::{info, warn};

use crate::ids::check_namespace;
use crate::model::{EntityKind, KnowledgeGraph};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Warning,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    DuplicateId,
    Namespace,
    DanglingReference,
    WrongTargetKind,
    SelfReference,
    MissingName,
    BenchmarkMethodUnknown,
}

impl IssueKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DuplicateId => "duplicate_id",
            Self::Namespace => "namespace",
            Self::DanglingReference => "dangling_reference",
            Self::WrongTargetKind => "wrong_target_kind",
            Self::SelfReference => "self_reference",
            Self::MissingName => "missing_name",
            Self::BenchmarkMethodUnknown => "benchmark_method_unknown",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Issue {
    pub severity: Severity,
    pub kind: IssueKind,
    pub entity_id: String,
    pub message: String,
}

#[derive(Debug, Clone, Default)]
pub struct ValidateOptions {
    pub strict: bool,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ValidationReport {
    pub entities_checked: usize,
    pub issues: Vec<Issue>,
}

impl ValidationReport {
    /// False only when at least one error-severity issue exists.
    pub fn is_ok(&self) -> bool {
        !self.issues.iter().any(|i| i.severity == Severity::Error)
    }

    pub fn errors(&self) -> impl Iterator<Item = &Issue> {
        self.issues.iter().filter(|i| i.severity == Severity::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Issue> {
        self.issues.iter().filter(|i| i.severity == Severity::Warning)
    }

    pub fn count_by_kind(&self) -> BTreeMap<IssueKind, usize> {
        let mut counts = BTreeMap::new();
        for issue in &self.issues {
            *counts.entry(issue.kind).or_insert(0) += 1;
        }
        counts
    }
}

struct Collector {
    severity: Severity,
    issues: Vec<Issue>,
}

impl Collector {
    fn push(&mut self, kind: IssueKind, entity_id: &str, message: String) {
        warn!(kind = kind.as_str(), entity = entity_id, "{}", message);
        self.issues.push(Issue {
            severity: self.severity,
            kind,
            entity_id: entity_id.to_string(),
            message,
        });
    }
}

/// Validate a knowledge graph.
pub fn validate(graph: &KnowledgeGraph, options: &ValidateOptions) -> ValidationReport {
    let mut out = Collector {
        severity: if options.strict { Severity::Error } else { Severity::Warning },
        issues: Vec::new(),
    };

    let mut index: HashMap<&str, EntityKind> = HashMap::with_capacity(graph.len());
    for (kind, entity) in graph.entities() {
        if let Some(first) = index.get(entity.id.as_str()) {
            out.push(
                IssueKind::DuplicateId,
                &entity.id,
                format!("id appears in '{}' and '{}'", first.collection(), kind.collection()),
            );
        } else {
            index.insert(entity.id.as_str(), kind);
        }
    }

    for (kind, entity) in graph.entities() {
        if let Err(issue) = check_namespace(&entity.id, kind) {
            out.push(
                IssueKind::Namespace,
                &entity.id,
                format!("in '{}': {}", kind.collection(), issue),
            );
        }

        if entity.name.trim().is_empty() {
            out.push(IssueKind::MissingName, &entity.id, "entity has no name".to_string());
        }

        for (relation, target) in entity.relationships() {
            if target == entity.id {
                out.push(
                    IssueKind::SelfReference,
                    &entity.id,
                    format!("'{}' references itself", relation.field()),
                );
                continue;
            }
            match index.get(target) {
                None => out.push(
                    IssueKind::DanglingReference,
                    &entity.id,
                    format!("'{}' references unknown id '{}'", relation.field(), target),
                ),
                Some(actual) if *actual != relation.target_kind() => out.push(
                    IssueKind::WrongTargetKind,
                    &entity.id,
                    format!(
                        "'{}' expects a {} but '{}' is a {}",
                        relation.field(),
                        relation.target_kind(),
                        target,
                        actual
                    ),
                ),
                Some(_) => {}
            }
        }

        for result in &entity.results {
            if index.get(result.method.as_str()) != Some(&EntityKind::Method) {
                out.push(
                    IssueKind::BenchmarkMethodUnknown,
                    &entity.id,
                    format!("result for unknown method '{}'", result.method),
                );
            }
        }
    }

    let report = ValidationReport {
        entities_checked: graph.len(),
        issues: out.issues,
    };
    info!(
        entities = report.entities_checked,
        issues = report.issues.len(),
        strict = options.strict,
        "Validation finished"
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{BenchmarkResult, Entity};

    fn sample() -> KnowledgeGraph {
        let mut graph = KnowledgeGraph::default();
        let mut dft = Entity::new("method.dft", "DFT");
        dft.implemented_in = vec!["tool.pyscf".into()];
        dft.theoretical_basis = vec!["concept.hk".into()];
        graph.insert(dft).unwrap();
        graph.insert(Entity::new("tool.pyscf", "PySCF")).unwrap();
        graph.insert(Entity::new("concept.hk", "Hohenberg-Kohn")).unwrap();
        graph
    }

    #[test]
    fn test_clean_graph() {
        let report = validate(&sample(), &ValidateOptions::default());
        assert!(report.issues.is_empty());
        assert!(report.is_ok());
        assert_eq!(report.entities_checked, 3);
    }

    #[test]
    fn test_reference_problems() {
        let mut graph = sample();
        graph.methods[0].implemented_in.push("concept.hk".into());
        graph.methods[0].validated_on_benchmarks.push("benchmark.gmtkn55".into());
        graph.methods[0].applies_methods.push("method.dft".into());

        let report = validate(&graph, &ValidateOptions::default());
        let counts = report.count_by_kind();
        assert_eq!(counts[&IssueKind::WrongTargetKind], 1);
        assert_eq!(counts[&IssueKind::DanglingReference], 1);
        assert_eq!(counts[&IssueKind::SelfReference], 1);
        assert!(report.is_ok());
        assert_eq!(report.warnings().count(), 3);
    }

    #[test]
    fn test_namespace_duplicates_and_names() {
        let mut graph = sample();
        graph.tools.push(Entity::new("method.dft", "Dup"));
        graph.concepts.push(Entity::new("concept.Spin Orbit", ""));

        let report = validate(&graph, &ValidateOptions { strict: true });
        let counts = report.count_by_kind();
        assert_eq!(counts[&IssueKind::DuplicateId], 1);
        assert_eq!(counts[&IssueKind::Namespace], 2);
        assert_eq!(counts[&IssueKind::MissingName], 1);
        assert!(!report.is_ok());
        assert_eq!(report.errors().count(), report.issues.len());
    }

    #[test]
    fn test_benchmark_result_methods() {
        let mut graph = sample();
        let mut bench = Entity::new("benchmark.g2", "G2");
        bench.results = vec![
            BenchmarkResult { method: "method.dft".into(), value: 1.0, reference: Some(0.0), unit: None },
            BenchmarkResult { method: "method.ccsd".into(), value: 0.1, reference: Some(0.0), unit: None },
        ];
        graph.insert(bench).unwrap();

        let report = validate(&graph, &ValidateOptions::default());
        assert_eq!(report.issues.len(), 1);
        assert_eq!(report.issues[0].kind, IssueKind::BenchmarkMethodUnknown);
        assert_eq!(report.issues[0].entity_id, "benchmark.g2");
    }
}
