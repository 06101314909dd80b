//! Knowledge-graph builder: merge sources, resolve cross-references.
//!
//! Entities from every source are deduplicated by normalized ID. Harvested
//! data only fills gaps in what is already known; expert data overrides it.
//! Relationship lists are unioned in first-seen order. The output is
//! sorted by ID, so rebuilding from the same inputs is byte-stable apart
//! from the `generated_at` stamp.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::ids::{display_name, normalize_id};
use crate::model::{BenchmarkResult, Entity, EntityKind, GraphMetadata, KnowledgeGraph, Relation};

/// How an incoming source's values rank against existing ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Precedence {
    /// Fill missing values only.
    Harvested,
    /// Overwrite existing values with any non-empty incoming value.
    Expert,
}

#[derive(Debug, Clone, Default)]
pub struct BuildOptions {
    /// Insert placeholder entities for dangling references with a known prefix.
    pub create_stubs: bool,
}

/// A relationship whose target does not exist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DanglingRef {
    pub source: String,
    pub relation: Relation,
    pub target: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct BuildReport {
    pub inputs: usize,
    pub merged: usize,
    pub skipped: usize,
    pub stubs_created: usize,
    pub inverse_links: usize,
    pub dangling: Vec<DanglingRef>,
}

#[derive(Debug, Clone)]
pub struct BuildOutcome {
    pub graph: KnowledgeGraph,
    pub report: BuildReport,
}

/// Accumulates sources and produces a merged [`KnowledgeGraph`].
#[derive(Debug, Default)]
pub struct GraphBuilder {
    options: BuildOptions,
    entities: BTreeMap<String, (EntityKind, Entity)>,
    sources: Vec<String>,
    report: BuildReport,
}

impl GraphBuilder {
    pub fn new(options: BuildOptions) -> Self {
        Self {
            options,
            ..Default::default()
        }
    }

    /// Add every entity of an existing graph.
    pub fn add_graph(&mut self, label: &str, graph: KnowledgeGraph, precedence: Precedence) -> &mut Self {
        self.add_source(label, graph.into_entities(), precedence)
    }

    /// Add a batch of entities from one source.
    pub fn add_source(&mut self, label: &str, entities: Vec<Entity>, precedence: Precedence) -> &mut Self {
        let count = entities.len();
        for entity in entities {
            self.add_entity(entity, precedence);
        }
        self.sources.push(label.to_string());
        debug!(source = label, entities = count, "Added source");
        self
    }

    fn add_entity(&mut self, mut entity: Entity, precedence: Precedence) {
        self.report.inputs += 1;
        entity.id = normalize_id(&entity.id);
        let Some(kind) = entity.kind() else {
            warn!(id = %entity.id, "Skipping entity without a known namespace prefix");
            self.report.skipped += 1;
            return;
        };
        for rel in Relation::ALL {
            let links = entity.links_mut(rel);
            let normalized: Vec<String> = links
                .iter()
                .map(|l| normalize_id(l))
                .filter(|l| !l.is_empty())
                .collect();
            *links = Vec::new();
            union_into(links, normalized);
        }
        let results = std::mem::take(&mut entity.results);
        for mut result in results {
            result.method = normalize_id(&result.method);
            push_result(&mut entity.results, result);
        }

        match self.entities.get_mut(&entity.id) {
            Some((_, existing)) => {
                merge_entity(existing, entity, precedence);
                self.report.merged += 1;
            }
            None => {
                self.entities.insert(entity.id.clone(), (kind, entity));
            }
        }
    }

    /// Resolve cross-references and emit the merged graph.
    pub fn build(mut self) -> BuildOutcome {
        // Stubs must exist before inverse links are mirrored onto them.
        self.resolve_references();
        self.link_inverse();

        let mut graph = KnowledgeGraph::default();
        for (_, (kind, entity)) in std::mem::take(&mut self.entities) {
            graph.collection_mut(kind).push(entity);
        }
        graph.metadata = GraphMetadata {
            version: env!("CARGO_PKG_VERSION").to_string(),
            generated_at: Some(chrono::Utc::now().to_rfc3339()),
            sources: self.sources,
            counts: graph.counts(),
        };

        info!(
            entities = graph.len(),
            merged = self.report.merged,
            stubs = self.report.stubs_created,
            dangling = self.report.dangling.len(),
            "Knowledge graph built"
        );

        BuildOutcome {
            graph,
            report: self.report,
        }
    }

    /// Mirror `method.implemented_in -> tool` as `tool.implements -> method`.
    fn link_inverse(&mut self) {
        let pairs: Vec<(String, String)> = self
            .entities
            .values()
            .filter(|(kind, _)| *kind == EntityKind::Method)
            .map(|(_, e)| e)
            .flat_map(|m| m.implemented_in.iter().map(move |t| (t.clone(), m.id.clone())))
            .collect();

        for (tool_id, method_id) in pairs {
            if let Some((_, tool)) = self.entities.get_mut(&tool_id) {
                if !tool.implements.contains(&method_id) {
                    tool.implements.push(method_id);
                    self.report.inverse_links += 1;
                }
            }
        }
    }

    fn resolve_references(&mut self) {
        let mut missing: Vec<DanglingRef> = Vec::new();
        for (_, entity) in self.entities.values() {
            for (relation, target) in entity.relationships() {
                if !self.entities.contains_key(target) {
                    missing.push(DanglingRef {
                        source: entity.id.clone(),
                        relation,
                        target: target.to_string(),
                    });
                }
            }
        }

        if self.options.create_stubs {
            let stub_ids: BTreeSet<(String, EntityKind)> = missing
                .iter()
                .filter_map(|d| EntityKind::from_id(&d.target).map(|k| (d.target.clone(), k)))
                .collect();
            for (id, kind) in stub_ids {
                let mut stub = Entity::new(id.clone(), display_name(&id));
                stub.extra.insert("stub".to_string(), Value::Bool(true));
                debug!(id = %id, "Created stub entity");
                self.entities.insert(id, (kind, stub));
                self.report.stubs_created += 1;
            }
            missing.retain(|d| !self.entities.contains_key(&d.target));
        }

        for d in &missing {
            warn!(source = %d.source, relation = d.relation.field(), target = %d.target, "Dangling reference");
        }
        self.report.dangling = missing;
    }
}

/// Merge `incoming` into `existing` following `precedence`.
pub fn merge_entity(existing: &mut Entity, incoming: Entity, precedence: Precedence) {
    let overwrite = precedence == Precedence::Expert;

    if !incoming.name.trim().is_empty() && (overwrite || existing.name.trim().is_empty()) {
        existing.name = incoming.name;
    }
    merge_option(&mut existing.description, incoming.description, overwrite);
    merge_option(&mut existing.category, incoming.category, overwrite);
    if incoming.reference_value.is_some() && (overwrite || existing.reference_value.is_none()) {
        existing.reference_value = incoming.reference_value;
    }

    union_into(&mut existing.tags, incoming.tags);
    union_into(&mut existing.implemented_in, incoming.implemented_in);
    union_into(&mut existing.implements, incoming.implements);
    union_into(&mut existing.theoretical_basis, incoming.theoretical_basis);
    union_into(&mut existing.validated_on_benchmarks, incoming.validated_on_benchmarks);
    union_into(&mut existing.related_concepts, incoming.related_concepts);
    union_into(&mut existing.applies_methods, incoming.applies_methods);
    union_into(&mut existing.references, incoming.references);

    for result in incoming.results {
        push_result(&mut existing.results, result);
    }

    merge_extra(&mut existing.extra, incoming.extra, overwrite);
}

/// Append unless a result with the same `(method, value)` is present.
fn push_result(results: &mut Vec<BenchmarkResult>, result: BenchmarkResult) {
    let duplicate = results
        .iter()
        .any(|r| r.method == result.method && r.value.to_bits() == result.value.to_bits());
    if !duplicate {
        results.push(result);
    }
}

fn merge_option(existing: &mut Option<String>, incoming: Option<String>, overwrite: bool) {
    let Some(value) = incoming.filter(|v| !v.trim().is_empty()) else {
        return;
    };
    let missing = existing.as_ref().map_or(true, |v| v.trim().is_empty());
    if overwrite || missing {
        *existing = Some(value);
    }
}

fn merge_extra(existing: &mut Map<String, Value>, incoming: Map<String, Value>, overwrite: bool) {
    for (key, value) in incoming {
        if is_empty_value(&value) {
            continue;
        }
        let missing = existing.get(&key).map_or(true, is_empty_value);
        if overwrite || missing {
            existing.insert(key, value);
        }
    }
}

fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
        _ => false,
    }
}

fn union_into(target: &mut Vec<String>, incoming: Vec<String>) {
    for item in incoming {
        if !target.contains(&item) {
            target.push(item);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn method(id: &str) -> Entity {
        Entity::new(id, "")
    }

    #[test]
    fn test_harvested_fills_gaps_only() {
        let mut a = Entity::new("method.dft", "DFT");
        a.description = Some("".to_string());
        let mut b = Entity::new("method.dft", "Density Functional Theory");
        b.description = Some("Kohn-Sham".to_string());
        b.category = Some("ab initio".to_string());

        let mut builder = GraphBuilder::new(BuildOptions::default());
        builder
            .add_source("a", vec![a], Precedence::Harvested)
            .add_source("b", vec![b], Precedence::Harvested);
        let outcome = builder.build();

        let dft = outcome.graph.get("method.dft").unwrap();
        assert_eq!(dft.name, "DFT");
        assert_eq!(dft.description.as_deref(), Some("Kohn-Sham"));
        assert_eq!(dft.category.as_deref(), Some("ab initio"));
        assert_eq!(outcome.report.merged, 1);
        assert_eq!(outcome.graph.metadata.sources, vec!["a", "b"]);
    }

    #[test]
    fn test_expert_overrides() {
        let mut harvested = Entity::new("method.dft", "dft");
        harvested.extra.insert("year".into(), Value::from(1965));
        let mut expert = Entity::new("method.dft", "Density Functional Theory");
        expert.extra.insert("year".into(), Value::from(1964));
        expert.extra.insert("notes".into(), Value::Null);

        let mut builder = GraphBuilder::new(BuildOptions::default());
        builder
            .add_source("harvest", vec![harvested], Precedence::Harvested)
            .add_source("expert", vec![expert], Precedence::Expert);
        let graph = builder.build().graph;

        let dft = graph.get("method.dft").unwrap();
        assert_eq!(dft.name, "Density Functional Theory");
        assert_eq!(dft.extra["year"], 1964);
        assert!(!dft.extra.contains_key("notes"));
    }

    #[test]
    fn test_links_union_and_normalized() {
        let mut a = method("method.dft");
        a.implemented_in = vec!["tool.pyscf".into(), "Tool.PySCF".into()];
        let mut b = method("  method.DFT ");
        b.implemented_in = vec!["tool.orca".into(), "tool.pyscf".into()];

        let mut builder = GraphBuilder::new(BuildOptions::default());
        builder.add_source("s", vec![a, b], Precedence::Harvested);
        let graph = builder.build().graph;

        assert_eq!(graph.methods.len(), 1);
        assert_eq!(graph.methods[0].implemented_in, vec!["tool.pyscf", "tool.orca"]);
    }

    #[test]
    fn test_inverse_links_and_dangling() {
        let mut dft = method("method.dft");
        dft.implemented_in = vec!["tool.pyscf".into(), "tool.missing".into()];
        dft.theoretical_basis = vec!["concept.hohenberg_kohn".into()];
        let tool = Entity::new("tool.pyscf", "PySCF");

        let mut builder = GraphBuilder::new(BuildOptions::default());
        builder.add_source("s", vec![dft, tool], Precedence::Harvested);
        let outcome = builder.build();

        assert_eq!(outcome.graph.get("tool.pyscf").unwrap().implements, vec!["method.dft"]);
        assert_eq!(outcome.report.inverse_links, 1);
        let targets: Vec<&str> = outcome.report.dangling.iter().map(|d| d.target.as_str()).collect();
        assert_eq!(targets, vec!["tool.missing", "concept.hohenberg_kohn"]);
    }

    #[test]
    fn test_stubs_for_known_prefixes() {
        let mut dft = method("method.dft");
        dft.theoretical_basis = vec!["concept.hohenberg_kohn".into()];
        dft.references = vec!["doi:10.1103/physrev.136.b864".into()];

        let mut builder = GraphBuilder::new(BuildOptions { create_stubs: true });
        builder.add_source("s", vec![dft], Precedence::Harvested);
        let outcome = builder.build();

        let stub = outcome.graph.get("concept.hohenberg_kohn").unwrap();
        assert!(stub.is_stub());
        assert_eq!(stub.name, "hohenberg kohn");
        assert_eq!(outcome.report.stubs_created, 1);
        assert_eq!(outcome.report.dangling.len(), 1);
        assert_eq!(outcome.report.dangling[0].relation, Relation::References);
    }

    #[test]
    fn test_unknown_prefix_skipped_and_sorted_output() {
        let entities = vec![
            Entity::new("tool.zz", "ZZ"),
            Entity::new("tool.aa", "AA"),
            Entity::new("widget.x", "X"),
        ];
        let mut builder = GraphBuilder::new(BuildOptions::default());
        builder.add_source("s", entities, Precedence::Harvested);
        let outcome = builder.build();

        assert_eq!(outcome.report.skipped, 1);
        let ids: Vec<&str> = outcome.graph.tools.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["tool.aa", "tool.zz"]);
        assert_eq!(outcome.graph.metadata.counts["tools"], 2);
    }

    #[test]
    fn test_results_deduplicated() {
        let result = BenchmarkResult { method: "method.dft".into(), value: 1.5, reference: None, unit: None };
        let mut a = Entity::new("benchmark.g2", "G2");
        a.results = vec![result.clone()];
        let mut b = Entity::new("benchmark.g2", "G2");
        b.results = vec![result, BenchmarkResult { method: "method.hf".into(), value: 3.0, reference: None, unit: None }];

        let mut builder = GraphBuilder::new(BuildOptions::default());
        builder.add_source("s", vec![a, b], Precedence::Harvested);
        let graph = builder.build().graph;
        assert_eq!(graph.benchmarks[0].results.len(), 2);
    }

    #[test]
    fn test_rebuild_with_stubs_is_stable() {
        let mut dft = method("method.dft");
        dft.implemented_in = vec!["tool.missing".into()];

        let mut first = GraphBuilder::new(BuildOptions { create_stubs: true });
        first.add_source("s", vec![dft.clone()], Precedence::Harvested);
        let first = first.build().graph;
        assert_eq!(first.get("tool.missing").unwrap().implements, vec!["method.dft"]);

        let mut second = GraphBuilder::new(BuildOptions { create_stubs: true });
        second
            .add_graph("kg", first.clone(), Precedence::Harvested)
            .add_source("s", vec![dft], Precedence::Harvested);
        let second = second.build().graph;

        assert_eq!(second.tools, first.tools);
        assert_eq!(second.methods, first.methods);
    }

    #[test]
    fn test_result_methods_normalized() {
        let mut g2 = Entity::new("benchmark.g2", "G2");
        g2.results = vec![
            BenchmarkResult { method: "Method.DFT".into(), value: 2.0, reference: None, unit: None },
            BenchmarkResult { method: " method.dft".into(), value: 2.0, reference: None, unit: None },
        ];
        let mut builder = GraphBuilder::new(BuildOptions::default());
        builder.add_source("s", vec![g2, method("method.dft")], Precedence::Harvested);
        let graph = builder.build().graph;

        let results = &graph.benchmarks[0].results;
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].method, "method.dft");
    }
}
