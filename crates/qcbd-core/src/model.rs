//! Knowledge-graph model types.
//!
//! Entities are flat JSON objects keyed by prefixed string IDs. Only the
//! fields the pipeline reasons about are typed; everything else a harvester
//! wrote is carried along untouched in [`Entity::extra`].

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{QcbdError, QcbdResult};

/// Kind of knowledge-graph entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Method,
    Concept,
    Tool,
    Benchmark,
    UseCase,
    Source,
}

impl EntityKind {
    pub const ALL: [EntityKind; 6] = [
        Self::Method,
        Self::Concept,
        Self::Tool,
        Self::Benchmark,
        Self::UseCase,
        Self::Source,
    ];

    /// ID namespace prefix, including the trailing dot.
    pub fn prefix(&self) -> &'static str {
        match self {
            Self::Method => "method.",
            Self::Concept => "concept.",
            Self::Tool => "tool.",
            Self::Benchmark => "benchmark.",
            Self::UseCase => "usecase.",
            Self::Source => "src.",
        }
    }

    /// Key of this kind's collection in the knowledge-graph document.
    pub fn collection(&self) -> &'static str {
        match self {
            Self::Method => "methods",
            Self::Concept => "concepts",
            Self::Tool => "tools",
            Self::Benchmark => "benchmarks",
            Self::UseCase => "use_cases",
            Self::Source => "sources",
        }
    }

    /// Neo4j node label.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Method => "Method",
            Self::Concept => "Concept",
            Self::Tool => "Tool",
            Self::Benchmark => "Benchmark",
            Self::UseCase => "UseCase",
            Self::Source => "Source",
        }
    }

    /// Convert to string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Method => "method",
            Self::Concept => "concept",
            Self::Tool => "tool",
            Self::Benchmark => "benchmark",
            Self::UseCase => "usecase",
            Self::Source => "source",
        }
    }

    /// Parse from a loose type name (`method`, `methods`, `use_case`, `src`, ...).
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().replace(['-', ' '], "_").as_str() {
            "method" | "methods" => Some(Self::Method),
            "concept" | "concepts" => Some(Self::Concept),
            "tool" | "tools" | "software" => Some(Self::Tool),
            "benchmark" | "benchmarks" => Some(Self::Benchmark),
            "usecase" | "use_case" | "usecases" | "use_cases" => Some(Self::UseCase),
            "source" | "sources" | "src" => Some(Self::Source),
            _ => None,
        }
    }

    /// Infer the kind from an ID's namespace prefix.
    pub fn from_id(id: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| id.starts_with(k.prefix()))
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for EntityKind {
    type Err = QcbdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| QcbdError::UnknownKind(s.to_string()))
    }
}

/// A cross-reference field on an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Relation {
    ImplementedIn,
    Implements,
    TheoreticalBasis,
    ValidatedOnBenchmarks,
    RelatedConcepts,
    AppliesMethods,
    References,
}

impl Relation {
    pub const ALL: [Relation; 7] = [
        Self::ImplementedIn,
        Self::Implements,
        Self::TheoreticalBasis,
        Self::ValidatedOnBenchmarks,
        Self::RelatedConcepts,
        Self::AppliesMethods,
        Self::References,
    ];

    /// JSON field name.
    pub fn field(&self) -> &'static str {
        match self {
            Self::ImplementedIn => "implemented_in",
            Self::Implements => "implements",
            Self::TheoreticalBasis => "theoretical_basis",
            Self::ValidatedOnBenchmarks => "validated_on_benchmarks",
            Self::RelatedConcepts => "related_concepts",
            Self::AppliesMethods => "applies_methods",
            Self::References => "references",
        }
    }

    /// Relationship type used in the SQLite and Neo4j stores.
    pub fn edge_type(&self) -> &'static str {
        match self {
            Self::ImplementedIn => "IMPLEMENTED_IN",
            Self::Implements => "IMPLEMENTS",
            Self::TheoreticalBasis => "BASED_ON",
            Self::ValidatedOnBenchmarks => "VALIDATED_ON",
            Self::RelatedConcepts => "RELATED_TO",
            Self::AppliesMethods => "APPLIES",
            Self::References => "CITES",
        }
    }

    /// Kind every target of this relation is expected to have.
    pub fn target_kind(&self) -> EntityKind {
        match self {
            Self::ImplementedIn => EntityKind::Tool,
            Self::Implements => EntityKind::Method,
            Self::TheoreticalBasis | Self::RelatedConcepts => EntityKind::Concept,
            Self::ValidatedOnBenchmarks => EntityKind::Benchmark,
            Self::AppliesMethods => EntityKind::Method,
            Self::References => EntityKind::Source,
        }
    }

    /// Derived relations mirror another relation and are not stored as edges.
    pub fn is_derived(&self) -> bool {
        matches!(self, Self::Implements)
    }
}

/// One method's result on a benchmark.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkResult {
    pub method: String,
    pub value: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
}

/// A knowledge-graph entity.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub implemented_in: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub implements: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub theoretical_basis: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub validated_on_benchmarks: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub related_concepts: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub applies_methods: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub references: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub results: Vec<BenchmarkResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference_value: Option<f64>,

    /// Untyped fields, preserved as-is.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Entity {
    /// Create an entity with just an ID and a name.
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            ..Default::default()
        }
    }

    /// Kind implied by the ID prefix.
    pub fn kind(&self) -> Option<EntityKind> {
        EntityKind::from_id(&self.id)
    }

    pub fn links(&self, relation: Relation) -> &[String] {
        match relation {
            Relation::ImplementedIn => &self.implemented_in,
            Relation::Implements => &self.implements,
            Relation::TheoreticalBasis => &self.theoretical_basis,
            Relation::ValidatedOnBenchmarks => &self.validated_on_benchmarks,
            Relation::RelatedConcepts => &self.related_concepts,
            Relation::AppliesMethods => &self.applies_methods,
            Relation::References => &self.references,
        }
    }

    pub fn links_mut(&mut self, relation: Relation) -> &mut Vec<String> {
        match relation {
            Relation::ImplementedIn => &mut self.implemented_in,
            Relation::Implements => &mut self.implements,
            Relation::TheoreticalBasis => &mut self.theoretical_basis,
            Relation::ValidatedOnBenchmarks => &mut self.validated_on_benchmarks,
            Relation::RelatedConcepts => &mut self.related_concepts,
            Relation::AppliesMethods => &mut self.applies_methods,
            Relation::References => &mut self.references,
        }
    }

    /// All outgoing `(relation, target_id)` pairs.
    pub fn relationships(&self) -> impl Iterator<Item = (Relation, &str)> + '_ {
        Relation::ALL
            .into_iter()
            .flat_map(move |rel| self.links(rel).iter().map(move |t| (rel, t.as_str())))
    }

    /// Whether this entity was created as a placeholder for a dangling reference.
    pub fn is_stub(&self) -> bool {
        self.extra.get("stub").and_then(Value::as_bool).unwrap_or(false)
    }
}

/// Document-level metadata of the knowledge graph.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphMetadata {
    #[serde(default)]
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generated_at: Option<String>,
    #[serde(default)]
    pub sources: Vec<String>,
    #[serde(default)]
    pub counts: BTreeMap<String, usize>,
}

/// The merged knowledge-graph document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeGraph {
    #[serde(default)]
    pub metadata: GraphMetadata,
    #[serde(default)]
    pub methods: Vec<Entity>,
    #[serde(default)]
    pub concepts: Vec<Entity>,
    #[serde(default)]
    pub tools: Vec<Entity>,
    #[serde(default)]
    pub benchmarks: Vec<Entity>,
    #[serde(default)]
    pub use_cases: Vec<Entity>,
    #[serde(default)]
    pub sources: Vec<Entity>,
}

impl KnowledgeGraph {
    pub fn collection(&self, kind: EntityKind) -> &[Entity] {
        match kind {
            EntityKind::Method => &self.methods,
            EntityKind::Concept => &self.concepts,
            EntityKind::Tool => &self.tools,
            EntityKind::Benchmark => &self.benchmarks,
            EntityKind::UseCase => &self.use_cases,
            EntityKind::Source => &self.sources,
        }
    }

    pub fn collection_mut(&mut self, kind: EntityKind) -> &mut Vec<Entity> {
        match kind {
            EntityKind::Method => &mut self.methods,
            EntityKind::Concept => &mut self.concepts,
            EntityKind::Tool => &mut self.tools,
            EntityKind::Benchmark => &mut self.benchmarks,
            EntityKind::UseCase => &mut self.use_cases,
            EntityKind::Source => &mut self.sources,
        }
    }

    /// Iterate all entities together with the collection they live in.
    pub fn entities(&self) -> impl Iterator<Item = (EntityKind, &Entity)> + '_ {
        EntityKind::ALL
            .into_iter()
            .flat_map(move |kind| self.collection(kind).iter().map(move |e| (kind, e)))
    }

    /// Find an entity by ID in any collection.
    pub fn get(&self, id: &str) -> Option<&Entity> {
        self.entities().map(|(_, e)| e).find(|e| e.id == id)
    }

    /// Collection holding `id`, which may differ from what its prefix says.
    pub fn kind_of(&self, id: &str) -> Option<EntityKind> {
        self.entities().find(|(_, e)| e.id == id).map(|(kind, _)| kind)
    }

    /// Lookup table from ID to the collection holding it (first occurrence wins).
    pub fn index(&self) -> HashMap<&str, EntityKind> {
        let mut index = HashMap::with_capacity(self.len());
        for (kind, entity) in self.entities() {
            index.entry(entity.id.as_str()).or_insert(kind);
        }
        index
    }

    /// Insert an entity into the collection its ID prefix selects.
    pub fn insert(&mut self, entity: Entity) -> QcbdResult<EntityKind> {
        let kind = entity
            .kind()
            .ok_or_else(|| QcbdError::InvalidId(entity.id.clone()))?;
        self.collection_mut(kind).push(entity);
        Ok(kind)
    }

    pub fn len(&self) -> usize {
        EntityKind::ALL.iter().map(|k| self.collection(*k).len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Entity count per collection key.
    pub fn counts(&self) -> BTreeMap<String, usize> {
        EntityKind::ALL
            .iter()
            .map(|k| (k.collection().to_string(), self.collection(*k).len()))
            .collect()
    }

    /// Drain every entity out of the graph.
    pub fn into_entities(self) -> Vec<Entity> {
        let mut all = Vec::with_capacity(self.len());
        all.extend(self.methods);
        all.extend(self.concepts);
        all.extend(self.tools);
        all.extend(self.benchmarks);
        all.extend(self.use_cases);
        all.extend(self.sources);
        all
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_from_id() {
        assert_eq!(EntityKind::from_id("method.ccsd_t"), Some(EntityKind::Method));
        assert_eq!(EntityKind::from_id("src.arxiv_2101_00001"), Some(EntityKind::Source));
        assert_eq!(EntityKind::from_id("usecase.catalysis"), Some(EntityKind::UseCase));
        assert_eq!(EntityKind::from_id("ccsd_t"), None);
    }

    #[test]
    fn test_kind_parse_aliases() {
        assert_eq!(EntityKind::parse("Use-Case"), Some(EntityKind::UseCase));
        assert_eq!(EntityKind::parse("methods"), Some(EntityKind::Method));
        assert_eq!(EntityKind::parse("src"), Some(EntityKind::Source));
        assert!("widget".parse::<EntityKind>().is_err());
    }

    #[test]
    fn test_entity_preserves_unknown_fields() {
        let json = r#"{"id":"method.dft","name":"DFT","year":1964,"implemented_in":["tool.pyscf"]}"#;
        let entity: Entity = serde_json::from_str(json).unwrap();
        assert_eq!(entity.implemented_in, vec!["tool.pyscf"]);
        assert_eq!(entity.extra.get("year"), Some(&Value::from(1964)));

        let back = serde_json::to_value(&entity).unwrap();
        assert_eq!(back["year"], 1964);
        assert!(back.get("theoretical_basis").is_none());
    }

    #[test]
    fn test_relationships_iter() {
        let mut entity = Entity::new("method.dft", "DFT");
        entity.implemented_in = vec!["tool.pyscf".into()];
        entity.theoretical_basis = vec!["concept.hohenberg_kohn".into()];
        let rels: Vec<_> = entity.relationships().collect();
        assert_eq!(
            rels,
            vec![
                (Relation::ImplementedIn, "tool.pyscf"),
                (Relation::TheoreticalBasis, "concept.hohenberg_kohn"),
            ]
        );
    }

    #[test]
    fn test_graph_insert_and_get() {
        let mut graph = KnowledgeGraph::default();
        assert_eq!(graph.insert(Entity::new("tool.pyscf", "PySCF")).unwrap(), EntityKind::Tool);
        assert!(graph.insert(Entity::new("pyscf", "PySCF")).is_err());
        assert_eq!(graph.len(), 1);
        assert_eq!(graph.get("tool.pyscf").unwrap().name, "PySCF");
        assert_eq!(graph.counts()["tools"], 1);
        assert_eq!(graph.counts()["methods"], 0);

        // Misfiled entity: the collection wins over the prefix.
        graph.concepts.push(Entity::new("method.misfiled", "Misfiled"));
        assert_eq!(graph.kind_of("method.misfiled"), Some(EntityKind::Concept));
        assert_eq!(graph.kind_of("tool.none"), None);
    }
}
