//! QCBD Core Library
//!
//! Knowledge-graph model and the batch logic around it: loading harvested
//! records, merging them into one graph, validating cross-references and
//! computing benchmark statistics.

pub mod builder;
pub mod config;
pub mod error;
pub mod ids;
pub mod loader;
pub mod model;
pub mod stats;
pub mod validate;

pub use error::{QcbdError, QcbdResult};
pub use model::{BenchmarkResult, Entity, EntityKind, GraphMetadata, KnowledgeGraph, Relation};
