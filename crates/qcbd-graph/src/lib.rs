//! # QCBD Graph
//!
//! Neo4j Knowledge Graph integration for QCBD.
//!
//! Mirrors the merged knowledge graph into Neo4j as labelled nodes and
//! typed relationships, and offers Cypher passthrough, fulltext search and
//! neighbourhood queries.

pub mod client;
pub mod queries;
pub mod schema;
pub mod sync;

pub use client::{GraphClient, GraphConfig, GraphCounts};
pub use sync::{plan_sync, run_sync, ParamValue, Statement, StatementSink, SyncResult};
