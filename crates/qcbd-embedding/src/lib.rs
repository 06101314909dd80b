//! # QCBD Embedding
//!
//! Deterministic hash embeddings, an SQLite-backed embedding cache and
//! cosine-similarity search over the cached vectors.

pub mod cache;
pub mod hash;
pub mod search;

pub use cache::{EmbeddingCache, RefreshStats};
pub use hash::{blob_to_vec, cosine_similarity, entity_text, vec_to_blob, HashEmbedder};
pub use search::{SemanticSearch, SemanticSearchResult};
