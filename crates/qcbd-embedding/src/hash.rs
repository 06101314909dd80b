//! Feature-hashing embedder.
//!
//! Tokens and adjacent-token bigrams are hashed with SHA-256 into a fixed
//! number of buckets with a ±1 sign, then the vector is L2-normalized.
//! Output depends only on the text and the dimension count.

use sha2::{Digest, Sha256};

use qcbd_core::Entity;

const BIGRAM_WEIGHT: f32 = 0.5;

/// Hash embedder with a fixed dimensionality.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HashEmbedder {
    dims: usize,
}

impl Default for HashEmbedder {
    fn default() -> Self {
        Self { dims: 256 }
    }
}

impl HashEmbedder {
    /// `dims` of zero is bumped to one.
    pub fn new(dims: usize) -> Self {
        Self { dims: dims.max(1) }
    }

    pub fn dims(&self) -> usize {
        self.dims
    }

    /// Model identifier stored next to cached vectors.
    pub fn model_name(&self) -> String {
        format!("hash-sha256-{}", self.dims)
    }

    /// Embed a text. Text without tokens gives the zero vector.
    pub fn embed(&self, text: &str) -> Vec<f32> {
        let tokens = tokenize(text);
        let mut vector = vec![0.0f32; self.dims];

        for token in &tokens {
            self.add_feature(&mut vector, &format!("t:{}", token), 1.0);
        }
        for pair in tokens.windows(2) {
            self.add_feature(&mut vector, &format!("b:{} {}", pair[0], pair[1]), BIGRAM_WEIGHT);
        }

        let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in &mut vector {
                *v /= norm;
            }
        }
        vector
    }

    fn add_feature(&self, vector: &mut [f32], feature: &str, weight: f32) {
        let digest = Sha256::digest(feature.as_bytes());
        let mut bucket_bytes = [0u8; 8];
        bucket_bytes.copy_from_slice(&digest[..8]);
        let bucket = (u64::from_le_bytes(bucket_bytes) % self.dims as u64) as usize;
        let sign = if digest[8] & 1 == 0 { 1.0 } else { -1.0 };
        vector[bucket] += sign * weight;
    }
}

fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// Text an entity is embedded from: name, description, category and tags.
pub fn entity_text(entity: &Entity) -> String {
    let mut parts: Vec<&str> = vec![entity.name.as_str()];
    parts.extend(entity.description.as_deref());
    parts.extend(entity.category.as_deref());
    parts.extend(entity.tags.iter().map(String::as_str));
    parts.retain(|p| !p.trim().is_empty());
    parts.join(" ")
}

/// Encode a float vector as little-endian bytes for BLOB storage.
pub fn vec_to_blob(vec: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(vec.len() * 4);
    for &v in vec {
        bytes.extend_from_slice(&v.to_le_bytes());
    }
    bytes
}

/// Decode a BLOB written by [`vec_to_blob`].
pub fn blob_to_vec(blob: &[u8]) -> Vec<f32> {
    blob.chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}

/// Cosine similarity in `[-1, 1]`; 0 for mismatched lengths or zero vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom == 0.0 {
        0.0
    } else {
        dot / denom
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deterministic_and_normalized() {
        let embedder = HashEmbedder::new(64);
        let a = embedder.embed("Coupled cluster singles and doubles");
        let b = embedder.embed("coupled CLUSTER singles, and doubles!");
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        let norm: f32 = a.iter().map(|v| v * v).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_empty_text_is_zero() {
        let v = HashEmbedder::default().embed("  ,;  ");
        assert!(v.iter().all(|x| *x == 0.0));
        assert_eq!(cosine_similarity(&v, &v), 0.0);
    }

    #[test]
    fn test_similar_texts_score_higher() {
        let embedder = HashEmbedder::new(256);
        let query = embedder.embed("density functional theory");
        let close = embedder.embed("Density functional theory for solids");
        let far = embedder.embed("quantum monte carlo sampling");
        assert!(cosine_similarity(&query, &close) > cosine_similarity(&query, &far));
    }

    #[test]
    fn test_blob_roundtrip() {
        let v = vec![0.25f32, -1.5, 3.0];
        assert_eq!(blob_to_vec(&vec_to_blob(&v)), v);
    }

    #[test]
    fn test_entity_text() {
        let mut e = Entity::new("method.dft", "DFT");
        e.category = Some("ab initio".into());
        e.tags = vec!["electronic".into(), "".into()];
        assert_eq!(entity_text(&e), "DFT ab initio electronic");
        assert_eq!(HashEmbedder::new(0).dims(), 1);
    }
}
