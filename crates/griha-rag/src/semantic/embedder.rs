//! Embedding seam for the knowledge base.
//!
//! The engine treats "given text, return a vector" as a black-box
//! capability behind [`EmbeddingModel`]. The default implementation is a
//! deterministic feature-hashed bag-of-tokens embedder: no network, no model
//! files, byte-for-byte reproducible across runs. A real model plugs in
//! behind the same trait.

use crate::error::Result;

pub trait EmbeddingModel: Send + Sync {
    fn embed_query(&self, text: &str) -> Result<Vec<f32>>;

    fn embed_documents(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        texts.iter().map(|t| self.embed_query(t)).collect()
    }

    fn dimension(&self) -> usize;
}

/// Feature-hashing embedder: each token hashes to a bucket with a signed
/// contribution, then the vector is L2-normalized so cosine similarity is a
/// plain dot product of unit vectors.
pub struct HashEmbedder {
    dimension: usize,
}

impl HashEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self { dimension }
    }
}

impl EmbeddingModel for HashEmbedder {
    fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        let mut vector = vec![0.0f32; self.dimension];

        for token in tokenize(text) {
            let hash = fnv1a(token.as_bytes());
            let bucket = (hash % self.dimension as u64) as usize;
            // One hash bit decides the sign, which keeps colliding tokens
            // from systematically inflating the same bucket.
            let sign = if (hash >> 63) & 1 == 0 { 1.0 } else { -1.0 };
            vector[bucket] += sign;
        }

        let norm: f32 = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in &mut vector {
                *v /= norm;
            }
        }
        Ok(vector)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

fn tokenize(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| t.len() > 1)
        .map(|t| t.to_lowercase())
}

/// FNV-1a, stable across processes (std's default hasher is not guaranteed
/// to be).
fn fnv1a(bytes: &[u8]) -> u64 {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for byte in bytes {
        hash ^= u64::from(*byte);
        hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
    }
    hash
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedding_is_deterministic() {
        let embedder = HashEmbedder::new(64);
        let a = embedder.embed_query("rental yield in Garia").unwrap();
        let b = embedder.embed_query("rental yield in Garia").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_embedding_is_unit_length() {
        let embedder = HashEmbedder::new(64);
        let v = embedder.embed_query("wealth difference over twenty years").unwrap();
        let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_similar_texts_score_higher_than_unrelated() {
        let embedder = HashEmbedder::new(256);
        let a = embedder.embed_query("tax regime and total tax paid").unwrap();
        let b = embedder.embed_query("which tax regime minimizes total tax").unwrap();
        let c = embedder.embed_query("swimming pool maintenance schedule").unwrap();
        let dot = |x: &[f32], y: &[f32]| -> f32 { x.iter().zip(y).map(|(p, q)| p * q).sum() };
        assert!(dot(&a, &b) > dot(&a, &c));
    }

    #[test]
    fn test_embed_documents_matches_per_query_embedding() {
        let embedder = HashEmbedder::new(32);
        let batch = embedder.embed_documents(&["garia flats", "salt lake flats"]).unwrap();
        assert_eq!(batch.len(), 2);
        assert_eq!(batch[0], embedder.embed_query("garia flats").unwrap());
    }

    #[test]
    fn test_empty_text_embeds_to_zero_vector() {
        let embedder = HashEmbedder::new(16);
        let v = embedder.embed_query("").unwrap();
        assert!(v.iter().all(|x| *x == 0.0));
    }
}
