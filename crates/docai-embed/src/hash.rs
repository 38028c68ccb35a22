use anyhow::Result;
use std::hash::{Hash, Hasher};
use twox_hash::XxHash64;

use docai_core::traits::Embedder;

/// Deterministic bag-of-words embedder: each lower-cased word is hashed into
/// one of `dim` buckets and the result is L2-normalized. Shared words give
/// positive cosine similarity, which is enough for offline runs and tests.
pub struct HashEmbedder {
    id: String,
    dim: usize,
    max_len: usize,
}

impl HashEmbedder {
    pub fn new(dim: usize, max_len: usize) -> Self {
        let dim = dim.max(1);
        Self { id: format!("hash:d{dim}"), dim, max_len }
    }

    fn embed_one(&self, text: &str) -> Vec<f32> {
        let mut v = vec![0f32; self.dim];
        let words = text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
            .take(self.max_len);
        for (i, word) in words.enumerate() {
            let mut hasher = XxHash64::with_seed(0);
            word.to_lowercase().hash(&mut hasher);
            let h = hasher.finish();
            let idx = (h as usize) % self.dim;
            let val = ((h >> 32) as u32) as f32 / u32::MAX as f32;
            v[idx] += 0.5 + val + (i % 3) as f32 * 0.01;
        }
        let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt().max(1e-6);
        for x in &mut v { *x /= norm; }
        v
    }
}

impl Embedder for HashEmbedder {
    fn embedder_id(&self) -> &str { &self.id }
    fn dim(&self) -> usize { self.dim }
    fn max_len(&self) -> usize { self.max_len }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.embed_one(t)).collect())
    }
}
