use serde::{Deserialize, Serialize};

use docai_core::error::{Error, Result};

/// Cosine similarity in `[-1, 1]`. A zero vector is similar to nothing.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let (mut dot, mut na, mut nb) = (0.0f32, 0.0f32, 0.0f32);
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        na += x * x;
        nb += y * y;
    }
    if na == 0.0 || nb == 0.0 {
        return 0.0;
    }
    (dot / (na.sqrt() * nb.sqrt())).clamp(-1.0, 1.0)
}

/// Vectors addressed by ordinal, one per chunk, all of length `dim`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DenseIndex {
    dim: usize,
    vectors: Vec<Vec<f32>>,
}

impl DenseIndex {
    pub fn new(dim: usize) -> Self {
        Self { dim, vectors: Vec::new() }
    }

    pub fn from_vectors(dim: usize, vectors: Vec<Vec<f32>>) -> Result<Self> {
        let mut index = Self::new(dim);
        index.vectors.reserve(vectors.len());
        for v in vectors {
            index.push(v)?;
        }
        Ok(index)
    }

    pub fn push(&mut self, vector: Vec<f32>) -> Result<()> {
        check_vector(self.dim, &vector)?;
        self.vectors.push(vector);
        Ok(())
    }

    pub fn dim(&self) -> usize { self.dim }
    pub fn len(&self) -> usize { self.vectors.len() }
    pub fn is_empty(&self) -> bool { self.vectors.is_empty() }

    pub fn vector(&self, ordinal: usize) -> Option<&[f32]> {
        self.vectors.get(ordinal).map(Vec::as_slice)
    }

    /// The `k` most similar vectors as `(ordinal, similarity)`, best first.
    /// Equal similarities keep insertion order.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<(usize, f32)>> {
        check_vector(self.dim, query)?;
        if k == 0 {
            return Ok(vec![]);
        }
        let mut scored: Vec<(usize, f32)> =
            self.vectors.iter().enumerate().map(|(i, v)| (i, cosine_similarity(query, v))).collect();
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));
        scored.truncate(k);
        Ok(scored)
    }

    pub fn validate(&self) -> Result<()> {
        for (i, v) in self.vectors.iter().enumerate() {
            check_vector(self.dim, v).map_err(|e| Error::Persistence(format!("vector {i}: {e}")))?;
        }
        Ok(())
    }
}

fn check_vector(dim: usize, v: &[f32]) -> Result<()> {
    if v.len() != dim {
        return Err(Error::EmbeddingFailure(format!("vector has dimension {}, expected {}", v.len(), dim)));
    }
    if v.iter().any(|x| !x.is_finite()) {
        return Err(Error::EmbeddingFailure("vector contains non-finite values".into()));
    }
    Ok(())
}
