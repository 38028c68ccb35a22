//! Immutable dual index over one chunk set.
//!
//! Ordinal `i` addresses the same chunk in `chunks`, the dense vectors and
//! the sparse postings. A snapshot is never mutated after construction; a
//! rebuild produces a new one.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use docai_core::error::{Error, Result};
use docai_core::types::{Chunk, ChunkId, SearchHit, SourceKind};
use docai_text::SparseIndex;
use docai_vector::DenseIndex;

/// Bumped whenever the persisted layout changes.
pub const FORMAT_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexSnapshot {
    version: u32,
    embedder_id: String,
    chunks: Vec<Chunk>,
    dense: DenseIndex,
    sparse: SparseIndex,
    #[serde(skip)]
    by_id: HashMap<ChunkId, usize>,
}

/// One chunk with its dense vector.
#[derive(Debug, Clone, Copy)]
pub struct IndexEntry<'a> {
    pub chunk: &'a Chunk,
    pub vector: &'a [f32],
}

impl IndexSnapshot {
    /// Assemble a snapshot from chunks and their vectors (same order).
    pub fn build(embedder_id: impl Into<String>, dim: usize, chunks: Vec<Chunk>, vectors: Vec<Vec<f32>>) -> Result<Self> {
        if chunks.len() != vectors.len() {
            return Err(Error::EmbeddingFailure(format!("got {} vectors for {} chunks", vectors.len(), chunks.len())));
        }
        let dense = DenseIndex::from_vectors(dim, vectors)?;
        let sparse = SparseIndex::build(chunks.iter().map(|c| c.text.as_str()));
        let mut snapshot = Self { version: FORMAT_VERSION, embedder_id: embedder_id.into(), chunks, dense, sparse, by_id: HashMap::new() };
        snapshot.index_ids()?;
        Ok(snapshot)
    }

    pub fn empty(embedder_id: impl Into<String>, dim: usize) -> Self {
        Self {
            version: FORMAT_VERSION,
            embedder_id: embedder_id.into(),
            chunks: vec![],
            dense: DenseIndex::new(dim),
            sparse: SparseIndex::default(),
            by_id: HashMap::new(),
        }
    }

    fn index_ids(&mut self) -> Result<()> {
        self.by_id.clear();
        for (i, c) in self.chunks.iter().enumerate() {
            if self.by_id.insert(c.id.clone(), i).is_some() {
                return Err(Error::InvalidParameter(format!("duplicate chunk id '{}'", c.id)));
            }
        }
        Ok(())
    }

    pub fn embedder_id(&self) -> &str { &self.embedder_id }
    pub fn dim(&self) -> usize { self.dense.dim() }
    pub fn len(&self) -> usize { self.chunks.len() }
    pub fn is_empty(&self) -> bool { self.chunks.is_empty() }
    pub fn chunks(&self) -> &[Chunk] { &self.chunks }
    pub fn sparse(&self) -> &SparseIndex { &self.sparse }

    pub fn chunk(&self, id: &str) -> Option<&Chunk> {
        self.by_id.get(id).map(|&i| &self.chunks[i])
    }

    pub fn document_count(&self) -> usize {
        let mut docs: Vec<&str> = self.chunks.iter().map(|c| c.doc_id.as_str()).collect();
        docs.sort_unstable();
        docs.dedup();
        docs.len()
    }

    pub fn entries(&self) -> impl Iterator<Item = IndexEntry<'_>> {
        self.chunks
            .iter()
            .enumerate()
            .filter_map(|(i, chunk)| self.dense.vector(i).map(|vector| IndexEntry { chunk, vector }))
    }

    /// `(text, vector)` pairs for seeding an embedding cache.
    pub fn cached_pairs(&self) -> impl Iterator<Item = (&str, &[f32])> {
        self.entries().map(|e| (e.chunk.text.as_str(), e.vector))
    }

    /// Top `k` chunks by cosine similarity; ties keep insertion order.
    pub fn search_dense(&self, query_vector: &[f32], k: usize) -> Result<Vec<SearchHit>> {
        Ok(self
            .dense
            .search(query_vector, k)?
            .into_iter()
            .map(|(i, score)| SearchHit { id: self.chunks[i].id.clone(), score, source: SourceKind::Dense })
            .collect())
    }

    /// Top `k` chunks by BM25; ties keep insertion order.
    pub fn search_sparse(&self, query: &str, k: usize) -> Vec<SearchHit> {
        self.sparse
            .search(query, k)
            .into_iter()
            .map(|(i, score)| SearchHit { id: self.chunks[i].id.clone(), score, source: SourceKind::Sparse })
            .collect()
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(self).map_err(Error::persistence)
    }

    /// Parse and validate a persisted snapshot.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let mut snapshot: Self = serde_json::from_slice(bytes).map_err(Error::persistence)?;
        snapshot.validate()?;
        snapshot.index_ids().map_err(Error::persistence)?;
        Ok(snapshot)
    }

    fn validate(&self) -> Result<()> {
        if self.version != FORMAT_VERSION {
            return Err(Error::Persistence(format!("unsupported index format version {} (expected {})", self.version, FORMAT_VERSION)));
        }
        let n = self.chunks.len();
        if self.dense.len() != n || self.sparse.len() != n {
            return Err(Error::Persistence(format!(
                "index parts disagree: {} chunks, {} vectors, {} sparse entries",
                n,
                self.dense.len(),
                self.sparse.len()
            )));
        }
        self.dense.validate()?;
        self.sparse.validate()
    }
}
