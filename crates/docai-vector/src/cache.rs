//! In-memory embedding cache keyed by `(content_hash, embedder_id)`.
//!
//! A rebuild seeds the cache from the snapshot being replaced, so chunks
//! whose text did not change skip the embedder entirely.
use std::collections::HashMap;
use tracing::debug;

pub fn content_hash(text: &str) -> String {
    blake3::hash(text.as_bytes()).to_hex().to_string()
}

#[derive(Debug, Clone)]
pub struct EmbeddingCache {
    embedder_id: String,
    entries: HashMap<String, Vec<f32>>,
}

/// Result of looking up a batch: cached vectors in input order, and the
/// input positions that still need embedding.
#[derive(Debug, Clone, Default)]
pub struct CacheLookup {
    pub vectors: Vec<Option<Vec<f32>>>,
    pub misses: Vec<usize>,
}

impl CacheLookup {
    pub fn hits(&self) -> usize { self.vectors.len() - self.misses.len() }
}

impl EmbeddingCache {
    pub fn new(embedder_id: impl Into<String>) -> Self {
        Self { embedder_id: embedder_id.into(), entries: HashMap::new() }
    }

    pub fn embedder_id(&self) -> &str { &self.embedder_id }
    pub fn len(&self) -> usize { self.entries.len() }
    pub fn is_empty(&self) -> bool { self.entries.is_empty() }

    /// Copy `(text, vector)` pairs produced by `embedder_id`. Pairs from any
    /// other embedder are ignored; returns how many were taken.
    pub fn seed<'a>(&mut self, embedder_id: &str, pairs: impl IntoIterator<Item = (&'a str, &'a [f32])>) -> usize {
        if embedder_id != self.embedder_id {
            debug!(cached = embedder_id, current = %self.embedder_id, "embedder changed; cache not seeded");
            return 0;
        }
        let before = self.entries.len();
        for (text, vector) in pairs {
            self.entries.entry(content_hash(text)).or_insert_with(|| vector.to_vec());
        }
        self.entries.len() - before
    }

    pub fn get(&self, text: &str) -> Option<&[f32]> {
        self.entries.get(&content_hash(text)).map(Vec::as_slice)
    }

    pub fn lookup(&self, texts: &[String]) -> CacheLookup {
        let mut out = CacheLookup { vectors: Vec::with_capacity(texts.len()), misses: Vec::new() };
        for (i, text) in texts.iter().enumerate() {
            let hit = self.get(text).map(<[f32]>::to_vec);
            if hit.is_none() { out.misses.push(i); }
            out.vectors.push(hit);
        }
        out
    }
}
