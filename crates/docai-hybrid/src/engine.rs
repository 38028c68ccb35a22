//! `HybridSearchEngine`: the index handle callers hold.
//!
//! Readers clone the current `Arc<IndexSnapshot>` at call start and work on
//! it without further locking. A rebuild runs under a single-writer lock,
//! builds a complete new snapshot off to the side and swaps it in at the
//! end, so readers see either the old index or the new one.

use serde::Serialize;
use std::sync::{Arc, RwLock};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use docai_core::chunker::Chunker;
use docai_core::config::{RetrievalSettings, Settings};
use docai_core::error::{Error, Result};
use docai_core::traits::{Embedder, IndexStore};
use docai_core::types::{Candidate, Document};
use docai_vector::EmbeddingCache;

use crate::fusion::{fuse, FusionWeights};
use crate::snapshot::IndexSnapshot;

/// Called from the embedding worker with `(embedded, total)`.
pub type ProgressFn = Arc<dyn Fn(usize, usize) + Send + Sync>;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexStats {
    pub documents: usize,
    pub skipped_documents: usize,
    pub chunks: usize,
    pub embedded: usize,
    pub reused_embeddings: usize,
    /// False when no store is attached or saving failed.
    pub persisted: bool,
}

/// What `status()` reports about the served index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndexStatus {
    pub loaded: bool,
    pub embedder_id: String,
    pub dim: usize,
    pub documents: usize,
    pub chunks: usize,
    /// Distinct terms in the sparse index.
    pub vocabulary: usize,
}

pub struct HybridSearchEngine {
    embedder: Arc<dyn Embedder>,
    store: Option<Arc<dyn IndexStore>>,
    chunker: Chunker,
    retrieval: RetrievalSettings,
    batch_size: usize,
    current: RwLock<Option<Arc<IndexSnapshot>>>,
    build_lock: Mutex<()>,
}

impl HybridSearchEngine {
    pub fn new(embedder: Arc<dyn Embedder>, settings: &Settings) -> Result<Self> {
        settings.validate()?;
        Ok(Self {
            embedder,
            store: None,
            chunker: Chunker::new(settings.chunking.to_config())?,
            retrieval: settings.retrieval.clone(),
            batch_size: settings.embedding.batch_size,
            current: RwLock::new(None),
            build_lock: Mutex::new(()),
        })
    }

    pub fn with_store(mut self, store: Arc<dyn IndexStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Engine backed by `store`, serving whatever index it already holds.
    pub fn open(embedder: Arc<dyn Embedder>, store: Arc<dyn IndexStore>, settings: &Settings) -> Result<Self> {
        let engine = Self::new(embedder, settings)?.with_store(store);
        engine.load_persisted();
        Ok(engine)
    }

    pub fn embedder(&self) -> &Arc<dyn Embedder> { &self.embedder }

    /// The snapshot readers currently see.
    pub fn snapshot(&self) -> Option<Arc<IndexSnapshot>> {
        match self.current.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// The current snapshot, or `IndexUnavailable` when nothing is loaded.
    pub fn require_snapshot(&self) -> Result<Arc<IndexSnapshot>> {
        self.snapshot().ok_or_else(|| Error::IndexUnavailable("no index has been built or loaded".into()))
    }

    pub fn status(&self) -> IndexStatus {
        match self.snapshot() {
            Some(snapshot) => IndexStatus {
                loaded: true,
                embedder_id: snapshot.embedder_id().to_string(),
                dim: snapshot.dim(),
                documents: snapshot.document_count(),
                chunks: snapshot.len(),
                vocabulary: snapshot.sparse().term_count(),
            },
            None => IndexStatus {
                loaded: false,
                embedder_id: self.embedder.embedder_id().to_string(),
                dim: self.embedder.dim(),
                documents: 0,
                chunks: 0,
                vocabulary: 0,
            },
        }
    }

    fn install(&self, snapshot: Option<Arc<IndexSnapshot>>) {
        match self.current.write() {
            Ok(mut guard) => *guard = snapshot,
            Err(poisoned) => *poisoned.into_inner() = snapshot,
        }
    }

    /// Load the persisted index. Anything unusable (missing, corrupt, built
    /// by another embedder) leaves the engine without an index.
    pub fn load_persisted(&self) -> bool {
        let Some(store) = &self.store else { return false };
        let bytes = match store.load() {
            Ok(Some(bytes)) => bytes,
            Ok(None) => {
                debug!("no persisted index");
                return false;
            }
            Err(e) => {
                warn!(error = %format!("{e:#}"), "could not read persisted index");
                return false;
            }
        };
        match IndexSnapshot::from_bytes(&bytes) {
            Ok(snapshot) if snapshot.embedder_id() != self.embedder.embedder_id() => {
                warn!(stored = snapshot.embedder_id(), current = self.embedder.embedder_id(), "persisted index was built by another embedder; ignoring it");
                false
            }
            Ok(snapshot) => {
                info!(chunks = snapshot.len(), "loaded persisted index");
                self.install(Some(Arc::new(snapshot)));
                true
            }
            Err(e) => {
                warn!(error = %e, "persisted index is corrupt; ignoring it");
                false
            }
        }
    }

    pub async fn build_index(&self, documents: &[Document]) -> Result<IndexStats> {
        self.build_index_with_progress(documents, Arc::new(|_: usize, _: usize| {})).await
    }

    /// Chunk, embed and index `documents`, replacing the whole index.
    pub async fn build_index_with_progress(&self, documents: &[Document], progress: ProgressFn) -> Result<IndexStats> {
        let _writer = self.build_lock.lock().await;

        let chunks = self.chunker.chunk_documents(documents);
        let skipped = documents.iter().filter(|d| d.text.trim().is_empty()).count();
        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();

        let mut cache = EmbeddingCache::new(self.embedder.embedder_id());
        if let Some(previous) = self.snapshot() {
            cache.seed(previous.embedder_id(), previous.cached_pairs());
        }
        let lookup = cache.lookup(&texts);
        let reused = lookup.hits();
        let missing: Vec<String> = lookup.misses.iter().map(|&i| texts[i].clone()).collect();
        info!(documents = documents.len(), chunks = chunks.len(), reused, to_embed = missing.len(), "building index");

        let fresh = self.embed_texts(missing, progress).await?;
        let mut vectors = lookup.vectors;
        for (&slot, vector) in lookup.misses.iter().zip(fresh) {
            vectors[slot] = Some(vector);
        }
        let vectors: Vec<Vec<f32>> = vectors
            .into_iter()
            .map(|v| v.ok_or_else(|| Error::EmbeddingFailure("embedder returned too few vectors".into())))
            .collect::<Result<_>>()?;

        let snapshot = Arc::new(IndexSnapshot::build(self.embedder.embedder_id(), self.embedder.dim(), chunks, vectors)?);
        let mut stats = IndexStats {
            documents: documents.len(),
            skipped_documents: skipped,
            chunks: snapshot.len(),
            embedded: snapshot.len() - reused,
            reused_embeddings: reused,
            persisted: false,
        };
        self.install(Some(snapshot.clone()));
        stats.persisted = self.persist(&snapshot);
        info!(chunks = stats.chunks, persisted = stats.persisted, "index ready");
        Ok(stats)
    }

    fn persist(&self, snapshot: &IndexSnapshot) -> bool {
        let Some(store) = &self.store else { return false };
        let saved = snapshot.to_bytes().and_then(|bytes| store.save(&bytes).map_err(Error::persistence));
        match saved {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, "index built but not persisted");
                false
            }
        }
    }

    /// Embed on the blocking pool in `batch_size` batches.
    async fn embed_texts(&self, texts: Vec<String>, progress: ProgressFn) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(vec![]);
        }
        let embedder = self.embedder.clone();
        let batch_size = self.batch_size.max(1);
        tokio::task::spawn_blocking(move || -> anyhow::Result<Vec<Vec<f32>>> {
            let total = texts.len();
            let mut out = Vec::with_capacity(total);
            for batch in texts.chunks(batch_size) {
                let vectors = embedder.embed_batch(batch)?;
                if vectors.len() != batch.len() {
                    anyhow::bail!("embedder returned {} vectors for {} texts", vectors.len(), batch.len());
                }
                out.extend(vectors);
                progress(out.len(), total);
            }
            Ok(out)
        })
        .await
        .map_err(Error::embedding)?
        .map_err(Error::embedding)
    }

    async fn embed_query(&self, query: &str) -> Result<Vec<f32>> {
        let embedder = self.embedder.clone();
        let query = query.to_string();
        tokio::task::spawn_blocking(move || embedder.embed(&query))
            .await
            .map_err(Error::embedding)?
            .map_err(Error::embedding)
    }

    /// Retrieve with the configured weights.
    pub async fn retrieve(&self, query: &str, top_k: usize) -> Result<Vec<Candidate>> {
        self.retrieve_weighted(query, top_k, self.retrieval.dense_weight, self.retrieval.sparse_weight).await
    }

    /// Hybrid retrieval: overfetch from both indexes, fuse, keep `top_k`.
    /// No index, an empty index, a blank query or `top_k == 0` all give an
    /// empty list.
    pub async fn retrieve_weighted(&self, query: &str, top_k: usize, dense_weight: f32, sparse_weight: f32) -> Result<Vec<Candidate>> {
        let weights = FusionWeights::new(dense_weight, sparse_weight)?;
        if query.trim().is_empty() || top_k == 0 {
            return Ok(vec![]);
        }
        let Some(snapshot) = self.snapshot() else {
            debug!(reason = %Error::IndexUnavailable("no index has been built".into()), "returning no candidates");
            return Ok(vec![]);
        };
        if snapshot.is_empty() {
            return Ok(vec![]);
        }

        let fetch = top_k.saturating_mul(self.retrieval.overfetch.max(1));
        let query_vector = self.embed_query(query).await?;
        let dense = snapshot.search_dense(&query_vector, fetch)?;
        let sparse = snapshot.search_sparse(query, fetch);
        let fused = fuse(&dense, &sparse, weights, top_k);
        debug!(dense = dense.len(), sparse = sparse.len(), ranked = fused.len(), "retrieved");

        Ok(fused
            .into_iter()
            .filter_map(|hit| {
                let chunk = snapshot.chunk(&hit.id)?;
                Some(Candidate {
                    chunk_id: hit.id,
                    doc_id: chunk.doc_id.clone(),
                    source: chunk.source.clone(),
                    locator: chunk.locator(),
                    text: chunk.text.clone(),
                    dense_score: hit.dense,
                    sparse_score: hit.sparse,
                    fused_score: hit.fused,
                })
            })
            .collect())
    }

    /// Drop the index and its persisted copy.
    pub async fn clear(&self) -> Result<()> {
        let _writer = self.build_lock.lock().await;
        self.install(None);
        if let Some(store) = &self.store {
            store.clear().map_err(Error::persistence)?;
        }
        info!("index cleared");
        Ok(())
    }
}
