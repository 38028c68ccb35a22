//! docai-vector
//!
//! Exact cosine nearest-neighbour index over chunk embeddings, plus the
//! content-addressed embedding cache consulted when the index is rebuilt.
pub mod cache;
pub mod dense;

pub use cache::{content_hash, CacheLookup, EmbeddingCache};
pub use dense::{cosine_similarity, DenseIndex};
