//! docai-text
//!
//! Sparse lexical index. Chunk text runs through the tantivy analyzer in
//! `analyzer` and is scored with Okapi-BM25 over the postings in `sparse`.
pub mod analyzer;
pub mod sparse;

pub use analyzer::analyze;
pub use sparse::{Bm25Params, Posting, SparseIndex};
