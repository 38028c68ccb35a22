//! Domain types shared by the index, the ranker and answer synthesis.

use serde::{Deserialize, Serialize};
use std::fmt;

pub type ChunkId = String;

/// Page separator emitted by page-aware text extractors.
pub const PAGE_BREAK: char = '\u{0C}';

/// Extracted text of one source document, ready for chunking.
///
/// - `id`: stable document identity (relative path or external id)
/// - `source`: display name used in citations (usually the file name)
/// - `text`: UTF-8, newline-normalized full text; `\x0C` marks page breaks
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Document {
    pub id: String,
    pub source: String,
    pub text: String,
}

impl Document {
    pub fn new(id: impl Into<String>, source: impl Into<String>, text: impl Into<String>) -> Self {
        Self { id: id.into(), source: source.into(), text: text.into() }
    }
}

/// Where a chunk sits inside its document: 1-based page of its first
/// character plus the `[start, end)` character range.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Locator {
    pub page: u32,
    pub start: usize,
    pub end: usize,
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "page {}, chars {}-{}", self.page, self.start, self.end)
    }
}

/// A window of a source document that is independently indexed.
///
/// - `id`: `"{doc_id}:{seq}"`, unique across the index
/// - `seq`: position of the window within its document
/// - `offset`: character offset of the window's first character
/// - `char_len`: number of characters in `text`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Chunk {
    pub id: ChunkId,
    pub doc_id: String,
    pub source: String,
    pub seq: usize,
    pub offset: usize,
    pub text: String,
    pub char_len: usize,
    pub page: u32,
}

impl Chunk {
    pub fn locator(&self) -> Locator {
        Locator { page: self.page, start: self.offset, end: self.offset + self.char_len }
    }
}

/// Indicates which index produced a hit.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum SourceKind {
    Dense,
    Sparse,
}

/// The minimal surface returned by both indexes.
///
/// `id` matches `Chunk::id`. `score` is index-specific but higher is always
/// better.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchHit {
    pub id: ChunkId,
    pub score: f32,
    pub source: SourceKind,
}

/// A fused retrieval result for one query.
///
/// `dense_score`/`sparse_score` are the raw index scores, `None` when the
/// chunk was absent from that list. `fused_score` is the weighted sum of the
/// min-max normalized scores.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Candidate {
    pub chunk_id: ChunkId,
    pub doc_id: String,
    pub source: String,
    pub locator: Locator,
    pub text: String,
    pub dense_score: Option<f32>,
    pub sparse_score: Option<f32>,
    pub fused_score: f32,
}
