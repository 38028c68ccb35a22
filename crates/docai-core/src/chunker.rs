//! Fixed-size, overlapping character windows over document text.

use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::types::{Chunk, Document, PAGE_BREAK};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkingConfig {
    pub chunk_size: usize,
    pub overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self { chunk_size: 800, overlap: 120 }
    }
}

impl ChunkingConfig {
    pub fn new(chunk_size: usize, overlap: usize) -> Result<Self> {
        let config = Self { chunk_size, overlap };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(Error::InvalidParameter("chunk_size must be positive".into()));
        }
        if self.overlap >= self.chunk_size {
            return Err(Error::InvalidParameter(format!(
                "overlap ({}) must be smaller than chunk_size ({})",
                self.overlap, self.chunk_size
            )));
        }
        Ok(())
    }

    /// Distance between the starts of consecutive windows.
    pub fn stride(&self) -> usize {
        self.chunk_size - self.overlap
    }
}

/// Split one document into windows of `chunk_size` characters advancing by
/// `chunk_size - overlap`. The last window may be shorter; a document no
/// longer than `chunk_size` (including an empty one) yields one chunk.
pub fn chunk(document: &Document, chunk_size: usize, overlap: usize) -> Result<Vec<Chunk>> {
    let config = ChunkingConfig::new(chunk_size, overlap)?;
    Ok(split(document, &config))
}

fn split(document: &Document, config: &ChunkingConfig) -> Vec<Chunk> {
    let text = document.text.as_str();
    // Byte position of every char boundary, including the end of the text.
    let bounds: Vec<usize> = text.char_indices().map(|(i, _)| i).chain(std::iter::once(text.len())).collect();
    let total = bounds.len() - 1;

    let mut chunks = Vec::with_capacity(total / config.stride() + 1);
    let mut start = 0usize;
    let mut page = 1u32;
    let mut counted_to = 0usize;
    loop {
        let end = (start + config.chunk_size).min(total);
        page += count_page_breaks(&text[bounds[counted_to]..bounds[start]]);
        counted_to = start;

        let seq = chunks.len();
        chunks.push(Chunk {
            id: format!("{}:{}", document.id, seq),
            doc_id: document.id.clone(),
            source: document.source.clone(),
            seq,
            offset: start,
            text: text[bounds[start]..bounds[end]].to_string(),
            char_len: end - start,
            page,
        });
        if end >= total {
            break;
        }
        start += config.stride();
    }
    chunks
}

fn count_page_breaks(s: &str) -> u32 {
    u32::try_from(s.chars().filter(|c| *c == PAGE_BREAK).count()).unwrap_or(u32::MAX)
}

/// Chunks a batch of documents with one configuration.
#[derive(Debug, Clone, Default)]
pub struct Chunker {
    config: ChunkingConfig,
}

impl Chunker {
    pub fn new(config: ChunkingConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> ChunkingConfig {
        self.config
    }

    /// Chunk every document in order. Documents whose text is blank carry
    /// nothing searchable and are skipped.
    pub fn chunk_documents(&self, documents: &[Document]) -> Vec<Chunk> {
        let mut all_chunks = Vec::new();
        for document in documents {
            if document.text.trim().is_empty() {
                warn!(doc_id = %document.id, "skipping blank document");
                continue;
            }
            let chunks = split(document, &self.config);
            debug!(doc_id = %document.id, chunks = chunks.len(), "chunked document");
            all_chunks.extend(chunks);
        }
        all_chunks
    }
}
