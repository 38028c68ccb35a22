//! docai-core
//!
//! Domain types, error taxonomy, collaborator traits, configuration and the
//! chunker shared by the retrieval and answer crates.

pub mod chunker;
pub mod config;
pub mod error;
pub mod loader;
pub mod traits;
pub mod types;

pub use chunker::{chunk, Chunker, ChunkingConfig};
pub use error::{Error, Result};
pub use loader::DocumentLoader;
pub use types::{Candidate, Chunk, ChunkId, Document, Locator, SearchHit, SourceKind};
