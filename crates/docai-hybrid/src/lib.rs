//! docai-hybrid
//!
//! The dual index (dense + sparse over one chunk set), its persistence, and
//! the fusion ranker that turns both hit lists into one candidate list.
pub mod engine;
pub mod fusion;
pub mod snapshot;
pub mod store;

pub use engine::{HybridSearchEngine, IndexStats, IndexStatus, ProgressFn};
pub use fusion::{fuse, min_max_normalize, FusedHit, FusionWeights};
pub use snapshot::{IndexEntry, IndexSnapshot, FORMAT_VERSION};
pub use store::{FileStore, MemoryStore};
