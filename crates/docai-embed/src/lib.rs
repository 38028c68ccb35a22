//! docai-embed
//!
//! Embedding providers behind `docai_core::traits::Embedder`: the local
//! BGE-M3 model and a hashed bag-of-words embedder for offline use.
use anyhow::{bail, Result};
use std::sync::Arc;
use tracing::info;

use docai_core::config::EmbeddingSettings;
use docai_core::traits::Embedder;

pub mod device;
pub mod hash;
pub mod model;
pub mod pool;
pub mod tokenize;

pub use hash::HashEmbedder;
pub use model::{resolve_model_dir, BgeM3Embedder};
pub use pool::masked_mean_l2;

pub fn use_fake_embeddings() -> bool {
    std::env::var("APP_USE_FAKE_EMBEDDINGS").ok().map(|v| v == "1" || v.eq_ignore_ascii_case("true")).unwrap_or(false)
}

/// Build the provider selected by `settings.backend`.
/// `APP_USE_FAKE_EMBEDDINGS=1` forces the hashed embedder.
pub fn default_embedder(settings: &EmbeddingSettings) -> Result<Arc<dyn Embedder>> {
    if use_fake_embeddings() || settings.backend == "hash" {
        info!(dim = settings.dim, "using hashed embedder");
        return Ok(Arc::new(HashEmbedder::new(settings.dim, settings.max_len)));
    }
    match settings.backend.as_str() {
        "bge-m3" => {
            let dir = resolve_model_dir(settings.model_dir.as_deref())?;
            Ok(Arc::new(BgeM3Embedder::load(&dir, settings.max_len)?))
        }
        other => bail!("unknown embedding backend '{other}' (expected 'hash' or 'bge-m3')"),
    }
}
