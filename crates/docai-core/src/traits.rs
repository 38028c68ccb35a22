//! Narrow interfaces to the collaborators the core calls out to.

/// Embedding provider. Vectors must be deterministic for identical input
/// under one `embedder_id`, and all of length `dim()`.
pub trait Embedder: Send + Sync {
    /// Stable identifier for the provider/model (e.g. `hash:d1024`).
    fn embedder_id(&self) -> &str;
    fn dim(&self) -> usize;
    fn max_len(&self) -> usize;
    fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>>;

    fn embed(&self, text: &str) -> anyhow::Result<Vec<f32>> {
        self.embed_batch(&[text.to_string()])?
            .pop()
            .ok_or_else(|| anyhow::anyhow!("embedder returned no vector"))
    }
}

/// Language-model completion provider. The core only needs a string back.
pub trait Completer: Send + Sync {
    fn name(&self) -> &str;
    fn complete(&self, system: &str, user: &str) -> anyhow::Result<String>;
}

/// Durable home for the serialized index.
pub trait IndexStore: Send + Sync {
    fn save(&self, blob: &[u8]) -> anyhow::Result<()>;
    /// `Ok(None)` when nothing has been saved yet.
    fn load(&self) -> anyhow::Result<Option<Vec<u8>>>;
    fn clear(&self) -> anyhow::Result<()>;
}
