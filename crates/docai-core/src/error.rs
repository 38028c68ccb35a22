use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// Bad sizing or weights supplied by the caller. Never retried.
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// No index has been built, or the persisted one could not be used.
    #[error("Index unavailable: {0}")]
    IndexUnavailable(String),

    /// The embedding collaborator failed or returned malformed vectors.
    #[error("Embedding failed: {0}")]
    EmbeddingFailure(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Persistence failed: {0}")]
    Persistence(String),
}

impl Error {
    pub fn embedding(err: impl std::fmt::Display) -> Self {
        Self::EmbeddingFailure(format!("{err:#}"))
    }

    pub fn persistence(err: impl std::fmt::Display) -> Self {
        Self::Persistence(format!("{err:#}"))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
