//! Generation error taxonomy.

use thiserror::Error;

pub type GenerationResult<T> = Result<T, GenerationError>;

/// Error from an asset generation backend or the content store.
///
/// `Transient` failures are safe to retry; `Permanent` failures (policy
/// rejection, invalid prompt) must not be retried.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("transient generation failure: {0}")]
    Transient(String),

    #[error("permanent generation failure: {0}")]
    Permanent(String),

    #[error("content store error: {0}")]
    Store(#[from] std::io::Error),
}

impl GenerationError {
    pub fn transient(msg: impl Into<String>) -> Self {
        Self::Transient(msg.into())
    }

    pub fn permanent(msg: impl Into<String>) -> Self {
        Self::Permanent(msg.into())
    }

    /// Whether a retry could succeed. Store IO failures are treated as
    /// transient (disk pressure, contention).
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient(_) | Self::Store(_))
    }
}
