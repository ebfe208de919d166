//! Worker error types.

use thiserror::Error;

use reelgen_assets::GenerationError;
use reelgen_media::{AlignmentError, CompositionError, RenderError};
use reelgen_models::{ErrorKind, JobError};
use reelgen_upload::{AuthError, NoAccountAvailable};

use crate::manifest::ManifestError;

pub type WorkerResult<T> = Result<T, WorkerError>;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("generation failed: {0}")]
    Generation(#[from] GenerationError),

    #[error("subtitle alignment failed: {0}")]
    Alignment(#[from] AlignmentError),

    #[error("composition failed: {0}")]
    Composition(#[from] CompositionError),

    #[error("render failed: {0}")]
    Render(#[from] RenderError),

    #[error("auth failed: {0}")]
    Auth(#[from] AuthError),

    #[error(transparent)]
    NoAccount(#[from] NoAccountAvailable),

    #[error("manifest error: {0}")]
    Manifest(#[from] ManifestError),

    #[error("batch input error: {0}")]
    Batch(String),

    #[error("job state inconsistent: {0}")]
    InvalidState(String),

    #[error("interrupted")]
    Interrupted,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl WorkerError {
    pub fn batch(msg: impl Into<String>) -> Self {
        Self::Batch(msg.into())
    }

    pub fn invalid_state(msg: impl Into<String>) -> Self {
        Self::InvalidState(msg.into())
    }

    /// Whether a later attempt could succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            WorkerError::Generation(e) => e.is_transient(),
            WorkerError::Render(e) => e.is_transient(),
            WorkerError::Auth(e) => !e.is_permanent(),
            WorkerError::NoAccount(_) => true,
            WorkerError::Io(_) | WorkerError::Manifest(_) => true,
            WorkerError::Alignment(_)
            | WorkerError::Composition(_)
            | WorkerError::Batch(_)
            | WorkerError::InvalidState(_)
            | WorkerError::Interrupted => false,
        }
    }

    /// Error category recorded on job state.
    pub fn kind(&self) -> ErrorKind {
        match self {
            WorkerError::Generation(_) => ErrorKind::Generation,
            WorkerError::Alignment(_) => ErrorKind::Alignment,
            WorkerError::Composition(_) => ErrorKind::Composition,
            WorkerError::Render(_) => ErrorKind::Render,
            WorkerError::Auth(_) => ErrorKind::Auth,
            WorkerError::NoAccount(_) => ErrorKind::NoAccount,
            WorkerError::Interrupted => ErrorKind::Interrupted,
            WorkerError::Manifest(_)
            | WorkerError::Io(_)
            | WorkerError::Batch(_)
            | WorkerError::InvalidState(_) => ErrorKind::Persistence,
        }
    }

    /// Convert into the error record attached to a job.
    pub fn to_job_error(&self) -> JobError {
        JobError::new(self.kind(), self.to_string())
    }
}
