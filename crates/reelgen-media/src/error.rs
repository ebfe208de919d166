//! Media stage error types.

use thiserror::Error;

/// Subtitle alignment failure. Both cases require the caller to change
/// the input (shorter text or longer narration), so neither is retried.
#[derive(Debug, Error, PartialEq)]
pub enum AlignmentError {
    #[error("subtitle text is empty but narration lasts {narration_secs}s")]
    EmptyText { narration_secs: f64 },

    #[error("{cues} cues at minimum {min_cue_secs}s do not fit in {narration_secs}s of narration")]
    DoesNotFit {
        cues: usize,
        min_cue_secs: f64,
        narration_secs: f64,
    },
}

/// Timeline composition failure.
#[derive(Debug, Error, PartialEq)]
pub enum CompositionError {
    #[error("no visual assets supplied")]
    NoVisuals,

    #[error("narration duration must be finite and non-negative, got {0}")]
    InvalidNarrationDuration(f64),
}

/// Render backend failure.
#[derive(Debug, Error)]
pub enum RenderError {
    /// Backend overload or other retriable condition
    #[error("transient render failure: {0}")]
    Transient(String),

    /// Malformed timeline or other non-retriable condition
    #[error("permanent render failure: {0}")]
    Permanent(String),
}

impl RenderError {
    pub fn transient(msg: impl Into<String>) -> Self {
        Self::Transient(msg.into())
    }

    pub fn permanent(msg: impl Into<String>) -> Self {
        Self::Permanent(msg.into())
    }

    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient(_))
    }
}
