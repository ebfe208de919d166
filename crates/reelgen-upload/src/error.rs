//! Upload error types.

use thiserror::Error;

/// All accounts are cooling down, disabled, or out of quota.
///
/// Treated as transient at the job level: the orchestrator re-queues the
/// job instead of failing it, up to a batch-level timeout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("no upload account available (all cooling down, disabled, or out of quota)")]
pub struct NoAccountAvailable;

/// Credential lookup/refresh failure from the auth provider.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Token endpoint unavailable or refresh timed out; retriable
    #[error("credential refresh failed: {0}")]
    Refresh(String),

    /// Grant revoked or expired; the account must be re-authenticated
    #[error("credentials revoked: {0}")]
    Revoked(String),
}

impl AuthError {
    pub fn is_permanent(&self) -> bool {
        matches!(self, AuthError::Revoked(_))
    }
}
