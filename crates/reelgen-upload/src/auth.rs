//! Auth provider seam.
//!
//! Credential storage and token refresh belong to an external provider;
//! the pipeline only asks for a usable token per account.

use std::collections::HashMap;

use async_trait::async_trait;

use reelgen_models::AccountId;

use crate::error::AuthError;

/// An opaque bearer credential for one upload attempt.
#[derive(Debug, Clone)]
pub struct Credential {
    token: String,
}

impl Credential {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }

    pub fn token(&self) -> &str {
        &self.token
    }
}

/// External credential provider. Refresh is the provider's job; callers
/// see either a usable token or a classified failure.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    async fn credential(&self, account: &AccountId) -> Result<Credential, AuthError>;
}

/// Fixed token map, for local runs and tests.
#[derive(Debug, Default)]
pub struct StaticAuthProvider {
    tokens: HashMap<AccountId, String>,
}

impl StaticAuthProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(mut self, account: AccountId, token: impl Into<String>) -> Self {
        self.tokens.insert(account, token.into());
        self
    }
}

#[async_trait]
impl AuthProvider for StaticAuthProvider {
    async fn credential(&self, account: &AccountId) -> Result<Credential, AuthError> {
        self.tokens
            .get(account)
            .map(|t| Credential::new(t.clone()))
            .ok_or_else(|| AuthError::Revoked(format!("no credentials for account {account}")))
    }
}
