//! Upload account roster loading.
//!
//! Accounts live in a JSON file next to the batch input: one entry per
//! upload identity with its quota limits and bearer token. The token
//! feeds the static auth provider; everything else builds the pool.

use std::path::Path;

use serde::Deserialize;
use tracing::info;

use reelgen_models::{Account, AccountId, QuotaLimits};
use reelgen_upload::StaticAuthProvider;

use crate::error::{WorkerError, WorkerResult};

#[derive(Debug, Deserialize)]
struct AccountEntry {
    id: String,
    token: String,
    #[serde(default)]
    per_minute: Option<u32>,
    #[serde(default)]
    per_day: Option<u32>,
}

/// Load the account roster from a JSON file.
///
/// Returns the pool accounts plus an auth provider seeded with each
/// account's token. An empty roster is an error: a batch with no upload
/// identities can never finish.
pub async fn load_accounts(path: &Path) -> WorkerResult<(Vec<Account>, StaticAuthProvider)> {
    let bytes = tokio::fs::read(path).await?;
    let entries: Vec<AccountEntry> = serde_json::from_slice(&bytes)
        .map_err(|e| WorkerError::batch(format!("invalid accounts file: {e}")))?;
    if entries.is_empty() {
        return Err(WorkerError::batch("accounts file lists no accounts"));
    }

    let defaults = QuotaLimits::default();
    let mut accounts = Vec::with_capacity(entries.len());
    let mut auth = StaticAuthProvider::new();
    for entry in entries {
        let id = AccountId::new(entry.id);
        let limits = QuotaLimits {
            per_minute: entry.per_minute.unwrap_or(defaults.per_minute),
            per_day: entry.per_day.unwrap_or(defaults.per_day),
        };
        auth = auth.with_token(id.clone(), entry.token);
        accounts.push(Account::new(id, limits));
    }
    info!(count = accounts.len(), path = %path.display(), "loaded upload accounts");
    Ok((accounts, auth))
}
