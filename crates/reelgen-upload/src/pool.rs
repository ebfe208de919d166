//! Rotating account pool with quota tracking and health state.

use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use reelgen_models::{Account, AccountHealth, AccountId};

use crate::error::NoAccountAvailable;

/// Outcome of one upload attempt, reported back to the pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadOutcome {
    Success,
    /// Platform signalled a rate limit; cool the account down
    RateLimited { retry_after: Duration },
    /// Permanent auth failure; disable the account
    AuthRevoked,
    /// Retriable failure unrelated to account health
    TransientFailure,
    /// Non-retriable failure unrelated to account health (e.g. content
    /// rejected)
    PermanentFailure,
}

struct PoolInner {
    accounts: Vec<Account>,
    cursor: usize,
}

/// Rotating set of upload identities.
///
/// The pool is the only state shared across concurrent jobs. All quota
/// check-and-decrement happens inside the pool mutex, so no two tasks
/// can consume the same quota slot.
pub struct AccountPool {
    inner: Mutex<PoolInner>,
}

impl AccountPool {
    pub fn new(accounts: Vec<Account>) -> Self {
        Self {
            inner: Mutex::new(PoolInner {
                accounts,
                cursor: 0,
            }),
        }
    }

    /// Select the next eligible account and consume one quota slot.
    pub async fn acquire(&self) -> Result<Account, NoAccountAvailable> {
        self.acquire_at(Utc::now(), None).await
    }

    /// Like [`acquire`](Self::acquire), trying `preferred` first when it
    /// is eligible.
    pub async fn acquire_preferred(
        &self,
        preferred: Option<&AccountId>,
    ) -> Result<Account, NoAccountAvailable> {
        self.acquire_at(Utc::now(), preferred).await
    }

    /// Selection at an explicit time; `acquire` passes the current time.
    pub async fn acquire_at(
        &self,
        now: DateTime<Utc>,
        preferred: Option<&AccountId>,
    ) -> Result<Account, NoAccountAvailable> {
        let mut inner = self.inner.lock().await;

        if let Some(id) = preferred {
            if let Some(index) = inner.accounts.iter().position(|a| &a.id == id) {
                if eligible(&mut inner.accounts[index], now) {
                    inner.accounts[index].consume_quota();
                    return Ok(inner.accounts[index].clone());
                }
            }
        }

        let len = inner.accounts.len();
        for offset in 0..len {
            let index = (inner.cursor + offset) % len;
            if eligible(&mut inner.accounts[index], now) {
                inner.cursor = (index + 1) % len;
                inner.accounts[index].consume_quota();
                let account = inner.accounts[index].clone();
                debug!(account = %account.id, "acquired upload account");
                return Ok(account);
            }
        }
        Err(NoAccountAvailable)
    }

    /// Apply an attempt outcome to account health.
    pub async fn report(&self, id: &AccountId, outcome: UploadOutcome) {
        self.report_at(id, outcome, Utc::now()).await
    }

    pub async fn report_at(&self, id: &AccountId, outcome: UploadOutcome, now: DateTime<Utc>) {
        let mut inner = self.inner.lock().await;
        let Some(account) = inner.accounts.iter_mut().find(|a| &a.id == id) else {
            return;
        };
        match outcome {
            UploadOutcome::Success
            | UploadOutcome::TransientFailure
            | UploadOutcome::PermanentFailure => {}
            UploadOutcome::RateLimited { retry_after } => {
                let until = now
                    + chrono::Duration::from_std(retry_after)
                        .unwrap_or_else(|_| chrono::Duration::seconds(60));
                warn!(account = %id, %until, "account rate limited, cooling down");
                account.health = AccountHealth::CoolingDown { until };
            }
            UploadOutcome::AuthRevoked => {
                warn!(account = %id, "account disabled after permanent auth failure");
                account.health = AccountHealth::Disabled;
            }
        }
    }

    /// Current state of every account (for logging and tests).
    pub async fn snapshot(&self) -> Vec<Account> {
        self.inner.lock().await.accounts.clone()
    }
}

fn eligible(account: &mut Account, now: DateTime<Utc>) -> bool {
    account.roll_windows(now);
    account.refresh_health(now);
    account.is_active() && account.has_quota()
}

#[cfg(test)]
mod tests {
    use super::*;
    use reelgen_models::QuotaLimits;

    fn pool_of(n: usize, limits: QuotaLimits) -> AccountPool {
        AccountPool::new(
            (0..n)
                .map(|i| Account::new(AccountId::new(format!("acct-{i}")), limits))
                .collect(),
        )
    }

    #[tokio::test]
    async fn quota_exhaustion_yields_no_account_available() {
        // N accounts with quota Q each: after N*Q acquire+report(success)
        // cycles with no time advance, acquire must fail.
        let limits = QuotaLimits {
            per_minute: 3,
            per_day: 3,
        };
        let pool = pool_of(2, limits);
        let now = Utc::now();

        for _ in 0..6 {
            let account = pool.acquire_at(now, None).await.unwrap();
            pool.report_at(&account.id, UploadOutcome::Success, now).await;
        }
        assert_eq!(pool.acquire_at(now, None).await, Err(NoAccountAvailable));
    }

    #[tokio::test]
    async fn selection_rotates_round_robin() {
        let pool = pool_of(3, QuotaLimits::default());
        let now = Utc::now();
        let first = pool.acquire_at(now, None).await.unwrap();
        let second = pool.acquire_at(now, None).await.unwrap();
        let third = pool.acquire_at(now, None).await.unwrap();
        let fourth = pool.acquire_at(now, None).await.unwrap();

        assert_ne!(first.id, second.id);
        assert_ne!(second.id, third.id);
        assert_eq!(first.id, fourth.id);
    }

    #[tokio::test]
    async fn cooldown_excludes_then_recovers() {
        let pool = pool_of(1, QuotaLimits::default());
        let now = Utc::now();

        let account = pool.acquire_at(now, None).await.unwrap();
        pool.report_at(
            &account.id,
            UploadOutcome::RateLimited {
                retry_after: Duration::from_secs(30),
            },
            now,
        )
        .await;

        assert_eq!(
            pool.acquire_at(now + chrono::Duration::seconds(10), None).await,
            Err(NoAccountAvailable)
        );
        let recovered = pool
            .acquire_at(now + chrono::Duration::seconds(31), None)
            .await
            .unwrap();
        assert_eq!(recovered.id, account.id);
        assert!(recovered.is_active());
    }

    #[tokio::test]
    async fn disabled_accounts_never_auto_recover() {
        let pool = pool_of(1, QuotaLimits::default());
        let now = Utc::now();

        let account = pool.acquire_at(now, None).await.unwrap();
        pool.report_at(&account.id, UploadOutcome::AuthRevoked, now).await;

        assert_eq!(
            pool.acquire_at(now + chrono::Duration::days(30), None).await,
            Err(NoAccountAvailable)
        );
    }

    #[tokio::test]
    async fn preferred_account_is_tried_first() {
        let pool = pool_of(3, QuotaLimits::default());
        let now = Utc::now();
        let preferred = AccountId::new("acct-2");

        let chosen = pool.acquire_at(now, Some(&preferred)).await.unwrap();
        assert_eq!(chosen.id, preferred);

        // Ineligible preferred falls back to rotation.
        pool.report_at(&preferred, UploadOutcome::AuthRevoked, now).await;
        let fallback = pool.acquire_at(now, Some(&preferred)).await.unwrap();
        assert_ne!(fallback.id, preferred);
    }
}
