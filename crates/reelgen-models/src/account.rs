//! Upload accounts, quota windows and health state.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique identifier for an upload account.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId(pub String);

impl AccountId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Account health state.
///
/// `Disabled` never recovers on its own; re-enabling requires operator
/// intervention (re-authentication of the account).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum AccountHealth {
    /// Eligible for uploads
    Active,
    /// Rate-limited by the platform; recovers automatically after `until`
    CoolingDown { until: DateTime<Utc> },
    /// Permanent auth failure; requires re-authentication
    Disabled,
}

impl AccountHealth {
    pub fn is_disabled(&self) -> bool {
        matches!(self, AccountHealth::Disabled)
    }
}

/// Per-account upload quota limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotaLimits {
    /// Uploads allowed per rolling minute window
    pub per_minute: u32,
    /// Uploads allowed per rolling day window
    pub per_day: u32,
}

impl Default for QuotaLimits {
    fn default() -> Self {
        Self {
            per_minute: 2,
            per_day: 20,
        }
    }
}

/// One upload identity with its quota counters and health state.
///
/// Mutated only by the account pool (selection, quota decrement) and the
/// upload dispatcher (outcome reports routed through the pool).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    pub limits: QuotaLimits,
    pub health: AccountHealth,
    /// Uploads consumed in the current minute window
    pub minute_used: u32,
    pub minute_window_start: DateTime<Utc>,
    /// Uploads consumed in the current day window
    pub day_used: u32,
    pub day_window_start: DateTime<Utc>,
}

impl Account {
    pub fn new(id: AccountId, limits: QuotaLimits) -> Self {
        let now = Utc::now();
        Self {
            id,
            limits,
            health: AccountHealth::Active,
            minute_used: 0,
            minute_window_start: now,
            day_used: 0,
            day_window_start: now,
        }
    }

    /// Reset quota counters whose window has elapsed.
    pub fn roll_windows(&mut self, now: DateTime<Utc>) {
        if now - self.minute_window_start >= Duration::minutes(1) {
            self.minute_used = 0;
            self.minute_window_start = now;
        }
        if now - self.day_window_start >= Duration::days(1) {
            self.day_used = 0;
            self.day_window_start = now;
        }
    }

    /// Recover from cooldown when the expiry has passed. Disabled accounts
    /// never recover here.
    pub fn refresh_health(&mut self, now: DateTime<Utc>) {
        if let AccountHealth::CoolingDown { until } = self.health {
            if now >= until {
                self.health = AccountHealth::Active;
            }
        }
    }

    /// Whether the account can take one more upload at `now`.
    ///
    /// Callers must roll windows and refresh health first; the pool does
    /// both inside its mutex before checking.
    pub fn has_quota(&self) -> bool {
        self.minute_used < self.limits.per_minute && self.day_used < self.limits.per_day
    }

    /// Count one upload attempt against both quota windows.
    pub fn consume_quota(&mut self) {
        self.minute_used += 1;
        self.day_used += 1;
    }

    pub fn is_active(&self) -> bool {
        matches!(self.health, AccountHealth::Active)
    }
}
