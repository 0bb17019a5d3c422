//! Engine policy configuration
//!
//! Defaults match the production deployment; every knob can be overridden
//! through the environment variables named in the deployment manifests.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;

use crate::fees::FeeSchedule;

/// Tunable policy for the transfer engine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnginePolicy {
    /// Per-sender cap on normalized-to-TRY outgoing amount per UTC day
    pub daily_limit_try: Decimal,
    /// Transfers above this normalized amount get an approval hold
    pub high_amount_threshold_try: Decimal,
    /// How long a high-value transfer must wait before completion
    pub approval_wait_minutes: i64,
    /// Fee schedule applied at creation
    pub fees: FeeSchedule,
    /// Lease on the daily-limit lock
    pub lock_lease: Duration,
    /// Attempts to take the daily-limit lock before giving up
    pub lock_acquire_attempts: u32,
    /// In-process retries on an optimistic-concurrency conflict
    pub concurrency_retry_attempts: u32,
    /// Base backoff for concurrency retries (doubled per attempt)
    pub concurrency_backoff_base: Duration,
    /// Refuse senders the customer context has not KYC-verified
    pub require_kyc_verified: bool,
}

impl Default for EnginePolicy {
    fn default() -> Self {
        Self {
            daily_limit_try: Decimal::new(10_000, 0),
            high_amount_threshold_try: Decimal::new(1_000, 0),
            approval_wait_minutes: 5,
            fees: FeeSchedule::default(),
            lock_lease: Duration::from_secs(10),
            lock_acquire_attempts: 3,
            concurrency_retry_attempts: 3,
            concurrency_backoff_base: Duration::from_millis(100),
            require_kyc_verified: false,
        }
    }
}

impl EnginePolicy {
    /// Build a policy from the environment, falling back to defaults
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            daily_limit_try: env_decimal("DAILY_LIMIT_TRY").unwrap_or(defaults.daily_limit_try),
            high_amount_threshold_try: env_decimal("HIGH_AMOUNT_THRESHOLD_TRY")
                .unwrap_or(defaults.high_amount_threshold_try),
            approval_wait_minutes: env_parse("APPROVAL_WAIT_MINUTES")
                .unwrap_or(defaults.approval_wait_minutes),
            fees: FeeSchedule {
                base: env_decimal("FEE_BASE_TRY").unwrap_or(defaults.fees.base),
                percent: env_decimal("FEE_PERCENT").unwrap_or(defaults.fees.percent),
            },
            lock_lease: env_parse("LOCK_LEASE")
                .map(Duration::from_secs)
                .unwrap_or(defaults.lock_lease),
            lock_acquire_attempts: env_parse("LOCK_ACQUIRE_ATTEMPTS")
                .unwrap_or(defaults.lock_acquire_attempts),
            concurrency_retry_attempts: env_parse("CONCURRENCY_RETRY_ATTEMPTS")
                .unwrap_or(defaults.concurrency_retry_attempts),
            concurrency_backoff_base: defaults.concurrency_backoff_base,
            require_kyc_verified: env_parse("REQUIRE_KYC_VERIFIED")
                .unwrap_or(defaults.require_kyc_verified),
        }
    }

    /// The approval hold as a chrono duration
    pub fn approval_wait(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.approval_wait_minutes)
    }
}

fn env_parse<T: FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|s| s.parse().ok())
}

fn env_decimal(name: &str) -> Option<Decimal> {
    std::env::var(name)
        .ok()
        .and_then(|s| Decimal::from_str(&s).ok())
}
