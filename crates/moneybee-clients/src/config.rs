//! Collaborator configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Base URLs of the four collaborator services
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollaboratorEndpoints {
    pub customer_url: String,
    pub fraud_url: String,
    pub exchange_rate_url: String,
    pub auth_url: String,
}

impl Default for CollaboratorEndpoints {
    fn default() -> Self {
        Self {
            customer_url: "http://localhost:5001".to_string(),
            fraud_url: "http://localhost:5002".to_string(),
            exchange_rate_url: "http://localhost:5003".to_string(),
            auth_url: "http://localhost:5004".to_string(),
        }
    }
}

impl CollaboratorEndpoints {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            customer_url: env_or("CUSTOMER_SERVICE_URL", defaults.customer_url),
            fraud_url: env_or("FRAUD_SERVICE_URL", defaults.fraud_url),
            exchange_rate_url: env_or("EXCHANGE_RATE_SERVICE_URL", defaults.exchange_rate_url),
            auth_url: env_or("AUTH_SERVICE_URL", defaults.auth_url),
        }
    }
}

/// Transport discipline shared by every collaborator client
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollaboratorConfig {
    /// Per-call deadline
    pub timeout_secs: u64,
    /// Retry attempts for idempotent calls (first try included)
    pub retry_attempts: u32,
    /// First retry delay; doubled per attempt
    pub retry_base_delay_ms: u64,
    /// Consecutive failures before the circuit opens
    pub breaker_failure_threshold: u32,
    /// How long an open circuit waits before probing
    pub breaker_cooldown_secs: u64,
}

impl Default for CollaboratorConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 10,
            retry_attempts: 3,
            retry_base_delay_ms: 100,
            breaker_failure_threshold: 5,
            breaker_cooldown_secs: 30,
        }
    }
}

impl CollaboratorConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            timeout_secs: env_parse("COLLABORATOR_TIMEOUT").unwrap_or(defaults.timeout_secs),
            retry_attempts: env_parse("COLLABORATOR_RETRY_ATTEMPTS")
                .unwrap_or(defaults.retry_attempts),
            retry_base_delay_ms: defaults.retry_base_delay_ms,
            breaker_failure_threshold: env_parse("COLLABORATOR_BREAKER_THRESHOLD")
                .unwrap_or(defaults.breaker_failure_threshold),
            breaker_cooldown_secs: env_parse("COLLABORATOR_BREAKER_COOLDOWN")
                .unwrap_or(defaults.breaker_cooldown_secs),
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn retry_base_delay(&self) -> Duration {
        Duration::from_millis(self.retry_base_delay_ms)
    }

    pub fn breaker_cooldown(&self) -> Duration {
        Duration::from_secs(self.breaker_cooldown_secs)
    }
}

fn env_or(name: &str, default: String) -> String {
    std::env::var(name).unwrap_or(default)
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|s| s.parse().ok())
}
