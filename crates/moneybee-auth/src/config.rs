//! Admission filter configuration

use std::time::Duration;

use moneybee_db::cache::ttl;

/// Header carrying the API key on every mutating request
pub const API_KEY_HEADER: &str = "X-API-Key";

/// Issued keys start with this literal prefix
pub const KEY_PREFIX: &str = "mb_";

/// Issued keys are never shorter than this
pub const MIN_KEY_LENGTH: usize = 20;

#[derive(Debug, Clone)]
pub struct AdmissionConfig {
    /// Cache TTL for keys the Auth service vouched for
    pub valid_ttl: Duration,
    /// Cache TTL for rejected keys
    pub invalid_ttl: Duration,
    /// Path prefixes that never require a key
    pub bypass_prefixes: Vec<String>,
}

impl Default for AdmissionConfig {
    fn default() -> Self {
        Self {
            valid_ttl: ttl::VALID_KEY,
            invalid_ttl: ttl::INVALID_KEY,
            bypass_prefixes: vec![
                "/health".to_string(),
                "/ready".to_string(),
                "/metrics".to_string(),
                "/docs".to_string(),
            ],
        }
    }
}

impl AdmissionConfig {
    pub fn is_bypassed(&self, path: &str) -> bool {
        self.bypass_prefixes.iter().any(|p| path.starts_with(p))
    }
}
