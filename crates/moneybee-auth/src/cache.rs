//! API-key validity cache
//!
//! Keyed by the SHA-256 hex of the raw key so raw keys never reach the
//! cache backend. Staleness is bounded by the TTL chosen at write time.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use moneybee_db::cache::keys;
use moneybee_db::CacheManager;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache backend error: {0}")]
    Backend(String),
}

#[async_trait]
pub trait ValidityCache: Send + Sync {
    async fn get(&self, key_hash: &str) -> Result<Option<bool>, CacheError>;
    async fn put(&self, key_hash: &str, valid: bool, ttl: Duration) -> Result<(), CacheError>;
}

/// Production cache over Redis
pub struct RedisValidityCache {
    cache: CacheManager,
}

impl RedisValidityCache {
    pub fn new(cache: CacheManager) -> Self {
        Self { cache }
    }

    fn cache_key(key_hash: &str) -> String {
        format!("{}{}", keys::API_KEY, key_hash)
    }
}

#[async_trait]
impl ValidityCache for RedisValidityCache {
    async fn get(&self, key_hash: &str) -> Result<Option<bool>, CacheError> {
        self.cache
            .get(&Self::cache_key(key_hash))
            .await
            .map_err(|e| CacheError::Backend(e.to_string()))
    }

    async fn put(&self, key_hash: &str, valid: bool, ttl: Duration) -> Result<(), CacheError> {
        self.cache
            .set(&Self::cache_key(key_hash), &valid, ttl)
            .await
            .map_err(|e| CacheError::Backend(e.to_string()))
    }
}

/// In-process cache for tests and single-node deployments. TTLs are
/// honored on read.
#[derive(Default)]
pub struct MemoryValidityCache {
    entries: std::sync::Mutex<std::collections::HashMap<String, (bool, std::time::Instant)>>,
}

impl MemoryValidityCache {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ValidityCache for MemoryValidityCache {
    async fn get(&self, key_hash: &str) -> Result<Option<bool>, CacheError> {
        let entries = self.entries.lock().expect("cache mutex poisoned");
        Ok(entries.get(key_hash).and_then(|(valid, expires)| {
            (*expires > std::time::Instant::now()).then_some(*valid)
        }))
    }

    async fn put(&self, key_hash: &str, valid: bool, ttl: Duration) -> Result<(), CacheError> {
        let mut entries = self.entries.lock().expect("cache mutex poisoned");
        entries.insert(
            key_hash.to_string(),
            (valid, std::time::Instant::now() + ttl),
        );
        Ok(())
    }
}
