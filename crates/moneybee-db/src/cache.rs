//! Redis TTL cache
//!
//! Backs the API-key validity cache of the admission filter. Values are
//! JSON; staleness is bounded by the TTL chosen at write time.

use deadpool_redis::{redis::AsyncCommands, Pool as RedisPool};
use serde::{de::DeserializeOwned, Serialize};
use std::time::Duration;

use crate::{DbError, DbResult};

/// Cache key prefixes for organization
pub mod keys {
    pub const API_KEY: &str = "apikey:";
}

/// Default TTLs
pub mod ttl {
    use std::time::Duration;

    /// A key the Auth service vouched for
    pub const VALID_KEY: Duration = Duration::from_secs(5 * 60);
    /// A key the Auth service rejected; kept short so re-issued keys
    /// recover quickly
    pub const INVALID_KEY: Duration = Duration::from_secs(60);
}

#[derive(Clone)]
pub struct CacheManager {
    pool: RedisPool,
}

impl CacheManager {
    pub fn new(pool: RedisPool) -> Self {
        Self { pool }
    }

    /// Set a value with expiration
    pub async fn set<T: Serialize>(&self, key: &str, value: &T, ttl: Duration) -> DbResult<()> {
        let mut conn = self.pool.get().await?;

        let json = serde_json::to_string(value)?;

        conn.set_ex::<_, _, ()>(key, json, ttl.as_secs())
            .await
            .map_err(|e| DbError::Redis(e.to_string()))?;

        Ok(())
    }

    /// Get a value
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> DbResult<Option<T>> {
        let mut conn = self.pool.get().await?;

        let result: Option<String> = conn
            .get(key)
            .await
            .map_err(|e| DbError::Redis(e.to_string()))?;

        match result {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    /// Delete a key
    pub async fn delete(&self, key: &str) -> DbResult<bool> {
        let mut conn = self.pool.get().await?;

        let deleted: i32 = conn
            .del(key)
            .await
            .map_err(|e| DbError::Redis(e.to_string()))?;

        Ok(deleted > 0)
    }

    /// Check if key exists
    pub async fn exists(&self, key: &str) -> DbResult<bool> {
        let mut conn = self.pool.get().await?;

        let exists: bool = conn
            .exists(key)
            .await
            .map_err(|e| DbError::Redis(e.to_string()))?;

        Ok(exists)
    }
}
