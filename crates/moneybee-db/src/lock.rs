//! Distributed lock over Redis
//!
//! SET NX EX with a per-acquire nonce. Release is a compare-and-delete on
//! the nonce so a holder whose lease expired cannot delete a lease taken
//! over by someone else.

use async_trait::async_trait;
use deadpool_redis::Pool as RedisPool;
use std::time::Duration;
use uuid::Uuid;

use moneybee_domain::{DistributedLock, LockError};

const LOCK_PREFIX: &str = "lock:";

/// Compare-and-delete: only the holder whose nonce still tags the key may
/// remove it
const RELEASE_SCRIPT: &str = r#"
if redis.call("GET", KEYS[1]) == ARGV[1] then
    return redis.call("DEL", KEYS[1])
else
    return 0
end
"#;

pub struct RedisLock {
    pool: RedisPool,
}

impl RedisLock {
    pub fn new(pool: RedisPool) -> Self {
        Self { pool }
    }

    fn key_for(resource: &str) -> String {
        format!("{}{}", LOCK_PREFIX, resource)
    }
}

#[async_trait]
impl DistributedLock for RedisLock {
    async fn acquire(&self, key: &str, lease: Duration) -> Result<Option<String>, LockError> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|e| LockError::Backend(e.to_string()))?;

        let nonce = Uuid::new_v4().to_string();

        let result: Option<String> = deadpool_redis::redis::cmd("SET")
            .arg(Self::key_for(key))
            .arg(&nonce)
            .arg("NX")
            .arg("PX")
            .arg(lease.as_millis() as u64)
            .query_async(&mut conn)
            .await
            .map_err(|e| LockError::Backend(e.to_string()))?;

        Ok(result.map(|_| nonce))
    }

    async fn release(&self, key: &str, nonce: &str) -> Result<bool, LockError> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|e| LockError::Backend(e.to_string()))?;

        let deleted: i64 = deadpool_redis::redis::cmd("EVAL")
            .arg(RELEASE_SCRIPT)
            .arg(1)
            .arg(Self::key_for(key))
            .arg(nonce)
            .query_async(&mut conn)
            .await
            .map_err(|e| LockError::Backend(e.to_string()))?;

        Ok(deleted == 1)
    }
}
