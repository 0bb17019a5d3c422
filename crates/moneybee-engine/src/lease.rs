//! Lease acquisition with release on every exit path
//!
//! The daily-limit critical section runs under a distributed lock with a
//! short lease. `LeaseGuard` stamps the nonce handed out at acquire and
//! compare-and-deletes it on release; if the holding task unwinds without
//! reaching the explicit release, `Drop` spawns a best-effort release and
//! the lease expiry bounds the damage either way.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::sleep;
use tracing::warn;

use moneybee_domain::DistributedLock;
use moneybee_types::{MoneyBeeError, Result};

pub struct LeaseGuard {
    lock: Arc<dyn DistributedLock>,
    key: String,
    nonce: Option<String>,
}

impl LeaseGuard {
    /// Try to take `key` for `lease`, retrying with doubling backoff up to
    /// `attempts` tries. Surfaces `Unavailable` when the lock stays busy.
    pub async fn acquire(
        lock: Arc<dyn DistributedLock>,
        key: &str,
        lease: Duration,
        attempts: u32,
        base_delay: Duration,
    ) -> Result<Self> {
        let mut delay = base_delay;
        for attempt in 0..attempts.max(1) {
            let acquired = lock
                .acquire(key, lease)
                .await
                .map_err(|e| MoneyBeeError::unavailable(format!("lock backend: {}", e)))?;

            if let Some(nonce) = acquired {
                return Ok(Self {
                    lock,
                    key: key.to_string(),
                    nonce: Some(nonce),
                });
            }

            if attempt + 1 < attempts {
                sleep(delay).await;
                delay *= 2;
            }
        }

        Err(MoneyBeeError::unavailable("lock busy"))
    }

    /// Release the lease. A `false` from the backend means the lease had
    /// already expired and someone else holds the key now; that is logged
    /// and otherwise ignored; the version check on persist protects the
    /// data.
    pub async fn release(mut self) {
        if let Some(nonce) = self.nonce.take() {
            match self.lock.release(&self.key, &nonce).await {
                Ok(true) => {}
                Ok(false) => warn!(key = %self.key, "Lease expired before release"),
                Err(e) => warn!(key = %self.key, error = %e, "Lease release failed"),
            }
        }
    }
}

impl Drop for LeaseGuard {
    fn drop(&mut self) {
        // reached only when the holder unwound before the explicit release
        if let Some(nonce) = self.nonce.take() {
            let lock = self.lock.clone();
            let key = self.key.clone();
            if let Ok(handle) = tokio::runtime::Handle::try_current() {
                handle.spawn(async move {
                    let _ = lock.release(&key, &nonce).await;
                });
            }
        }
    }
}
