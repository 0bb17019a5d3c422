//! MoneyBee Persistence Layer
//!
//! PostgreSQL holds the transfer rows; Redis carries the API-key validity
//! cache, the daily-limit locks, and the pub/sub transport behind the
//! event-bus port.
//!
//! # Repository Pattern
//!
//! The transfer repository exposes raw-SQL queries behind the
//! `TransferStore` port. Uniqueness of `transaction_code` and
//! `idempotency_key` and the `row_version` bump on every update are
//! enforced by the schema, not by callers.

pub mod bus;
pub mod cache;
pub mod config;
pub mod error;
pub mod lock;
pub mod models;
pub mod repos;

use deadpool_redis::{Config as RedisConfig, Pool as RedisPool, Runtime};
use sqlx::postgres::{PgPool, PgPoolOptions};
use tracing::info;

pub use bus::RedisEventBus;
pub use cache::CacheManager;
pub use config::DatabaseConfig;
pub use error::{DbError, DbResult};
pub use lock::RedisLock;
pub use models::DbTransfer;
pub use repos::TransferRepo;

/// Database connection pools
pub struct Database {
    /// PostgreSQL connection pool
    pub pg: PgPool,
    /// Redis connection pool
    pub redis: RedisPool,
    /// Bare Redis client, needed for pub/sub subscriptions
    redis_client: redis::Client,
}

/// Aggregate health of the two backends
#[derive(Debug, Clone, Copy)]
pub struct HealthStatus {
    pub postgres: bool,
    pub redis: bool,
    pub healthy: bool,
}

impl Database {
    /// Connect to PostgreSQL and Redis
    pub async fn connect(config: &DatabaseConfig) -> DbResult<Self> {
        info!("Connecting to PostgreSQL: {}", config.postgres_url_masked());

        let pg = PgPoolOptions::new()
            .max_connections(config.pg_max_connections)
            .min_connections(config.pg_min_connections)
            .acquire_timeout(std::time::Duration::from_secs(config.pg_acquire_timeout_secs))
            .connect(&config.postgres_url)
            .await
            .map_err(|e| DbError::Connection(format!("PostgreSQL: {}", e)))?;

        info!("Connected to PostgreSQL");

        info!("Connecting to Redis: {}", config.redis_url_masked());

        let redis_cfg = RedisConfig::from_url(&config.redis_url);
        let redis = redis_cfg
            .create_pool(Some(Runtime::Tokio1))
            .map_err(|e| DbError::Connection(format!("Redis: {}", e)))?;

        let mut conn = redis
            .get()
            .await
            .map_err(|e| DbError::Connection(format!("Redis pool: {}", e)))?;
        let _: String = deadpool_redis::redis::cmd("PING")
            .query_async(&mut *conn)
            .await
            .map_err(|e| DbError::Connection(format!("Redis ping: {}", e)))?;

        let redis_client = redis::Client::open(config.redis_url.as_str())
            .map_err(|e| DbError::Connection(format!("Redis client: {}", e)))?;

        info!("Connected to Redis");

        Ok(Self {
            pg,
            redis,
            redis_client,
        })
    }

    /// Run database migrations
    pub async fn migrate(&self) -> DbResult<()> {
        info!("Running database migrations...");
        sqlx::migrate!("./migrations")
            .run(&self.pg)
            .await
            .map_err(|e| DbError::Migration(e.to_string()))?;
        info!("Migrations complete");
        Ok(())
    }

    /// Health check for both backends
    pub async fn health_check(&self) -> DbResult<HealthStatus> {
        let pg_ok = sqlx::query("SELECT 1").fetch_one(&self.pg).await.is_ok();

        let redis_ok = async {
            let mut conn = self.redis.get().await.ok()?;
            let result: Result<String, _> = deadpool_redis::redis::cmd("PING")
                .query_async(&mut *conn)
                .await;
            result.ok()
        }
        .await
        .is_some();

        Ok(HealthStatus {
            postgres: pg_ok,
            redis: redis_ok,
            healthy: pg_ok && redis_ok,
        })
    }

    /// Transfer repository over the PostgreSQL pool
    pub fn transfer_repo(&self) -> TransferRepo {
        TransferRepo::new(self.pg.clone())
    }

    /// TTL cache over the Redis pool
    pub fn cache(&self) -> CacheManager {
        CacheManager::new(self.redis.clone())
    }

    /// Distributed lock over the Redis pool
    pub fn lock(&self) -> RedisLock {
        RedisLock::new(self.redis.clone())
    }

    /// Event-bus transport over Redis pub/sub
    pub fn event_bus(&self) -> RedisEventBus {
        RedisEventBus::new(self.redis.clone(), self.redis_client.clone())
    }
}
