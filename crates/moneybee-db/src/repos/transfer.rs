//! Transfer repository
//!
//! Implements the `TransferStore` port over PostgreSQL. Unique violations
//! are classified by constraint name so the engine can distinguish a lost
//! idempotency race from a transaction-code collision.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use moneybee_domain::{StoreError, Transfer, TransferStore};

use crate::models::DbTransfer;

pub struct TransferRepo {
    pool: PgPool,
}

impl TransferRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn classify(err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.is_unique_violation() {
            return match db_err.constraint() {
                Some("ux_transfers_idempotency_key") => StoreError::DuplicateIdempotencyKey,
                Some("ux_transfers_transaction_code") => StoreError::DuplicateTransactionCode,
                other => StoreError::Backend(format!("unique violation on {:?}", other)),
            };
        }
    }
    StoreError::Backend(err.to_string())
}

fn decode(row: DbTransfer) -> Result<Transfer, StoreError> {
    row.into_domain()
        .map_err(|e| StoreError::Backend(e.to_string()))
}

#[async_trait]
impl TransferStore for TransferRepo {
    async fn insert(&self, transfer: &Transfer) -> Result<Transfer, StoreError> {
        let row = sqlx::query_as::<_, DbTransfer>(
            r#"
            INSERT INTO transfers (id, sender_id, receiver_id, sender_national_id,
                receiver_national_id, amount, currency, amount_in_try, exchange_rate,
                transaction_fee, transaction_code, status, risk_level, idempotency_key,
                approval_required_until, row_version, description, created_at,
                completed_at, cancelled_at, cancellation_reason)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14,
                $15, 0, $16, $17, $18, $19, $20)
            RETURNING *
            "#,
        )
        .bind(transfer.id)
        .bind(transfer.sender_id)
        .bind(transfer.receiver_id)
        .bind(&transfer.sender_national_id)
        .bind(&transfer.receiver_national_id)
        .bind(transfer.amount)
        .bind(transfer.currency.code())
        .bind(transfer.amount_in_try)
        .bind(transfer.exchange_rate)
        .bind(transfer.transaction_fee)
        .bind(&transfer.transaction_code)
        .bind(transfer.status.as_str())
        .bind(transfer.risk_level.map(|r| r.as_str()))
        .bind(&transfer.idempotency_key)
        .bind(transfer.approval_required_until)
        .bind(&transfer.description)
        .bind(transfer.created_at)
        .bind(transfer.completed_at)
        .bind(transfer.cancelled_at)
        .bind(&transfer.cancellation_reason)
        .fetch_one(&self.pool)
        .await
        .map_err(classify)?;

        decode(row)
    }

    async fn update_transition(&self, transfer: &Transfer) -> Result<Transfer, StoreError> {
        let row = sqlx::query_as::<_, DbTransfer>(
            r#"
            UPDATE transfers
            SET status = $2, completed_at = $3, cancelled_at = $4,
                cancellation_reason = $5, row_version = row_version + 1
            WHERE id = $1 AND row_version = $6
            RETURNING *
            "#,
        )
        .bind(transfer.id)
        .bind(transfer.status.as_str())
        .bind(transfer.completed_at)
        .bind(transfer.cancelled_at)
        .bind(&transfer.cancellation_reason)
        .bind(transfer.row_version)
        .fetch_optional(&self.pool)
        .await
        .map_err(classify)?;

        match row {
            Some(row) => decode(row),
            None => Err(StoreError::VersionConflict),
        }
    }

    async fn find_by_code(&self, code: &str) -> Result<Option<Transfer>, StoreError> {
        let row = sqlx::query_as::<_, DbTransfer>(
            "SELECT * FROM transfers WHERE transaction_code = $1",
        )
        .bind(code)
        .fetch_optional(&self.pool)
        .await
        .map_err(classify)?;

        row.map(decode).transpose()
    }

    async fn find_by_idempotency_key(&self, key: &str) -> Result<Option<Transfer>, StoreError> {
        let row = sqlx::query_as::<_, DbTransfer>(
            "SELECT * FROM transfers WHERE idempotency_key = $1",
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await
        .map_err(classify)?;

        row.map(decode).transpose()
    }

    async fn code_exists(&self, code: &str) -> Result<bool, StoreError> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM transfers WHERE transaction_code = $1)",
        )
        .bind(code)
        .fetch_one(&self.pool)
        .await
        .map_err(classify)?;

        Ok(exists)
    }

    async fn daily_total_try(
        &self,
        sender_id: Uuid,
        since: DateTime<Utc>,
    ) -> Result<Decimal, StoreError> {
        let total: Decimal = sqlx::query_scalar(
            r#"
            SELECT COALESCE(SUM(amount_in_try), 0)
            FROM transfers
            WHERE sender_id = $1
              AND created_at >= $2
              AND status IN ('pending', 'completed')
            "#,
        )
        .bind(sender_id)
        .bind(since)
        .fetch_one(&self.pool)
        .await
        .map_err(classify)?;

        Ok(total)
    }

    async fn list_for_customer(
        &self,
        customer_id: Uuid,
        limit: i64,
    ) -> Result<Vec<Transfer>, StoreError> {
        let rows = sqlx::query_as::<_, DbTransfer>(
            r#"
            SELECT * FROM transfers
            WHERE sender_id = $1 OR receiver_id = $1
            ORDER BY created_at DESC
            LIMIT $2
            "#,
        )
        .bind(customer_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(classify)?;

        rows.into_iter().map(decode).collect()
    }

    async fn pending_for_customer(&self, customer_id: Uuid) -> Result<Vec<Transfer>, StoreError> {
        let rows = sqlx::query_as::<_, DbTransfer>(
            r#"
            SELECT * FROM transfers
            WHERE (sender_id = $1 OR receiver_id = $1) AND status = 'pending'
            ORDER BY created_at
            "#,
        )
        .bind(customer_id)
        .fetch_all(&self.pool)
        .await
        .map_err(classify)?;

        rows.into_iter().map(decode).collect()
    }
}
