//! Database models - mapped from PostgreSQL tables

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::FromRow;
use uuid::Uuid;

use moneybee_domain::Transfer;
use moneybee_types::{Currency, RiskLevel, TransferStatus};

use crate::error::{DbError, DbResult};

/// Row shape of the `transfers` table
#[derive(Debug, Clone, FromRow)]
pub struct DbTransfer {
    pub id: Uuid,
    pub sender_id: Uuid,
    pub receiver_id: Uuid,
    pub sender_national_id: String,
    pub receiver_national_id: String,
    pub amount: Decimal,
    pub currency: String,
    pub amount_in_try: Decimal,
    pub exchange_rate: Option<Decimal>,
    pub transaction_fee: Decimal,
    pub transaction_code: String,
    pub status: String,
    pub risk_level: Option<String>,
    pub idempotency_key: Option<String>,
    pub approval_required_until: Option<DateTime<Utc>>,
    pub row_version: i64,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub cancellation_reason: Option<String>,
}

impl DbTransfer {
    /// Decode the row into the domain aggregate
    pub fn into_domain(self) -> DbResult<Transfer> {
        let currency: Currency = self
            .currency
            .parse()
            .map_err(|_| DbError::Decode(format!("currency: {}", self.currency)))?;
        let status: TransferStatus = self
            .status
            .parse()
            .map_err(|_| DbError::Decode(format!("status: {}", self.status)))?;
        let risk_level = match self.risk_level {
            Some(raw) => Some(
                raw.parse::<RiskLevel>()
                    .map_err(|_| DbError::Decode(format!("risk_level: {}", raw)))?,
            ),
            None => None,
        };

        Ok(Transfer {
            id: self.id,
            sender_id: self.sender_id,
            receiver_id: self.receiver_id,
            sender_national_id: self.sender_national_id,
            receiver_national_id: self.receiver_national_id,
            amount: self.amount,
            currency,
            amount_in_try: self.amount_in_try,
            exchange_rate: self.exchange_rate,
            transaction_fee: self.transaction_fee,
            transaction_code: self.transaction_code,
            status,
            risk_level,
            idempotency_key: self.idempotency_key,
            approval_required_until: self.approval_required_until,
            row_version: self.row_version,
            description: self.description,
            created_at: self.created_at,
            completed_at: self.completed_at,
            cancelled_at: self.cancelled_at,
            cancellation_reason: self.cancellation_reason,
        })
    }
}
