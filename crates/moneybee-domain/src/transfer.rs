//! The `Transfer` aggregate
//!
//! A transfer is created `Pending` (or `Failed` when fraud rejects it at
//! the door) and reaches at most one of the terminal states through the
//! transition methods here. The persistence layer stamps `row_version`;
//! writers on the Complete/Cancel paths re-submit the version they read.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use moneybee_types::{Currency, MoneyBeeError, Result, RiskLevel, TransferStatus};

/// Inputs shared by both creation outcomes, assembled by the engine after
/// customer resolution and FX normalization
#[derive(Debug, Clone)]
pub struct TransferDraft {
    pub sender_id: Uuid,
    pub receiver_id: Uuid,
    pub sender_national_id: String,
    pub receiver_national_id: String,
    pub amount: Decimal,
    pub currency: Currency,
    pub amount_in_try: Decimal,
    pub exchange_rate: Option<Decimal>,
    pub description: Option<String>,
    pub idempotency_key: String,
}

/// A single send-with-code-pickup record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transfer {
    pub id: Uuid,
    pub sender_id: Uuid,
    pub receiver_id: Uuid,
    /// Snapshot of the sender's natural identifier at creation
    pub sender_national_id: String,
    /// Snapshot used for receiver identity verification at pickup
    pub receiver_national_id: String,
    /// Requested amount in the requested currency
    pub amount: Decimal,
    pub currency: Currency,
    /// Normalized amount used for limit and fraud decisions
    pub amount_in_try: Decimal,
    /// Present iff `currency != TRY`; frozen at creation
    pub exchange_rate: Option<Decimal>,
    /// Fee in TRY; zero for `Failed` creations
    pub transaction_fee: Decimal,
    /// 10-character `[A-Z0-9]` pickup code, globally unique
    pub transaction_code: String,
    pub status: TransferStatus,
    /// Fraud verdict captured at creation; absent only on rows older
    /// than this field
    pub risk_level: Option<RiskLevel>,
    /// Globally unique across all non-null values
    pub idempotency_key: Option<String>,
    /// Completion is refused before this instant (high-value holds)
    pub approval_required_until: Option<DateTime<Utc>>,
    /// Row version stamped by the store on every write
    pub row_version: i64,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub cancellation_reason: Option<String>,
}

impl Transfer {
    /// Assemble a `Pending` transfer that passed every admission gate
    #[allow(clippy::too_many_arguments)]
    pub fn pending(
        draft: TransferDraft,
        transaction_code: String,
        transaction_fee: Decimal,
        risk_level: RiskLevel,
        approval_required_until: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            sender_id: draft.sender_id,
            receiver_id: draft.receiver_id,
            sender_national_id: draft.sender_national_id,
            receiver_national_id: draft.receiver_national_id,
            amount: draft.amount,
            currency: draft.currency,
            amount_in_try: draft.amount_in_try,
            exchange_rate: draft.exchange_rate,
            transaction_fee,
            transaction_code,
            status: TransferStatus::Pending,
            risk_level: Some(risk_level),
            idempotency_key: Some(draft.idempotency_key),
            approval_required_until,
            row_version: 0,
            description: draft.description,
            created_at: now,
            completed_at: None,
            cancelled_at: None,
            cancellation_reason: None,
        }
    }

    /// Record a creation the fraud gate rejected. The row is terminal from
    /// birth and owes no fee.
    pub fn failed(draft: TransferDraft, transaction_code: String, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            sender_id: draft.sender_id,
            receiver_id: draft.receiver_id,
            sender_national_id: draft.sender_national_id,
            receiver_national_id: draft.receiver_national_id,
            amount: draft.amount,
            currency: draft.currency,
            amount_in_try: draft.amount_in_try,
            exchange_rate: draft.exchange_rate,
            transaction_fee: Decimal::ZERO,
            transaction_code,
            status: TransferStatus::Failed,
            risk_level: Some(RiskLevel::High),
            idempotency_key: Some(draft.idempotency_key),
            approval_required_until: None,
            row_version: 0,
            description: draft.description,
            created_at: now,
            completed_at: None,
            cancelled_at: None,
            cancellation_reason: None,
        }
    }

    /// Minutes left on the approval hold, rounded up; `None` when no hold
    /// applies or it has elapsed
    pub fn approval_wait_remaining(&self, now: DateTime<Utc>) -> Option<i64> {
        let until = self.approval_required_until?;
        if until <= now {
            return None;
        }
        let secs = (until - now).num_seconds().max(1);
        Some((secs + 59) / 60)
    }

    /// Transition to `Completed` for the verified receiver
    pub fn complete(&mut self, presented_national_id: &str, now: DateTime<Utc>) -> Result<()> {
        if self.status != TransferStatus::Pending {
            return Err(MoneyBeeError::failed_precondition(format!(
                "status={}",
                self.status
            )));
        }
        if self.receiver_national_id != presented_national_id {
            return Err(MoneyBeeError::permission_denied(
                "receiver verification failed",
            ));
        }
        if let Some(minutes) = self.approval_wait_remaining(now) {
            return Err(MoneyBeeError::failed_precondition(format!(
                "wait {} more minute(s)",
                minutes
            )));
        }
        self.status = TransferStatus::Completed;
        self.completed_at = Some(now);
        Ok(())
    }

    /// Transition to `Cancelled`; the reason distinguishes user cancels
    /// from system cascades
    pub fn cancel(&mut self, reason: Option<String>, now: DateTime<Utc>) -> Result<()> {
        if self.status != TransferStatus::Pending {
            return Err(MoneyBeeError::failed_precondition(format!(
                "status={}",
                self.status
            )));
        }
        self.status = TransferStatus::Cancelled;
        self.cancelled_at = Some(now);
        self.cancellation_reason = reason;
        Ok(())
    }
}
