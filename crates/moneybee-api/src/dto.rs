//! Request and response DTOs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use moneybee_domain::Transfer;
use moneybee_engine::DailyLimitStatus;
use moneybee_types::{Currency, RiskLevel, TransferStatus};

/// Response envelope used by every endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub message: Option<String>,
    pub errors: Option<Vec<String>>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
            errors: None,
        }
    }

    pub fn ok_with_message(data: T, message: impl Into<String>) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: Some(message.into()),
            errors: None,
        }
    }

    pub fn error(message: impl Into<String>, errors: Vec<String>) -> Self {
        Self {
            success: false,
            data: None,
            message: Some(message.into()),
            errors: Some(errors),
        }
    }
}

/// Body of `POST /api/transfers`
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateTransferBody {
    #[validate(length(equal = 11, message = "must be 11 digits"))]
    pub sender_national_id: String,
    #[validate(length(equal = 11, message = "must be 11 digits"))]
    pub receiver_national_id: String,
    pub amount: Decimal,
    pub currency: Currency,
    #[validate(length(max = 200, message = "at most 200 characters"))]
    pub description: Option<String>,
}

/// Body of `POST /api/transfers/{code}/complete`.
///
/// The presented id is deliberately not shape-validated here: identity
/// verification is a pure equality check against the stored snapshot,
/// so a malformed value is simply a non-matching one and must surface
/// as the same verification failure.
#[derive(Debug, Clone, Deserialize)]
pub struct CompleteTransferBody {
    pub receiver_national_id: String,
}

/// Body of `POST /api/transfers/{code}/cancel`. The reason is free text.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct CancelTransferBody {
    pub reason: Option<String>,
}

/// Body of `POST /api/transfers/reconcile/{customer_id}`
#[derive(Debug, Clone, Deserialize, Default, Validate)]
pub struct ReconcileBody {
    #[validate(length(max = 200, message = "at most 200 characters"))]
    pub reason: Option<String>,
}

/// A transfer as returned to callers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferView {
    pub id: Uuid,
    pub sender_id: Uuid,
    pub receiver_id: Uuid,
    pub amount: Decimal,
    pub currency: Currency,
    pub amount_in_try: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exchange_rate: Option<Decimal>,
    pub transaction_fee: Decimal,
    pub transaction_code: String,
    pub status: TransferStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub risk_level: Option<RiskLevel>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub approval_required_until: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cancelled_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cancellation_reason: Option<String>,
}

impl From<Transfer> for TransferView {
    fn from(t: Transfer) -> Self {
        Self {
            id: t.id,
            sender_id: t.sender_id,
            receiver_id: t.receiver_id,
            amount: t.amount,
            currency: t.currency,
            amount_in_try: t.amount_in_try,
            exchange_rate: t.exchange_rate,
            transaction_fee: t.transaction_fee,
            transaction_code: t.transaction_code,
            status: t.status,
            risk_level: t.risk_level,
            approval_required_until: t.approval_required_until,
            description: t.description,
            created_at: t.created_at,
            completed_at: t.completed_at,
            cancelled_at: t.cancelled_at,
            cancellation_reason: t.cancellation_reason,
        }
    }
}

/// `GET /api/transfers/daily-limit/{customer_id}` payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyLimitView {
    pub total_today: Decimal,
    pub daily_limit: Decimal,
}

impl From<DailyLimitStatus> for DailyLimitView {
    fn from(s: DailyLimitStatus) -> Self {
        Self {
            total_today: s.total_today,
            daily_limit: s.daily_limit,
        }
    }
}

/// Result of a manual reconciliation sweep
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconcileView {
    pub cancelled: usize,
}
