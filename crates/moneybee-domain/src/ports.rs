//! Capability ports
//!
//! Narrow interfaces between the engine and the world. Production
//! implementations live in `moneybee-db` (store, lock, bus) and
//! `moneybee-clients` (collaborator HTTP); the engine's scenario tests run
//! against in-memory doubles of the same traits.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

use moneybee_types::{Currency, CustomerStatus, RiskLevel, TransferEvent};

use crate::transfer::Transfer;

// ============================================================================
// Store
// ============================================================================

/// Failures a transfer store can report. Unique violations are classified
/// so the engine can turn a lost idempotency race into a replay and a code
/// collision into a regeneration.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("idempotency key already used")]
    DuplicateIdempotencyKey,

    #[error("transaction code already used")]
    DuplicateTransactionCode,

    #[error("row version conflict")]
    VersionConflict,

    #[error("transfer not found")]
    NotFound,

    #[error("store backend error: {0}")]
    Backend(String),
}

/// Persistence for the transfer aggregate
#[async_trait]
pub trait TransferStore: Send + Sync {
    /// Persist a new row. The store enforces uniqueness of
    /// `transaction_code` and (where non-null) `idempotency_key` as hard
    /// constraints and returns the row with its first version stamp.
    async fn insert(&self, transfer: &Transfer) -> Result<Transfer, StoreError>;

    /// Write a Complete/Cancel transition. The `row_version` carried by
    /// `transfer` must still match the stored row; a mismatch is
    /// `VersionConflict` and mutates nothing.
    async fn update_transition(&self, transfer: &Transfer) -> Result<Transfer, StoreError>;

    async fn find_by_code(&self, code: &str) -> Result<Option<Transfer>, StoreError>;

    async fn find_by_idempotency_key(&self, key: &str) -> Result<Option<Transfer>, StoreError>;

    /// Best-effort collision pre-check for freshly drawn codes
    async fn code_exists(&self, code: &str) -> Result<bool, StoreError>;

    /// Sum of `amount_in_try` over Pending and Completed transfers sent by
    /// `sender_id` since `since`
    async fn daily_total_try(
        &self,
        sender_id: Uuid,
        since: DateTime<Utc>,
    ) -> Result<Decimal, StoreError>;

    /// Most recent transfers where the customer is sender or receiver
    async fn list_for_customer(
        &self,
        customer_id: Uuid,
        limit: i64,
    ) -> Result<Vec<Transfer>, StoreError>;

    /// Pending transfers where the customer is sender or receiver, for
    /// cascade cancellation
    async fn pending_for_customer(&self, customer_id: Uuid) -> Result<Vec<Transfer>, StoreError>;
}

// ============================================================================
// Distributed lock
// ============================================================================

#[derive(Debug, Error)]
pub enum LockError {
    #[error("lock backend error: {0}")]
    Backend(String),
}

/// Advisory mutex over a named key with a lease
#[async_trait]
pub trait DistributedLock: Send + Sync {
    /// Atomic set-if-absent with lease. Returns the holder nonce on
    /// success, `None` when another holder has the key.
    async fn acquire(&self, key: &str, lease: Duration) -> Result<Option<String>, LockError>;

    /// Compare-and-delete on the nonce stamped at acquire. Returns false
    /// when the lease had already expired and was taken over.
    async fn release(&self, key: &str, nonce: &str) -> Result<bool, LockError>;
}

// ============================================================================
// Event publishing
// ============================================================================

#[derive(Debug, Error)]
pub enum PublishError {
    #[error("event bus error: {0}")]
    Bus(String),
}

/// Outbound side of the `moneybee.events` exchange. Delivery is
/// at-least-once; consumers de-duplicate.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(&self, event: &TransferEvent) -> Result<(), PublishError>;
}

// ============================================================================
// Collaborators
// ============================================================================

/// Failures crossing a collaborator boundary. Transient transport
/// problems surface to callers as `Unavailable`, contract violations as
/// `Internal`.
#[derive(Debug, Clone, Error)]
pub enum CollaboratorError {
    #[error("{service} timed out")]
    Timeout { service: &'static str },

    #[error("{service} unavailable: {detail}")]
    Unavailable {
        service: &'static str,
        detail: String,
    },

    #[error("{service} violated its contract: {detail}")]
    Contract {
        service: &'static str,
        detail: String,
    },
}

/// Customer as the customer bounded context reports it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomerRecord {
    pub id: Uuid,
    pub national_id: String,
    pub status: CustomerStatus,
    pub kyc_verified: bool,
}

#[async_trait]
pub trait CustomerDirectory: Send + Sync {
    async fn get_by_national_id(
        &self,
        national_id: &str,
    ) -> Result<Option<CustomerRecord>, CollaboratorError>;
}

/// Inputs to the fraud verdict
#[derive(Debug, Clone)]
pub struct FraudCheckRequest {
    pub sender_id: Uuid,
    pub receiver_id: Uuid,
    pub amount_in_try: Decimal,
    pub sender_national_id: String,
}

#[async_trait]
pub trait FraudScreen: Send + Sync {
    async fn check(&self, request: &FraudCheckRequest) -> Result<RiskLevel, CollaboratorError>;
}

#[async_trait]
pub trait RateSource: Send + Sync {
    async fn get_rate(&self, from: Currency, to: Currency) -> Result<Decimal, CollaboratorError>;
}

/// The Auth collaborator's validate endpoint
#[async_trait]
pub trait KeyValidator: Send + Sync {
    async fn validate(&self, api_key: &str) -> Result<bool, CollaboratorError>;
}
