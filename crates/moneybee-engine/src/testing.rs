//! In-memory doubles for the capability ports
//!
//! The scenario tests in this crate and the tests of downstream crates
//! (reactor, API) run the real engine against these. `MemoryStore`
//! enforces the same uniqueness and version rules the SQL schema does,
//! and `MemoryLock` provides real mutual exclusion, so the concurrency
//! scenarios exercise the actual race handling.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rust_decimal::Decimal;
use uuid::Uuid;

use moneybee_domain::{
    CollaboratorError, CustomerDirectory, CustomerRecord, DistributedLock, EventPublisher,
    FraudCheckRequest, FraudScreen, LockError, PublishError, RateSource, StoreError, Transfer,
    TransferStore,
};
use moneybee_types::{Currency, CustomerStatus, RiskLevel, TransferEvent, TransferStatus};

// ============================================================================
// Store
// ============================================================================

#[derive(Default)]
pub struct MemoryStore {
    rows: Mutex<Vec<Transfer>>,
}

impl MemoryStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn all(&self) -> Vec<Transfer> {
        self.rows.lock().clone()
    }

    pub fn get(&self, code: &str) -> Option<Transfer> {
        self.rows
            .lock()
            .iter()
            .find(|t| t.transaction_code == code)
            .cloned()
    }

    /// Test hook: rewind an approval hold so completion can proceed
    pub fn expire_approval(&self, code: &str) {
        let mut rows = self.rows.lock();
        if let Some(t) = rows.iter_mut().find(|t| t.transaction_code == code) {
            t.approval_required_until = Some(Utc::now() - chrono::Duration::seconds(1));
        }
    }

    /// Test hook: bump the stored version to force one conflict
    pub fn bump_version(&self, code: &str) {
        let mut rows = self.rows.lock();
        if let Some(t) = rows.iter_mut().find(|t| t.transaction_code == code) {
            t.row_version += 1;
        }
    }
}

#[async_trait]
impl TransferStore for MemoryStore {
    async fn insert(&self, transfer: &Transfer) -> Result<Transfer, StoreError> {
        let mut rows = self.rows.lock();

        if let Some(key) = transfer.idempotency_key.as_deref() {
            if rows.iter().any(|t| t.idempotency_key.as_deref() == Some(key)) {
                return Err(StoreError::DuplicateIdempotencyKey);
            }
        }
        if rows
            .iter()
            .any(|t| t.transaction_code == transfer.transaction_code)
        {
            return Err(StoreError::DuplicateTransactionCode);
        }

        let mut stored = transfer.clone();
        stored.row_version = 0;
        rows.push(stored.clone());
        Ok(stored)
    }

    async fn update_transition(&self, transfer: &Transfer) -> Result<Transfer, StoreError> {
        let mut rows = self.rows.lock();
        let row = rows
            .iter_mut()
            .find(|t| t.id == transfer.id)
            .ok_or(StoreError::NotFound)?;

        if row.row_version != transfer.row_version {
            return Err(StoreError::VersionConflict);
        }

        let mut updated = transfer.clone();
        updated.row_version += 1;
        *row = updated.clone();
        Ok(updated)
    }

    async fn find_by_code(&self, code: &str) -> Result<Option<Transfer>, StoreError> {
        Ok(self.get(code))
    }

    async fn find_by_idempotency_key(&self, key: &str) -> Result<Option<Transfer>, StoreError> {
        Ok(self
            .rows
            .lock()
            .iter()
            .find(|t| t.idempotency_key.as_deref() == Some(key))
            .cloned())
    }

    async fn code_exists(&self, code: &str) -> Result<bool, StoreError> {
        Ok(self.get(code).is_some())
    }

    async fn daily_total_try(
        &self,
        sender_id: Uuid,
        since: DateTime<Utc>,
    ) -> Result<Decimal, StoreError> {
        Ok(self
            .rows
            .lock()
            .iter()
            .filter(|t| {
                t.sender_id == sender_id
                    && t.created_at >= since
                    && matches!(
                        t.status,
                        TransferStatus::Pending | TransferStatus::Completed
                    )
            })
            .map(|t| t.amount_in_try)
            .sum())
    }

    async fn list_for_customer(
        &self,
        customer_id: Uuid,
        limit: i64,
    ) -> Result<Vec<Transfer>, StoreError> {
        let mut matching: Vec<Transfer> = self
            .rows
            .lock()
            .iter()
            .filter(|t| t.sender_id == customer_id || t.receiver_id == customer_id)
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        matching.truncate(limit as usize);
        Ok(matching)
    }

    async fn pending_for_customer(&self, customer_id: Uuid) -> Result<Vec<Transfer>, StoreError> {
        Ok(self
            .rows
            .lock()
            .iter()
            .filter(|t| {
                (t.sender_id == customer_id || t.receiver_id == customer_id)
                    && t.status == TransferStatus::Pending
            })
            .cloned()
            .collect())
    }
}

// ============================================================================
// Lock
// ============================================================================

#[derive(Default)]
pub struct MemoryLock {
    held: Mutex<HashMap<String, (String, Instant)>>,
}

impl MemoryLock {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }
}

#[async_trait]
impl DistributedLock for MemoryLock {
    async fn acquire(&self, key: &str, lease: Duration) -> Result<Option<String>, LockError> {
        let mut held = self.held.lock();
        let now = Instant::now();

        if let Some((_, expires)) = held.get(key) {
            if *expires > now {
                return Ok(None);
            }
        }

        let nonce = Uuid::new_v4().to_string();
        held.insert(key.to_string(), (nonce.clone(), now + lease));
        Ok(Some(nonce))
    }

    async fn release(&self, key: &str, nonce: &str) -> Result<bool, LockError> {
        let mut held = self.held.lock();
        match held.get(key) {
            Some((held_nonce, _)) if held_nonce == nonce => {
                held.remove(key);
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

// ============================================================================
// Publisher
// ============================================================================

#[derive(Default)]
pub struct MemoryPublisher {
    events: Mutex<Vec<TransferEvent>>,
    broken: Mutex<bool>,
}

impl MemoryPublisher {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn events(&self) -> Vec<TransferEvent> {
        self.events.lock().clone()
    }

    pub fn count(&self, routing_key: &str) -> usize {
        self.events
            .lock()
            .iter()
            .filter(|e| e.routing_key() == routing_key)
            .count()
    }

    /// Test hook: make every publish fail until restored
    pub fn set_broken(&self, broken: bool) {
        *self.broken.lock() = broken;
    }
}

#[async_trait]
impl EventPublisher for MemoryPublisher {
    async fn publish(&self, event: &TransferEvent) -> Result<(), PublishError> {
        if *self.broken.lock() {
            return Err(PublishError::Bus("bus unreachable".to_string()));
        }
        self.events.lock().push(event.clone());
        Ok(())
    }
}

// ============================================================================
// Collaborator stubs
// ============================================================================

#[derive(Default)]
pub struct StubCustomers {
    by_national_id: Mutex<HashMap<String, CustomerRecord>>,
}

impl StubCustomers {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn insert(&self, record: CustomerRecord) {
        self.by_national_id
            .lock()
            .insert(record.national_id.clone(), record);
    }

    /// Register an active, KYC-verified customer and return its id
    pub fn active(&self, national_id: &str) -> Uuid {
        self.with_status(national_id, CustomerStatus::Active)
    }

    pub fn with_status(&self, national_id: &str, status: CustomerStatus) -> Uuid {
        let id = Uuid::new_v4();
        self.insert(CustomerRecord {
            id,
            national_id: national_id.to_string(),
            status,
            kyc_verified: true,
        });
        id
    }
}

#[async_trait]
impl CustomerDirectory for StubCustomers {
    async fn get_by_national_id(
        &self,
        national_id: &str,
    ) -> Result<Option<CustomerRecord>, CollaboratorError> {
        Ok(self.by_national_id.lock().get(national_id).cloned())
    }
}

pub struct StubFraud {
    verdict: Mutex<RiskLevel>,
}

impl StubFraud {
    pub fn new(verdict: RiskLevel) -> Arc<Self> {
        Arc::new(Self {
            verdict: Mutex::new(verdict),
        })
    }

    pub fn set(&self, verdict: RiskLevel) {
        *self.verdict.lock() = verdict;
    }
}

#[async_trait]
impl FraudScreen for StubFraud {
    async fn check(&self, _request: &FraudCheckRequest) -> Result<RiskLevel, CollaboratorError> {
        Ok(*self.verdict.lock())
    }
}

#[derive(Default)]
pub struct StubRates {
    rates: Mutex<HashMap<(Currency, Currency), Decimal>>,
}

impl StubRates {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_rate(&self, from: Currency, to: Currency, rate: Decimal) {
        self.rates.lock().insert((from, to), rate);
    }
}

#[async_trait]
impl RateSource for StubRates {
    async fn get_rate(&self, from: Currency, to: Currency) -> Result<Decimal, CollaboratorError> {
        self.rates
            .lock()
            .get(&(from, to))
            .copied()
            .ok_or(CollaboratorError::Unavailable {
                service: "exchange rate service",
                detail: "no rate configured".to_string(),
            })
    }
}
