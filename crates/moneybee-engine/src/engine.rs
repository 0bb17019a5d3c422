//! Transfer lifecycle operations
//!
//! Creation runs the admission pipeline in a fixed order: idempotency,
//! customer resolution, FX normalization, then the daily-limit gate,
//! fraud verdict, and persist inside one lock lease so the
//! read-modify-write window on the daily total stays closed. Completion
//! and cancellation are optimistic-concurrency transitions with a bounded
//! in-process retry.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, NaiveTime, Utc};
use rust_decimal::Decimal;
use tokio::time::sleep;
use tracing::{error, info};
use uuid::Uuid;

use moneybee_domain::{
    generate_transaction_code, round2, CollaboratorError, CustomerDirectory, CustomerRecord,
    DistributedLock, EnginePolicy, EventPublisher, FraudCheckRequest, FraudScreen, RateSource,
    StoreError, Transfer, TransferDraft, TransferStore,
};
use moneybee_types::{
    Currency, CustomerStatus, MoneyBeeError, Result, RiskLevel, TransferEvent, TransferStatus,
};

use crate::lease::LeaseGuard;

/// Customer listings return at most this many rows, most recent first
const LISTING_CAP: i64 = 50;

/// Pre-check draws before trusting the unique index alone
const CODE_PRECHECK_ATTEMPTS: u32 = 5;

/// Insert retries on an actual transaction-code collision
const CODE_INSERT_ATTEMPTS: u32 = 3;

/// Inputs to a send, as assembled by the API layer
#[derive(Debug, Clone)]
pub struct CreateTransferRequest {
    pub sender_national_id: String,
    pub receiver_national_id: String,
    pub amount: Decimal,
    pub currency: Currency,
    pub description: Option<String>,
}

/// Remaining headroom under the daily limit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DailyLimitStatus {
    pub total_today: Decimal,
    pub daily_limit: Decimal,
}

enum CreateOutcome {
    /// This call inserted the row
    Fresh(Transfer),
    /// A concurrent call with the same key won the insert race
    Replayed(Transfer),
}

pub struct TransferEngine {
    store: Arc<dyn TransferStore>,
    lock: Arc<dyn DistributedLock>,
    publisher: Arc<dyn EventPublisher>,
    customers: Arc<dyn CustomerDirectory>,
    fraud: Arc<dyn FraudScreen>,
    rates: Arc<dyn RateSource>,
    policy: EnginePolicy,
}

impl TransferEngine {
    pub fn new(
        store: Arc<dyn TransferStore>,
        lock: Arc<dyn DistributedLock>,
        publisher: Arc<dyn EventPublisher>,
        customers: Arc<dyn CustomerDirectory>,
        fraud: Arc<dyn FraudScreen>,
        rates: Arc<dyn RateSource>,
        policy: EnginePolicy,
    ) -> Self {
        Self {
            store,
            lock,
            publisher,
            customers,
            fraud,
            rates,
            policy,
        }
    }

    pub fn policy(&self) -> &EnginePolicy {
        &self.policy
    }

    // ========================================================================
    // Create
    // ========================================================================

    /// Create a transfer. Replaying a non-empty idempotency key returns
    /// the stored outcome (same id, code, and status) and emits nothing.
    pub async fn create(
        &self,
        req: CreateTransferRequest,
        idempotency_key: &str,
    ) -> Result<Transfer> {
        if idempotency_key.trim().is_empty() {
            return Err(MoneyBeeError::invalid_argument("idempotency key required"));
        }
        if req.amount <= Decimal::ZERO {
            return Err(MoneyBeeError::invalid_argument("amount must be positive"));
        }

        // fast path; the unique constraint at commit time is authoritative
        if let Some(existing) = self
            .store
            .find_by_idempotency_key(idempotency_key)
            .await
            .map_err(store_internal)?
        {
            return replay(existing);
        }

        let sender = self.resolve_sender(&req.sender_national_id).await?;
        let receiver = self.resolve_receiver(&req.receiver_national_id).await?;

        let (amount_in_try, exchange_rate) = self.normalize(req.amount, req.currency).await?;

        let draft = TransferDraft {
            sender_id: sender.id,
            receiver_id: receiver.id,
            sender_national_id: sender.national_id,
            receiver_national_id: receiver.national_id,
            amount: req.amount,
            currency: req.currency,
            amount_in_try,
            exchange_rate,
            description: req.description,
            idempotency_key: idempotency_key.to_string(),
        };

        let guard = LeaseGuard::acquire(
            self.lock.clone(),
            &daily_limit_key(draft.sender_id),
            self.policy.lock_lease,
            self.policy.lock_acquire_attempts,
            self.policy.concurrency_backoff_base,
        )
        .await?;

        // the lease is held through fraud and persist so no concurrent
        // create can read a stale daily total
        let outcome = self.admit_and_persist(draft).await;

        guard.release().await;

        match outcome? {
            CreateOutcome::Replayed(stored) => replay(stored),
            CreateOutcome::Fresh(transfer) if transfer.status == TransferStatus::Failed => {
                info!(
                    transfer_id = %transfer.id,
                    sender_id = %transfer.sender_id,
                    "Transfer rejected by fraud screening"
                );
                Err(MoneyBeeError::failed_precondition("high fraud risk"))
            }
            CreateOutcome::Fresh(transfer) => {
                info!(
                    transfer_id = %transfer.id,
                    sender_id = %transfer.sender_id,
                    amount_in_try = %transfer.amount_in_try,
                    "Transfer created"
                );
                self.publish(TransferEvent::TransferCreated {
                    transfer_id: transfer.id,
                    sender_id: transfer.sender_id,
                    receiver_id: transfer.receiver_id,
                    amount: transfer.amount,
                    currency: transfer.currency,
                })
                .await;
                Ok(transfer)
            }
        }
    }

    /// Everything that must happen inside the daily-limit lease
    async fn admit_and_persist(&self, draft: TransferDraft) -> Result<CreateOutcome> {
        let now = Utc::now();

        let total = self
            .store
            .daily_total_try(draft.sender_id, start_of_day(now))
            .await
            .map_err(store_internal)?;

        if total + draft.amount_in_try > self.policy.daily_limit_try {
            let remaining = (self.policy.daily_limit_try - total).max(Decimal::ZERO);
            return Err(MoneyBeeError::failed_precondition(format!(
                "daily limit exceeded; remaining={}",
                remaining
            )));
        }

        let risk = self
            .fraud
            .check(&FraudCheckRequest {
                sender_id: draft.sender_id,
                receiver_id: draft.receiver_id,
                amount_in_try: draft.amount_in_try,
                sender_national_id: draft.sender_national_id.clone(),
            })
            .await
            .map_err(map_collaborator)?;

        if risk == RiskLevel::High {
            let failed = Transfer::failed(draft, generate_transaction_code(), now);
            return self.insert_handling_uniques(failed).await;
        }

        let fee = self.policy.fees.fee_for(draft.amount_in_try);
        let approval_required_until = (draft.amount_in_try
            > self.policy.high_amount_threshold_try)
            .then(|| now + self.policy.approval_wait());

        let code = self.fresh_code().await?;
        let transfer = Transfer::pending(draft, code, fee, risk, approval_required_until, now);

        self.insert_handling_uniques(transfer).await
    }

    /// Persist, translating unique violations: an idempotency-key loss
    /// becomes a replay of the committed row, a code collision redraws.
    async fn insert_handling_uniques(&self, mut transfer: Transfer) -> Result<CreateOutcome> {
        for _ in 0..CODE_INSERT_ATTEMPTS {
            match self.store.insert(&transfer).await {
                Ok(stored) => return Ok(CreateOutcome::Fresh(stored)),
                Err(StoreError::DuplicateIdempotencyKey) => {
                    let key = transfer.idempotency_key.as_deref().unwrap_or_default();
                    let stored = self
                        .store
                        .find_by_idempotency_key(key)
                        .await
                        .map_err(store_internal)?
                        .ok_or_else(|| {
                            MoneyBeeError::internal(
                                "idempotency row missing after unique violation",
                            )
                        })?;
                    return Ok(CreateOutcome::Replayed(stored));
                }
                Err(StoreError::DuplicateTransactionCode) => {
                    transfer.transaction_code = generate_transaction_code();
                }
                Err(e) => return Err(store_internal(e)),
            }
        }
        Err(MoneyBeeError::internal(
            "could not allocate a unique transaction code",
        ))
    }

    /// Draw a code that does not collide with any stored one. Best
    /// effort: after the pre-check budget the unique index still decides.
    async fn fresh_code(&self) -> Result<String> {
        let mut code = generate_transaction_code();
        for _ in 0..CODE_PRECHECK_ATTEMPTS {
            if !self.store.code_exists(&code).await.map_err(store_internal)? {
                break;
            }
            code = generate_transaction_code();
        }
        Ok(code)
    }

    async fn resolve_sender(&self, national_id: &str) -> Result<CustomerRecord> {
        let sender = self
            .customers
            .get_by_national_id(national_id)
            .await
            .map_err(map_collaborator)?
            .ok_or_else(|| MoneyBeeError::not_found("sender not found"))?;

        if sender.status != CustomerStatus::Active {
            return Err(MoneyBeeError::failed_precondition("sender not active"));
        }
        if self.policy.require_kyc_verified && !sender.kyc_verified {
            return Err(MoneyBeeError::failed_precondition("sender not KYC verified"));
        }
        Ok(sender)
    }

    async fn resolve_receiver(&self, national_id: &str) -> Result<CustomerRecord> {
        let receiver = self
            .customers
            .get_by_national_id(national_id)
            .await
            .map_err(map_collaborator)?
            .ok_or_else(|| MoneyBeeError::not_found("receiver not found"))?;

        if receiver.status == CustomerStatus::Blocked {
            return Err(MoneyBeeError::failed_precondition("receiver blocked"));
        }
        Ok(receiver)
    }

    /// Freeze the FX rate and normalize to TRY, 2 decimals half-up
    async fn normalize(
        &self,
        amount: Decimal,
        currency: Currency,
    ) -> Result<(Decimal, Option<Decimal>)> {
        if !currency.needs_conversion() {
            return Ok((amount, None));
        }

        let rate = self
            .rates
            .get_rate(currency, Currency::TRY)
            .await
            .map_err(map_collaborator)?;

        if rate <= Decimal::ZERO {
            return Err(MoneyBeeError::internal(
                "exchange rate service returned a non-positive rate",
            ));
        }

        Ok((round2(amount * rate), Some(rate)))
    }

    // ========================================================================
    // Complete
    // ========================================================================

    /// Complete a transfer for the receiver presenting their national id
    /// at the counter.
    pub async fn complete(
        &self,
        transaction_code: &str,
        receiver_national_id: &str,
    ) -> Result<Transfer> {
        let mut attempt = 0u32;
        loop {
            let mut transfer = self.load_by_code(transaction_code).await?;
            transfer.complete(receiver_national_id, Utc::now())?;

            match self.store.update_transition(&transfer).await {
                Ok(updated) => {
                    info!(
                        transfer_id = %updated.id,
                        transaction_code = %updated.transaction_code,
                        "Transfer completed"
                    );
                    self.publish(TransferEvent::TransferCompleted {
                        transfer_id: updated.id,
                        transaction_code: updated.transaction_code.clone(),
                    })
                    .await;
                    return Ok(updated);
                }
                Err(StoreError::VersionConflict) => {
                    attempt = self.concurrency_backoff(attempt, "complete").await?;
                }
                Err(e) => return Err(store_internal(e)),
            }
        }
    }

    // ========================================================================
    // Cancel
    // ========================================================================

    /// Cancel a pending transfer. Downstream ledgers treat cancelled
    /// transfers as owing nothing, which realizes the fee refund.
    pub async fn cancel(&self, transaction_code: &str, reason: Option<String>) -> Result<Transfer> {
        let mut attempt = 0u32;
        loop {
            let mut transfer = self.load_by_code(transaction_code).await?;
            transfer.cancel(reason.clone(), Utc::now())?;

            match self.store.update_transition(&transfer).await {
                Ok(updated) => {
                    info!(
                        transfer_id = %updated.id,
                        reason = updated.cancellation_reason.as_deref().unwrap_or(""),
                        "Transfer cancelled"
                    );
                    self.publish(TransferEvent::TransferCancelled {
                        transfer_id: updated.id,
                        reason: updated.cancellation_reason.clone().unwrap_or_default(),
                    })
                    .await;
                    return Ok(updated);
                }
                Err(StoreError::VersionConflict) => {
                    attempt = self.concurrency_backoff(attempt, "cancel").await?;
                }
                Err(e) => return Err(store_internal(e)),
            }
        }
    }

    // ========================================================================
    // Reads
    // ========================================================================

    pub async fn get_by_code(&self, transaction_code: &str) -> Result<Transfer> {
        self.load_by_code(transaction_code).await
    }

    /// Most recent transfers touching the customer, capped at 50
    pub async fn customer_transfers(&self, customer_id: Uuid) -> Result<Vec<Transfer>> {
        self.store
            .list_for_customer(customer_id, LISTING_CAP)
            .await
            .map_err(store_internal)
    }

    /// Today's Pending+Completed outgoing total against the limit
    pub async fn daily_limit(&self, customer_id: Uuid) -> Result<DailyLimitStatus> {
        let total_today = self
            .store
            .daily_total_try(customer_id, start_of_day(Utc::now()))
            .await
            .map_err(store_internal)?;

        Ok(DailyLimitStatus {
            total_today,
            daily_limit: self.policy.daily_limit_try,
        })
    }

    // ========================================================================
    // Internals
    // ========================================================================

    async fn load_by_code(&self, transaction_code: &str) -> Result<Transfer> {
        self.store
            .find_by_code(transaction_code)
            .await
            .map_err(store_internal)?
            .ok_or_else(|| MoneyBeeError::not_found("transfer not found"))
    }

    /// Sleep out one optimistic-concurrency conflict; errors out once the
    /// retry budget is spent.
    async fn concurrency_backoff(&self, attempt: u32, operation: &str) -> Result<u32> {
        if attempt >= self.policy.concurrency_retry_attempts {
            return Err(MoneyBeeError::aborted("concurrent modification"));
        }
        tracing::debug!(operation, attempt, "Concurrency conflict, retrying");
        sleep(backoff_delay(self.policy.concurrency_backoff_base, attempt)).await;
        Ok(attempt + 1)
    }

    /// Post-commit publish. A failure never rolls back the commit; the
    /// committed id is logged so an operator can republish.
    async fn publish(&self, event: TransferEvent) {
        if let Err(e) = self.publisher.publish(&event).await {
            error!(
                transfer_id = %event.transfer_id(),
                routing_key = event.routing_key(),
                error = %e,
                "Event publish failed after commit; republish required"
            );
        }
    }
}

/// The stored outcome of an earlier call with the same key: a Failed row
/// re-fails with its deterministic reason, everything else is returned
/// as-is with no side effects.
fn replay(stored: Transfer) -> Result<Transfer> {
    if stored.status == TransferStatus::Failed {
        return Err(MoneyBeeError::failed_precondition("high fraud risk"));
    }
    Ok(stored)
}

fn daily_limit_key(sender_id: Uuid) -> String {
    format!("daily-limit:{}", sender_id)
}

fn start_of_day(now: DateTime<Utc>) -> DateTime<Utc> {
    now.date_naive().and_time(NaiveTime::MIN).and_utc()
}

fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    base * 2u32.saturating_pow(attempt)
}

fn store_internal(err: StoreError) -> MoneyBeeError {
    MoneyBeeError::internal(format!("transfer store: {}", err))
}

fn map_collaborator(err: CollaboratorError) -> MoneyBeeError {
    match err {
        CollaboratorError::Timeout { .. } | CollaboratorError::Unavailable { .. } => {
            MoneyBeeError::unavailable(err.to_string())
        }
        CollaboratorError::Contract { .. } => MoneyBeeError::internal(err.to_string()),
    }
}
