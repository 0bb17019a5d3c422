//! Engine scenario tests
//!
//! The real engine wired to in-memory ports: the store enforces the same
//! uniqueness and version rules the SQL schema does and the lock gives
//! real mutual exclusion, so these exercise the engine's race handling,
//! not a simplification of it.

use std::sync::Arc;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use uuid::Uuid;

use moneybee_domain::{is_valid_transaction_code, EnginePolicy};
use moneybee_engine::testing::{
    MemoryLock, MemoryPublisher, MemoryStore, StubCustomers, StubFraud, StubRates,
};
use moneybee_engine::{CreateTransferRequest, TransferEngine};
use moneybee_types::{
    routing, Currency, CustomerStatus, MoneyBeeError, RiskLevel, TransferStatus,
};

const SENDER_NID: &str = "15054682652";
const RECEIVER_NID: &str = "98765432109";

struct Harness {
    engine: Arc<TransferEngine>,
    store: Arc<MemoryStore>,
    publisher: Arc<MemoryPublisher>,
    customers: Arc<StubCustomers>,
    fraud: Arc<StubFraud>,
    rates: Arc<StubRates>,
    sender_id: Uuid,
    receiver_id: Uuid,
}

impl Harness {
    fn new() -> Self {
        let store = MemoryStore::new();
        let lock = MemoryLock::new();
        let publisher = MemoryPublisher::new();
        let customers = StubCustomers::new();
        let fraud = StubFraud::new(RiskLevel::Low);
        let rates = StubRates::new();

        let sender_id = customers.active(SENDER_NID);
        let receiver_id = customers.active(RECEIVER_NID);

        let engine = Arc::new(TransferEngine::new(
            store.clone(),
            lock,
            publisher.clone(),
            customers.clone(),
            fraud.clone(),
            rates.clone(),
            EnginePolicy::default(),
        ));

        Self {
            engine,
            store,
            publisher,
            customers,
            fraud,
            rates,
            sender_id,
            receiver_id,
        }
    }

    fn request(&self, amount: Decimal, currency: Currency) -> CreateTransferRequest {
        CreateTransferRequest {
            sender_national_id: SENDER_NID.to_string(),
            receiver_national_id: RECEIVER_NID.to_string(),
            amount,
            currency,
            description: None,
        }
    }
}

// ============================================================================
// S1 / S2: happy path and idempotent replay
// ============================================================================

#[tokio::test]
async fn happy_send_and_complete_in_try() {
    let h = Harness::new();

    let transfer = h
        .engine
        .create(h.request(dec!(500), Currency::TRY), "k1")
        .await
        .unwrap();

    assert_eq!(transfer.status, TransferStatus::Pending);
    assert_eq!(transfer.transaction_fee, dec!(10.00));
    assert_eq!(transfer.amount_in_try, dec!(500));
    assert!(transfer.exchange_rate.is_none());
    assert!(transfer.approval_required_until.is_none());
    assert!(is_valid_transaction_code(&transfer.transaction_code));
    assert_eq!(transfer.risk_level, Some(RiskLevel::Low));

    let completed = h
        .engine
        .complete(&transfer.transaction_code, RECEIVER_NID)
        .await
        .unwrap();

    assert_eq!(completed.status, TransferStatus::Completed);
    assert!(completed.completed_at.is_some());

    assert_eq!(h.publisher.count(routing::TRANSFER_CREATED), 1);
    assert_eq!(h.publisher.count(routing::TRANSFER_COMPLETED), 1);
}

#[tokio::test]
async fn idempotent_replay_returns_stored_outcome() {
    let h = Harness::new();
    let req = h.request(dec!(500), Currency::TRY);

    let first = h.engine.create(req.clone(), "k1").await.unwrap();
    let replayed = h.engine.create(req, "k1").await.unwrap();

    assert_eq!(first.id, replayed.id);
    assert_eq!(first.transaction_code, replayed.transaction_code);
    assert_eq!(first.status, replayed.status);

    // no second write, no second event
    assert_eq!(h.store.all().len(), 1);
    assert_eq!(h.publisher.count(routing::TRANSFER_CREATED), 1);
}

// ============================================================================
// S3: high-value approval hold
// ============================================================================

#[tokio::test]
async fn high_value_transfer_waits_for_approval() {
    let h = Harness::new();

    let transfer = h
        .engine
        .create(h.request(dec!(2000), Currency::TRY), "k2")
        .await
        .unwrap();

    let until = transfer.approval_required_until.expect("hold expected");
    assert_eq!((until - transfer.created_at).num_seconds(), 300);

    let err = h
        .engine
        .complete(&transfer.transaction_code, RECEIVER_NID)
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "wait 5 more minute(s)");
    assert!(matches!(err, MoneyBeeError::FailedPrecondition(_)));

    h.store.expire_approval(&transfer.transaction_code);

    let completed = h
        .engine
        .complete(&transfer.transaction_code, RECEIVER_NID)
        .await
        .unwrap();
    assert_eq!(completed.status, TransferStatus::Completed);
}

#[tokio::test]
async fn approval_threshold_is_exclusive() {
    let h = Harness::new();

    let at_threshold = h
        .engine
        .create(h.request(dec!(1000.00), Currency::TRY), "ka")
        .await
        .unwrap();
    assert!(at_threshold.approval_required_until.is_none());

    let above = h
        .engine
        .create(h.request(dec!(1000.01), Currency::TRY), "kb")
        .await
        .unwrap();
    assert!(above.approval_required_until.is_some());
}

// ============================================================================
// S4: daily-limit race
// ============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn daily_limit_survives_concurrent_creates() {
    let h = Harness::new();

    let mut handles = Vec::new();
    for key in ["k3a", "k3b", "k3c"] {
        let engine = h.engine.clone();
        let req = h.request(dec!(4000), Currency::TRY);
        handles.push(tokio::spawn(
            async move { engine.create(req, key).await },
        ));
    }

    let mut successes = 0;
    let mut limit_rejections = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(t) => {
                assert_eq!(t.status, TransferStatus::Pending);
                successes += 1;
            }
            Err(MoneyBeeError::FailedPrecondition(msg)) => {
                assert!(msg.contains("daily limit exceeded"), "message: {}", msg);
                limit_rejections += 1;
            }
            Err(other) => panic!("unexpected error: {:?}", other),
        }
    }

    assert_eq!(successes, 2);
    assert_eq!(limit_rejections, 1);

    let total: Decimal = h
        .store
        .all()
        .iter()
        .filter(|t| t.status == TransferStatus::Pending)
        .map(|t| t.amount_in_try)
        .sum();
    assert_eq!(total, dec!(8000));
}

#[tokio::test]
async fn exact_remaining_amount_is_accepted() {
    let h = Harness::new();

    h.engine
        .create(h.request(dec!(4000), Currency::TRY), "k1")
        .await
        .unwrap();
    h.engine
        .create(h.request(dec!(4000), Currency::TRY), "k2")
        .await
        .unwrap();

    // 2000 lands exactly on the 10 000 limit
    let exact = h
        .engine
        .create(h.request(dec!(2000), Currency::TRY), "k3")
        .await
        .unwrap();
    assert_eq!(exact.status, TransferStatus::Pending);

    let err = h
        .engine
        .create(h.request(dec!(0.01), Currency::TRY), "k4")
        .await
        .unwrap_err();
    assert!(err.to_string().contains("daily limit exceeded; remaining=0"));
}

#[tokio::test]
async fn cancelled_transfers_release_daily_headroom() {
    let h = Harness::new();

    let first = h
        .engine
        .create(h.request(dec!(9000), Currency::TRY), "k1")
        .await
        .unwrap();

    let err = h
        .engine
        .create(h.request(dec!(5000), Currency::TRY), "k2")
        .await
        .unwrap_err();
    assert!(err.to_string().contains("daily limit exceeded"));

    h.engine
        .cancel(&first.transaction_code, Some("changed plans".to_string()))
        .await
        .unwrap();

    let second = h
        .engine
        .create(h.request(dec!(5000), Currency::TRY), "k3")
        .await
        .unwrap();
    assert_eq!(second.status, TransferStatus::Pending);
}

// ============================================================================
// S5: fraud rejection
// ============================================================================

#[tokio::test]
async fn high_fraud_risk_persists_failed_row() {
    let h = Harness::new();
    h.fraud.set(RiskLevel::High);

    let err = h
        .engine
        .create(h.request(dec!(500), Currency::TRY), "k5")
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "high fraud risk");
    assert!(matches!(err, MoneyBeeError::FailedPrecondition(_)));

    let rows = h.store.all();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].status, TransferStatus::Failed);
    assert_eq!(rows[0].transaction_fee, Decimal::ZERO);
    assert_eq!(rows[0].risk_level, Some(RiskLevel::High));

    assert_eq!(h.publisher.count(routing::TRANSFER_CREATED), 0);
}

#[tokio::test]
async fn fraud_rejection_replays_deterministically() {
    let h = Harness::new();
    h.fraud.set(RiskLevel::High);

    let req = h.request(dec!(500), Currency::TRY);
    let first = h.engine.create(req.clone(), "k5").await.unwrap_err();

    // even with the verdict relaxed, the same key re-fails the same way
    h.fraud.set(RiskLevel::Low);
    let second = h.engine.create(req, "k5").await.unwrap_err();

    assert_eq!(first, second);
    assert_eq!(h.store.all().len(), 1);
    assert_eq!(h.publisher.count(routing::TRANSFER_CREATED), 0);
}

#[tokio::test]
async fn medium_risk_is_admitted_and_recorded() {
    let h = Harness::new();
    h.fraud.set(RiskLevel::Medium);

    let transfer = h
        .engine
        .create(h.request(dec!(500), Currency::TRY), "k1")
        .await
        .unwrap();
    assert_eq!(transfer.status, TransferStatus::Pending);
    assert_eq!(transfer.risk_level, Some(RiskLevel::Medium));
}

// ============================================================================
// S7: multi-currency normalization
// ============================================================================

#[tokio::test]
async fn usd_transfer_is_normalized_at_the_frozen_rate() {
    let h = Harness::new();
    h.rates.set_rate(Currency::USD, Currency::TRY, dec!(30.00));

    let transfer = h
        .engine
        .create(h.request(dec!(100), Currency::USD), "k7")
        .await
        .unwrap();

    assert_eq!(transfer.amount, dec!(100));
    assert_eq!(transfer.currency, Currency::USD);
    assert_eq!(transfer.amount_in_try, dec!(3000.00));
    assert_eq!(transfer.exchange_rate, Some(dec!(30.00)));
    assert_eq!(transfer.transaction_fee, dec!(35.00));
    assert!(transfer.approval_required_until.is_some());
}

#[tokio::test]
async fn missing_rate_surfaces_as_unavailable() {
    let h = Harness::new();

    let err = h
        .engine
        .create(h.request(dec!(100), Currency::USD), "k7")
        .await
        .unwrap_err();

    assert!(matches!(err, MoneyBeeError::Unavailable(_)));
    assert!(err.to_string().contains("exchange rate service"));
    assert!(h.store.all().is_empty());
}

// ============================================================================
// Admission validation
// ============================================================================

#[tokio::test]
async fn empty_idempotency_key_is_rejected() {
    let h = Harness::new();
    for key in ["", "   "] {
        let err = h
            .engine
            .create(h.request(dec!(500), Currency::TRY), key)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "idempotency key required");
        assert!(matches!(err, MoneyBeeError::InvalidArgument(_)));
    }
}

#[tokio::test]
async fn non_positive_amount_is_rejected() {
    let h = Harness::new();
    for amount in [dec!(0), dec!(-1)] {
        let err = h
            .engine
            .create(h.request(amount, Currency::TRY), "k1")
            .await
            .unwrap_err();
        assert!(matches!(err, MoneyBeeError::InvalidArgument(_)));
    }
}

#[tokio::test]
async fn sender_gates() {
    let h = Harness::new();

    let mut req = h.request(dec!(500), Currency::TRY);
    req.sender_national_id = "11111111111".to_string();
    let err = h.engine.create(req, "k1").await.unwrap_err();
    assert_eq!(err.to_string(), "sender not found");

    h.customers
        .with_status("22222222222", CustomerStatus::Inactive);
    let mut req = h.request(dec!(500), Currency::TRY);
    req.sender_national_id = "22222222222".to_string();
    let err = h.engine.create(req, "k2").await.unwrap_err();
    assert_eq!(err.to_string(), "sender not active");
}

#[tokio::test]
async fn receiver_gates() {
    let h = Harness::new();

    let mut req = h.request(dec!(500), Currency::TRY);
    req.receiver_national_id = "11111111111".to_string();
    let err = h.engine.create(req, "k1").await.unwrap_err();
    assert_eq!(err.to_string(), "receiver not found");

    h.customers
        .with_status("33333333333", CustomerStatus::Blocked);
    let mut req = h.request(dec!(500), Currency::TRY);
    req.receiver_national_id = "33333333333".to_string();
    let err = h.engine.create(req, "k2").await.unwrap_err();
    assert_eq!(err.to_string(), "receiver blocked");

    // an inactive receiver can still pick up
    h.customers
        .with_status("44444444444", CustomerStatus::Inactive);
    let mut req = h.request(dec!(500), Currency::TRY);
    req.receiver_national_id = "44444444444".to_string();
    assert!(h.engine.create(req, "k3").await.is_ok());
}

// ============================================================================
// Complete / Cancel semantics
// ============================================================================

#[tokio::test]
async fn complete_verifies_receiver_identity() {
    let h = Harness::new();
    let transfer = h
        .engine
        .create(h.request(dec!(500), Currency::TRY), "k1")
        .await
        .unwrap();

    let err = h
        .engine
        .complete(&transfer.transaction_code, SENDER_NID)
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "receiver verification failed");
    assert!(matches!(err, MoneyBeeError::PermissionDenied(_)));

    // nothing mutated, pickup still possible
    let completed = h
        .engine
        .complete(&transfer.transaction_code, RECEIVER_NID)
        .await
        .unwrap();
    assert_eq!(completed.status, TransferStatus::Completed);
}

#[tokio::test]
async fn complete_unknown_code_is_not_found() {
    let h = Harness::new();
    let err = h.engine.complete("ZZZZZZZZZZ", RECEIVER_NID).await.unwrap_err();
    assert!(matches!(err, MoneyBeeError::NotFound(_)));
}

#[tokio::test]
async fn second_cancel_fails_without_new_event() {
    let h = Harness::new();
    let transfer = h
        .engine
        .create(h.request(dec!(500), Currency::TRY), "k1")
        .await
        .unwrap();

    let cancelled = h
        .engine
        .cancel(&transfer.transaction_code, Some("no longer needed".to_string()))
        .await
        .unwrap();
    assert_eq!(cancelled.status, TransferStatus::Cancelled);
    assert_eq!(
        cancelled.cancellation_reason.as_deref(),
        Some("no longer needed")
    );

    let err = h
        .engine
        .cancel(&transfer.transaction_code, None)
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "status=cancelled");
    assert!(matches!(err, MoneyBeeError::FailedPrecondition(_)));

    assert_eq!(h.publisher.count(routing::TRANSFER_CANCELLED), 1);
}

#[tokio::test]
async fn complete_after_cancel_is_rejected() {
    let h = Harness::new();
    let transfer = h
        .engine
        .create(h.request(dec!(500), Currency::TRY), "k1")
        .await
        .unwrap();

    h.engine
        .cancel(&transfer.transaction_code, None)
        .await
        .unwrap();

    let err = h
        .engine
        .complete(&transfer.transaction_code, RECEIVER_NID)
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "status=cancelled");
}

#[tokio::test]
async fn version_conflict_is_retried_after_reread() {
    let h = Harness::new();
    let transfer = h
        .engine
        .create(h.request(dec!(500), Currency::TRY), "k1")
        .await
        .unwrap();

    // another writer bumped the row between our read and write; the
    // engine re-reads and lands the transition on the fresh version
    h.store.bump_version(&transfer.transaction_code);

    let completed = h
        .engine
        .complete(&transfer.transaction_code, RECEIVER_NID)
        .await
        .unwrap();
    assert_eq!(completed.status, TransferStatus::Completed);
}

#[tokio::test]
async fn exhausted_retries_surface_as_aborted() {
    use async_trait::async_trait;
    use chrono::{DateTime, Utc};
    use moneybee_domain::{StoreError, Transfer, TransferStore};

    /// Delegates to the real store but loses every transition race
    struct ContendedStore(Arc<MemoryStore>);

    #[async_trait]
    impl TransferStore for ContendedStore {
        async fn insert(&self, transfer: &Transfer) -> Result<Transfer, StoreError> {
            self.0.insert(transfer).await
        }

        async fn update_transition(&self, _transfer: &Transfer) -> Result<Transfer, StoreError> {
            Err(StoreError::VersionConflict)
        }

        async fn find_by_code(&self, code: &str) -> Result<Option<Transfer>, StoreError> {
            self.0.find_by_code(code).await
        }

        async fn find_by_idempotency_key(
            &self,
            key: &str,
        ) -> Result<Option<Transfer>, StoreError> {
            self.0.find_by_idempotency_key(key).await
        }

        async fn code_exists(&self, code: &str) -> Result<bool, StoreError> {
            self.0.code_exists(code).await
        }

        async fn daily_total_try(
            &self,
            sender_id: Uuid,
            since: DateTime<Utc>,
        ) -> Result<rust_decimal::Decimal, StoreError> {
            self.0.daily_total_try(sender_id, since).await
        }

        async fn list_for_customer(
            &self,
            customer_id: Uuid,
            limit: i64,
        ) -> Result<Vec<Transfer>, StoreError> {
            self.0.list_for_customer(customer_id, limit).await
        }

        async fn pending_for_customer(
            &self,
            customer_id: Uuid,
        ) -> Result<Vec<Transfer>, StoreError> {
            self.0.pending_for_customer(customer_id).await
        }
    }

    let inner = MemoryStore::new();
    let customers = StubCustomers::new();
    customers.active(SENDER_NID);
    customers.active(RECEIVER_NID);

    let mut policy = EnginePolicy::default();
    policy.concurrency_backoff_base = std::time::Duration::from_millis(1);

    let engine = TransferEngine::new(
        Arc::new(ContendedStore(inner.clone())),
        MemoryLock::new(),
        MemoryPublisher::new(),
        customers,
        StubFraud::new(RiskLevel::Low),
        StubRates::new(),
        policy,
    );

    let transfer = engine
        .create(
            CreateTransferRequest {
                sender_national_id: SENDER_NID.to_string(),
                receiver_national_id: RECEIVER_NID.to_string(),
                amount: dec!(500),
                currency: Currency::TRY,
                description: None,
            },
            "k1",
        )
        .await
        .unwrap();

    let err = engine
        .complete(&transfer.transaction_code, RECEIVER_NID)
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "concurrent modification");
    assert!(matches!(err, MoneyBeeError::Aborted(_)));
    assert!(err.is_retryable());
}

#[tokio::test]
async fn busy_lock_surfaces_as_unavailable() {
    use moneybee_domain::DistributedLock;

    let h = Harness::new();

    // another holder has the sender's daily-limit key for longer than the
    // engine's whole retry budget
    let lock = MemoryLock::new();
    let engine = Arc::new(TransferEngine::new(
        h.store.clone(),
        lock.clone(),
        h.publisher.clone(),
        h.customers.clone(),
        h.fraud.clone(),
        h.rates.clone(),
        EnginePolicy {
            concurrency_backoff_base: std::time::Duration::from_millis(1),
            ..EnginePolicy::default()
        },
    ));

    let key = format!("daily-limit:{}", h.sender_id);
    let nonce = lock
        .acquire(&key, std::time::Duration::from_secs(60))
        .await
        .unwrap()
        .unwrap();

    let err = engine
        .create(h.request(dec!(500), Currency::TRY), "k1")
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "lock busy");
    assert!(matches!(err, MoneyBeeError::Unavailable(_)));

    // once released, the same request goes through
    assert!(lock.release(&key, &nonce).await.unwrap());
    let transfer = engine
        .create(h.request(dec!(500), Currency::TRY), "k1")
        .await
        .unwrap();
    assert_eq!(transfer.status, TransferStatus::Pending);
}

#[tokio::test]
async fn publish_failure_does_not_roll_back_the_commit() {
    let h = Harness::new();
    h.publisher.set_broken(true);

    let transfer = h
        .engine
        .create(h.request(dec!(500), Currency::TRY), "k1")
        .await
        .unwrap();

    // the row committed even though the event never made it out
    assert_eq!(transfer.status, TransferStatus::Pending);
    assert_eq!(h.store.all().len(), 1);
    assert_eq!(h.publisher.count(routing::TRANSFER_CREATED), 0);
}

// ============================================================================
// Reads
// ============================================================================

#[tokio::test]
async fn daily_limit_read_reflects_pending_and_completed() {
    let h = Harness::new();

    let status = h.engine.daily_limit(h.sender_id).await.unwrap();
    assert_eq!(status.total_today, Decimal::ZERO);
    assert_eq!(status.daily_limit, dec!(10000));

    let transfer = h
        .engine
        .create(h.request(dec!(500), Currency::TRY), "k1")
        .await
        .unwrap();
    let status = h.engine.daily_limit(h.sender_id).await.unwrap();
    assert_eq!(status.total_today, dec!(500));

    h.engine
        .complete(&transfer.transaction_code, RECEIVER_NID)
        .await
        .unwrap();
    let status = h.engine.daily_limit(h.sender_id).await.unwrap();
    assert_eq!(status.total_today, dec!(500));
}

#[tokio::test]
async fn customer_listing_covers_both_directions() {
    let h = Harness::new();

    let sent = h
        .engine
        .create(h.request(dec!(500), Currency::TRY), "k1")
        .await
        .unwrap();

    let by_sender = h.engine.customer_transfers(h.sender_id).await.unwrap();
    let by_receiver = h.engine.customer_transfers(h.receiver_id).await.unwrap();
    assert_eq!(by_sender.len(), 1);
    assert_eq!(by_receiver.len(), 1);
    assert_eq!(by_sender[0].id, sent.id);
}
