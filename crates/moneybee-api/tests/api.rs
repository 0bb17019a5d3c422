//! API integration tests
//!
//! Full request/response cycle against the real router: in-memory engine
//! ports, a stub Auth collaborator behind the admission filter, and JSON
//! assertions on the response envelope.

use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use moneybee_api::{create_router, ApiConfig, AppState};
use moneybee_auth::{AdmissionConfig, AdmissionFilter, MemoryValidityCache};
use moneybee_domain::{CollaboratorError, EnginePolicy, KeyValidator};
use moneybee_engine::testing::{
    MemoryLock, MemoryPublisher, MemoryStore, StubCustomers, StubFraud, StubRates,
};
use moneybee_engine::TransferEngine;
use moneybee_reactor::CustomerEventReactor;
use moneybee_types::RiskLevel;

const SENDER_NID: &str = "15054682652";
const RECEIVER_NID: &str = "98765432109";
const API_KEY: &str = "mb_0123456789abcdef01234567";

struct AlwaysValid;

#[async_trait]
impl KeyValidator for AlwaysValid {
    async fn validate(&self, _api_key: &str) -> Result<bool, CollaboratorError> {
        Ok(true)
    }
}

struct TestApp {
    router: Router,
    sender_id: Uuid,
}

fn test_app() -> TestApp {
    let store = MemoryStore::new();
    let customers = StubCustomers::new();
    let sender_id = customers.active(SENDER_NID);
    customers.active(RECEIVER_NID);

    let engine = Arc::new(TransferEngine::new(
        store.clone(),
        MemoryLock::new(),
        MemoryPublisher::new(),
        customers,
        StubFraud::new(RiskLevel::Low),
        StubRates::new(),
        EnginePolicy::default(),
    ));

    let reactor = Arc::new(CustomerEventReactor::new(engine.clone(), store));

    let state = Arc::new(AppState::new(engine, reactor, None));
    let filter = Arc::new(AdmissionFilter::new(
        Arc::new(AlwaysValid),
        Arc::new(MemoryValidityCache::new()),
        AdmissionConfig::default(),
    ));

    TestApp {
        router: create_router(state, filter, ApiConfig::default()),
        sender_id,
    }
}

async fn request(
    router: &Router,
    method: &str,
    uri: &str,
    body: Option<Value>,
    idempotency_key: Option<&str>,
    api_key: Option<&str>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(key) = api_key {
        builder = builder.header("X-API-Key", key);
    }
    if let Some(key) = idempotency_key {
        builder = builder.header("X-Idempotency-Key", key);
    }

    let body = match body {
        Some(json_body) => {
            builder = builder.header("Content-Type", "application/json");
            Body::from(serde_json::to_vec(&json_body).unwrap())
        }
        None => Body::empty(),
    };

    let response = router
        .clone()
        .oneshot(builder.body(body).unwrap())
        .await
        .unwrap();

    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json: Value = serde_json::from_slice(&bytes).unwrap_or(json!(null));

    (status, json)
}

fn create_body() -> Value {
    json!({
        "sender_national_id": SENDER_NID,
        "receiver_national_id": RECEIVER_NID,
        "amount": "500",
        "currency": "TRY",
    })
}

async fn create_transfer(app: &TestApp, key: &str) -> Value {
    let (status, body) = request(
        &app.router,
        "POST",
        "/api/transfers",
        Some(create_body()),
        Some(key),
        Some(API_KEY),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "body: {}", body);
    body["data"].clone()
}

// ============================================================================
// Admission
// ============================================================================

#[tokio::test]
async fn mutation_without_api_key_is_unauthorized() {
    let app = test_app();
    let (status, body) = request(
        &app.router,
        "POST",
        "/api/transfers",
        Some(create_body()),
        Some("k1"),
        None,
    )
    .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "API Key is missing");
}

#[tokio::test]
async fn health_needs_no_key() {
    let app = test_app();
    let (status, body) = request(&app.router, "GET", "/health", None, None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn readiness_reports_components() {
    let app = test_app();
    let (status, body) = request(&app.router, "GET", "/ready", None, None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ready");
}

// ============================================================================
// Create
// ============================================================================

#[tokio::test]
async fn create_returns_envelope_with_transfer() {
    let app = test_app();
    let data = create_transfer(&app, "k1").await;

    assert_eq!(data["status"], "pending");
    assert_eq!(data["transaction_fee"], "10.00");
    assert_eq!(data["amount_in_try"], "500");
    assert_eq!(data["currency"], "TRY");
    let code = data["transaction_code"].as_str().unwrap();
    assert_eq!(code.len(), 10);
}

#[tokio::test]
async fn create_without_idempotency_header_is_bad_request() {
    let app = test_app();
    let (status, body) = request(
        &app.router,
        "POST",
        "/api/transfers",
        Some(create_body()),
        None,
        Some(API_KEY),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "idempotency key required");
}

#[tokio::test]
async fn create_replay_returns_same_transfer() {
    let app = test_app();
    let first = create_transfer(&app, "k1").await;
    let second = create_transfer(&app, "k1").await;

    assert_eq!(first["id"], second["id"]);
    assert_eq!(first["transaction_code"], second["transaction_code"]);
}

#[tokio::test]
async fn create_validates_national_id_length() {
    let app = test_app();
    let (status, body) = request(
        &app.router,
        "POST",
        "/api/transfers",
        Some(json!({
            "sender_national_id": "123",
            "receiver_national_id": RECEIVER_NID,
            "amount": "500",
            "currency": "TRY",
        })),
        Some("k1"),
        Some(API_KEY),
    )
    .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "validation failed");
}

#[tokio::test]
async fn create_rejects_unknown_currency() {
    let app = test_app();
    let (status, _body) = request(
        &app.router,
        "POST",
        "/api/transfers",
        Some(json!({
            "sender_national_id": SENDER_NID,
            "receiver_national_id": RECEIVER_NID,
            "amount": "500",
            "currency": "JPY",
        })),
        Some("k1"),
        Some(API_KEY),
    )
    .await;

    // unknown enum variant fails deserialization before the handler
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn create_over_daily_limit_conflicts() {
    let app = test_app();

    for (i, amount) in ["4000", "4000"].iter().enumerate() {
        let (status, _) = request(
            &app.router,
            "POST",
            "/api/transfers",
            Some(json!({
                "sender_national_id": SENDER_NID,
                "receiver_national_id": RECEIVER_NID,
                "amount": amount,
                "currency": "TRY",
            })),
            Some(&format!("k{}", i)),
            Some(API_KEY),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (status, body) = request(
        &app.router,
        "POST",
        "/api/transfers",
        Some(json!({
            "sender_national_id": SENDER_NID,
            "receiver_national_id": RECEIVER_NID,
            "amount": "3000",
            "currency": "TRY",
        })),
        Some("k-over"),
        Some(API_KEY),
    )
    .await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["message"]
        .as_str()
        .unwrap()
        .contains("daily limit exceeded"));
}

// ============================================================================
// Complete / Cancel
// ============================================================================

#[tokio::test]
async fn complete_happy_path() {
    let app = test_app();
    let data = create_transfer(&app, "k1").await;
    let code = data["transaction_code"].as_str().unwrap();

    let (status, body) = request(
        &app.router,
        "POST",
        &format!("/api/transfers/{}/complete", code),
        Some(json!({ "receiver_national_id": RECEIVER_NID })),
        None,
        Some(API_KEY),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "completed");
}

#[tokio::test]
async fn complete_with_wrong_identity_is_forbidden() {
    let app = test_app();
    let data = create_transfer(&app, "k1").await;
    let code = data["transaction_code"].as_str().unwrap();

    let (status, body) = request(
        &app.router,
        "POST",
        &format!("/api/transfers/{}/complete", code),
        Some(json!({ "receiver_national_id": SENDER_NID })),
        None,
        Some(API_KEY),
    )
    .await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["message"], "receiver verification failed");
}

#[tokio::test]
async fn complete_with_malformed_identity_is_forbidden() {
    let app = test_app();
    let data = create_transfer(&app, "k1").await;
    let code = data["transaction_code"].as_str().unwrap();

    // a malformed id is just a non-matching one; same 403 as any mismatch
    let (status, body) = request(
        &app.router,
        "POST",
        &format!("/api/transfers/{}/complete", code),
        Some(json!({ "receiver_national_id": "123" })),
        None,
        Some(API_KEY),
    )
    .await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["message"], "receiver verification failed");
}

#[tokio::test]
async fn cancel_accepts_long_free_text_reason() {
    let app = test_app();
    let data = create_transfer(&app, "k1").await;
    let code = data["transaction_code"].as_str().unwrap();

    let reason = "circumstances ".repeat(40);
    let (status, body) = request(
        &app.router,
        "POST",
        &format!("/api/transfers/{}/cancel", code),
        Some(json!({ "reason": reason.clone() })),
        None,
        Some(API_KEY),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "cancelled");
    assert_eq!(body["data"]["cancellation_reason"], reason);
}

#[tokio::test]
async fn cancel_then_cancel_again() {
    let app = test_app();
    let data = create_transfer(&app, "k1").await;
    let code = data["transaction_code"].as_str().unwrap();

    let (status, body) = request(
        &app.router,
        "POST",
        &format!("/api/transfers/{}/cancel", code),
        Some(json!({ "reason": "changed my mind" })),
        None,
        Some(API_KEY),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "cancelled");
    assert_eq!(body["data"]["cancellation_reason"], "changed my mind");

    let (status, body) = request(
        &app.router,
        "POST",
        &format!("/api/transfers/{}/cancel", code),
        None,
        None,
        Some(API_KEY),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["message"], "status=cancelled");
}

// ============================================================================
// Reads
// ============================================================================

#[tokio::test]
async fn get_unknown_transfer_is_not_found() {
    let app = test_app();
    let (status, body) = request(
        &app.router,
        "GET",
        "/api/transfers/ZZZZZZZZZZ",
        None,
        None,
        None,
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn daily_limit_endpoint_reports_headroom() {
    let app = test_app();
    create_transfer(&app, "k1").await;

    let (status, body) = request(
        &app.router,
        "GET",
        &format!("/api/transfers/daily-limit/{}", app.sender_id),
        None,
        None,
        None,
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["total_today"], "500");
    assert_eq!(body["data"]["daily_limit"], "10000");
}

#[tokio::test]
async fn customer_listing_returns_transfers() {
    let app = test_app();
    create_transfer(&app, "k1").await;

    let (status, body) = request(
        &app.router,
        "GET",
        &format!("/api/transfers/customer/{}", app.sender_id),
        None,
        None,
        None,
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
}

// ============================================================================
// Reconciliation
// ============================================================================

#[tokio::test]
async fn reconcile_cancels_pending_transfers() {
    let app = test_app();
    create_transfer(&app, "k1").await;

    let (status, body) = request(
        &app.router,
        "POST",
        &format!("/api/transfers/reconcile/{}", app.sender_id),
        None,
        None,
        Some(API_KEY),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["cancelled"], 1);
}
