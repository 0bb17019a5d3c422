//! The admission filter itself
//!
//! Applied as axum middleware over the API router. Non-mutating methods
//! and bypass paths pass straight through; everything else must present
//! a well-formed key the Auth service (or the cache standing in front of
//! it) vouches for.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{Method, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use sha2::{Digest, Sha256};
use tracing::warn;

use moneybee_domain::KeyValidator;

use crate::cache::ValidityCache;
use crate::config::{AdmissionConfig, API_KEY_HEADER, KEY_PREFIX, MIN_KEY_LENGTH};

const INVALID_MSG: &str = "API Key is invalid or expired";

pub struct AdmissionFilter {
    validator: Arc<dyn KeyValidator>,
    cache: Arc<dyn ValidityCache>,
    config: AdmissionConfig,
}

impl AdmissionFilter {
    pub fn new(
        validator: Arc<dyn KeyValidator>,
        cache: Arc<dyn ValidityCache>,
        config: AdmissionConfig,
    ) -> Self {
        Self {
            validator,
            cache,
            config,
        }
    }

    /// Run the admission decision for one request
    pub async fn admit(&self, req: Request, next: Next) -> Response {
        if self.config.is_bypassed(req.uri().path()) || !is_mutating(req.method()) {
            return next.run(req).await;
        }

        let key = match req
            .headers()
            .get(API_KEY_HEADER)
            .and_then(|v| v.to_str().ok())
        {
            Some(key) if !key.is_empty() => key.to_string(),
            _ => return reject("API Key is missing"),
        };

        if !key.starts_with(KEY_PREFIX) || key.len() < MIN_KEY_LENGTH {
            return reject("API Key format is invalid");
        }

        match self.check(&key).await {
            Ok(()) => next.run(req).await,
            Err(msg) => reject(msg),
        }
    }

    async fn check(&self, key: &str) -> Result<(), &'static str> {
        let key_hash = hash_key(key);

        match self.cache.get(&key_hash).await {
            Ok(Some(true)) => return Ok(()),
            Ok(Some(false)) => return Err(INVALID_MSG),
            Ok(None) => {}
            Err(e) => {
                // cache outage must not take the API down; go straight
                // to the auth service and fail closed only if it is
                // unreachable too
                warn!(error = %e, "Validity cache unreachable; bypassing");
                return self.validate_uncached(key, None).await;
            }
        }

        self.validate_uncached(key, Some(&key_hash)).await
    }

    async fn validate_uncached(
        &self,
        key: &str,
        cache_as: Option<&str>,
    ) -> Result<(), &'static str> {
        match self.validator.validate(key).await {
            Ok(valid) => {
                if let Some(key_hash) = cache_as {
                    let ttl = if valid {
                        self.config.valid_ttl
                    } else {
                        self.config.invalid_ttl
                    };
                    if let Err(e) = self.cache.put(key_hash, valid, ttl).await {
                        warn!(error = %e, "Could not cache key validity");
                    }
                }
                if valid {
                    Ok(())
                } else {
                    Err(INVALID_MSG)
                }
            }
            Err(e) => {
                warn!(error = %e, "Auth service unreachable; failing closed");
                Err("API Key validation unavailable")
            }
        }
    }
}

/// Axum middleware entry point; wire with `from_fn_with_state`
pub async fn require_api_key(
    State(filter): State<Arc<AdmissionFilter>>,
    req: Request,
    next: Next,
) -> Response {
    filter.admit(req, next).await
}

fn is_mutating(method: &Method) -> bool {
    matches!(
        *method,
        Method::POST | Method::PUT | Method::PATCH | Method::DELETE
    )
}

fn reject(message: &str) -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(serde_json::json!({ "error": message })),
    )
        .into_response()
}

/// SHA-256 hex of the raw key; what the cache is keyed by
pub fn hash_key(key: &str) -> String {
    hex::encode(Sha256::digest(key.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;
    use axum::{body::Body, middleware, routing::get, routing::post, Router};
    use parking_lot::Mutex;
    use tower::ServiceExt;

    use moneybee_domain::CollaboratorError;

    use crate::cache::{CacheError, MemoryValidityCache};

    const GOOD_KEY: &str = "mb_0123456789abcdef01234567";

    #[derive(Clone, Copy)]
    enum AuthBehavior {
        Valid,
        Invalid,
        Unreachable,
    }

    struct StubValidator {
        behavior: Mutex<AuthBehavior>,
        calls: AtomicUsize,
    }

    impl StubValidator {
        fn new(behavior: AuthBehavior) -> Arc<Self> {
            Arc::new(Self {
                behavior: Mutex::new(behavior),
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl KeyValidator for StubValidator {
        async fn validate(&self, _api_key: &str) -> Result<bool, CollaboratorError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match *self.behavior.lock() {
                AuthBehavior::Valid => Ok(true),
                AuthBehavior::Invalid => Ok(false),
                AuthBehavior::Unreachable => Err(CollaboratorError::Unavailable {
                    service: "auth service",
                    detail: "connection refused".to_string(),
                }),
            }
        }
    }

    struct BrokenCache;

    #[async_trait]
    impl ValidityCache for BrokenCache {
        async fn get(&self, _key_hash: &str) -> Result<Option<bool>, CacheError> {
            Err(CacheError::Backend("redis down".to_string()))
        }

        async fn put(&self, _key_hash: &str, _valid: bool, _ttl: Duration) -> Result<(), CacheError> {
            Err(CacheError::Backend("redis down".to_string()))
        }
    }

    fn router(validator: Arc<StubValidator>, cache: Arc<dyn ValidityCache>) -> Router {
        let filter = Arc::new(AdmissionFilter::new(
            validator,
            cache,
            AdmissionConfig::default(),
        ));
        Router::new()
            .route("/api/transfers", post(|| async { "created" }))
            .route("/api/transfers/:code", get(|| async { "found" }))
            .route("/health", get(|| async { "ok" }))
            .layer(middleware::from_fn_with_state(filter, require_api_key))
    }

    async fn send(router: &Router, method: &str, path: &str, key: Option<&str>) -> StatusCode {
        let mut builder = Request::builder().method(method).uri(path);
        if let Some(key) = key {
            builder = builder.header(API_KEY_HEADER, key);
        }
        let response = router
            .clone()
            .oneshot(builder.body(Body::empty()).unwrap())
            .await
            .unwrap();
        response.status()
    }

    #[tokio::test]
    async fn missing_key_is_rejected() {
        let validator = StubValidator::new(AuthBehavior::Valid);
        let app = router(validator, Arc::new(MemoryValidityCache::new()));
        assert_eq!(
            send(&app, "POST", "/api/transfers", None).await,
            StatusCode::UNAUTHORIZED
        );
    }

    #[tokio::test]
    async fn malformed_keys_are_rejected_without_auth_call() {
        let validator = StubValidator::new(AuthBehavior::Valid);
        let app = router(validator.clone(), Arc::new(MemoryValidityCache::new()));

        for key in ["sk_0123456789abcdef01234567", "mb_short"] {
            assert_eq!(
                send(&app, "POST", "/api/transfers", Some(key)).await,
                StatusCode::UNAUTHORIZED
            );
        }
        assert_eq!(validator.calls(), 0);
    }

    #[tokio::test]
    async fn valid_key_admits_and_is_cached() {
        let validator = StubValidator::new(AuthBehavior::Valid);
        let app = router(validator.clone(), Arc::new(MemoryValidityCache::new()));

        assert_eq!(
            send(&app, "POST", "/api/transfers", Some(GOOD_KEY)).await,
            StatusCode::OK
        );
        assert_eq!(
            send(&app, "POST", "/api/transfers", Some(GOOD_KEY)).await,
            StatusCode::OK
        );

        // the second request hit the cache
        assert_eq!(validator.calls(), 1);
    }

    #[tokio::test]
    async fn invalid_key_is_rejected_and_cached() {
        let validator = StubValidator::new(AuthBehavior::Invalid);
        let app = router(validator.clone(), Arc::new(MemoryValidityCache::new()));

        for _ in 0..2 {
            assert_eq!(
                send(&app, "POST", "/api/transfers", Some(GOOD_KEY)).await,
                StatusCode::UNAUTHORIZED
            );
        }
        assert_eq!(validator.calls(), 1);
    }

    #[tokio::test]
    async fn auth_outage_fails_closed() {
        let validator = StubValidator::new(AuthBehavior::Unreachable);
        let app = router(validator, Arc::new(MemoryValidityCache::new()));

        assert_eq!(
            send(&app, "POST", "/api/transfers", Some(GOOD_KEY)).await,
            StatusCode::UNAUTHORIZED
        );
    }

    #[tokio::test]
    async fn cache_outage_bypasses_to_auth() {
        let validator = StubValidator::new(AuthBehavior::Valid);
        let app = router(validator.clone(), Arc::new(BrokenCache));

        assert_eq!(
            send(&app, "POST", "/api/transfers", Some(GOOD_KEY)).await,
            StatusCode::OK
        );
        assert_eq!(validator.calls(), 1);

        // both cache and auth down: closed
        *validator.behavior.lock() = AuthBehavior::Unreachable;
        assert_eq!(
            send(&app, "POST", "/api/transfers", Some(GOOD_KEY)).await,
            StatusCode::UNAUTHORIZED
        );
    }

    #[tokio::test]
    async fn reads_and_bypass_paths_need_no_key() {
        let validator = StubValidator::new(AuthBehavior::Invalid);
        let app = router(validator.clone(), Arc::new(MemoryValidityCache::new()));

        assert_eq!(send(&app, "GET", "/health", None).await, StatusCode::OK);
        assert_eq!(
            send(&app, "GET", "/api/transfers/ABC123XYZ0", None).await,
            StatusCode::OK
        );
        assert_eq!(validator.calls(), 0);
    }
}
