//! API routes

use std::sync::Arc;

use axum::{
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use moneybee_auth::{require_api_key, AdmissionFilter};

use crate::handlers;
use crate::middleware;
use crate::state::AppState;

/// Surface-level toggles
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub enable_cors: bool,
    pub enable_trace: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            enable_cors: false,
            enable_trace: true,
        }
    }
}

/// Assemble the full router. The admission filter wraps everything;
/// inside it, it bypasses non-mutating methods and the health paths.
pub fn create_router(
    state: Arc<AppState>,
    filter: Arc<AdmissionFilter>,
    config: ApiConfig,
) -> Router {
    let mut router = Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/ready", get(handlers::health::readiness_check))
        .nest("/api/transfers", transfer_routes())
        .layer(axum_middleware::from_fn_with_state(filter, require_api_key))
        .layer(axum_middleware::from_fn(middleware::timing_middleware))
        .with_state(state);

    if config.enable_trace {
        router = router.layer(TraceLayer::new_for_http());
    }
    if config.enable_cors {
        router = router.layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        );
    }

    router
}

fn transfer_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", post(handlers::transfers::create_transfer))
        .route("/:code", get(handlers::transfers::get_transfer))
        .route("/:code/complete", post(handlers::transfers::complete_transfer))
        .route("/:code/cancel", post(handlers::transfers::cancel_transfer))
        .route(
            "/customer/:customer_id",
            get(handlers::transfers::customer_transfers),
        )
        .route(
            "/daily-limit/:customer_id",
            get(handlers::transfers::daily_limit),
        )
        .route(
            "/reconcile/:customer_id",
            post(handlers::transfers::reconcile_customer),
        )
}
