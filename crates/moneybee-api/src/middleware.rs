//! API middleware

use std::time::Instant;

use axum::{extract::Request, middleware::Next, response::Response};
use tracing::{debug, warn};

/// Requests slower than this get logged at warn level; transfer creation
/// holds a lock lease, so sustained slowness here is an early signal of
/// lock contention or a dragging collaborator.
const SLOW_REQUEST_MS: u128 = 1_000;

/// Record per-request latency and outcome
pub async fn timing_middleware(req: Request, next: Next) -> Response {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let started = Instant::now();

    let response = next.run(req).await;

    let latency_ms = started.elapsed().as_millis();
    let status = response.status().as_u16();

    if latency_ms > SLOW_REQUEST_MS {
        warn!(%method, %path, status, latency_ms, "Slow request");
    } else {
        debug!(%method, %path, status, latency_ms, "Request handled");
    }

    response
}
