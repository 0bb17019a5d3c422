//! Application state shared across handlers

use std::sync::Arc;

use moneybee_db::Database;
use moneybee_engine::TransferEngine;
use moneybee_reactor::CustomerEventReactor;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// The transfer engine
    pub engine: Arc<TransferEngine>,
    /// Reactor handle, used by the manual reconcile endpoint
    pub reactor: Arc<CustomerEventReactor>,
    /// Database pools; absent in tests that run entirely in memory, in
    /// which case readiness reports only the service itself
    pub db: Option<Arc<Database>>,
}

impl AppState {
    pub fn new(
        engine: Arc<TransferEngine>,
        reactor: Arc<CustomerEventReactor>,
        db: Option<Arc<Database>>,
    ) -> Self {
        Self {
            engine,
            reactor,
            db,
        }
    }
}
