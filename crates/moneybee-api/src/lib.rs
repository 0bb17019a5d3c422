//! MoneyBee API
//!
//! The HTTP surface over the transfer engine: route definitions, DTOs
//! with validation, the response envelope, and the error-to-status
//! mapping. Mutations pass through the admission filter; every response
//! uses the `{success, data, message, errors}` envelope.

pub mod dto;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod state;

pub use dto::ApiResponse;
pub use error::ApiError;
pub use routes::{create_router, ApiConfig};
pub use state::AppState;
