//! MoneyBee outbound collaborators
//!
//! HTTP clients for the four services the engine and the admission filter
//! consume: Customer, Fraud, Exchange-Rate, and Auth. All of them share
//! the same transport discipline:
//!
//! - every call carries a bounded deadline
//! - transient failures are retried with exponential backoff, but only
//!   for reads and calls the collaborator declares idempotent
//! - a circuit breaker opens after consecutive failures and half-opens
//!   after a cooldown
//! - errors are classified at this boundary: transport problems surface
//!   as `Unavailable`, unexpected 4xx as contract violations

pub mod auth;
pub mod backoff;
pub mod breaker;
pub mod config;
pub mod customer;
pub mod fraud;
pub mod rates;
mod transport;

pub use auth::HttpKeyValidator;
pub use backoff::BackOff;
pub use breaker::{BreakerState, CircuitBreaker};
pub use config::{CollaboratorConfig, CollaboratorEndpoints};
pub use customer::HttpCustomerDirectory;
pub use fraud::HttpFraudScreen;
pub use rates::HttpRateSource;
