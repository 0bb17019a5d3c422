//! MoneyBee Auth Admission Filter
//!
//! Every mutating request presents an API key in a fixed header. The
//! filter checks the key's shape, consults a short-TTL validity cache,
//! and asks the Auth collaborator on a miss. Two failure postures matter:
//!
//! - Auth collaborator unreachable: **fail closed**, never admit
//!   unverified traffic
//! - cache unreachable: bypass the cache and ask Auth directly, failing
//!   closed only if Auth is also down
//!
//! Health, readiness, and documentation paths bypass the filter, as do
//! non-mutating methods.

pub mod cache;
pub mod config;
pub mod filter;

pub use cache::{CacheError, MemoryValidityCache, RedisValidityCache, ValidityCache};
pub use config::AdmissionConfig;
pub use filter::{require_api_key, AdmissionFilter};
