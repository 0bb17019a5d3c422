//! MoneyBee Types - Canonical domain types for the money-transfer backplane
//!
//! This crate contains the foundational types for MoneyBee with zero
//! dependencies on other moneybee crates:
//!
//! - Currency enumeration and customer/transfer status enums
//! - The error taxonomy shared by every service crate
//! - Outbound and inbound event payloads with their routing keys
//! - The national-ID checksum validator
//!
//! # Architectural Invariants
//!
//! 1. A transfer reaches exactly one terminal state and never leaves it
//! 2. Every error visible to a caller carries a stable kind and a
//!    human-readable message
//! 3. Event payloads are the wire contract: additive changes only

pub mod currency;
pub mod error;
pub mod events;
pub mod national_id;
pub mod status;

pub use currency::*;
pub use error::*;
pub use events::*;
pub use national_id::*;
pub use status::*;
