//! MoneyBee Domain - the transfer aggregate and its policies
//!
//! This crate holds the pieces every other moneybee crate agrees on:
//!
//! - The `Transfer` aggregate and its state transitions
//! - Fee computation and FX normalization rounding
//! - Transaction-code generation over `[A-Z0-9]{10}`
//! - Engine policy configuration (limits, thresholds, lease times)
//! - The capability ports implemented by infrastructure crates and by
//!   test doubles
//!
//! The aggregate is the single writer for its rows: the engine mutates it
//! on Complete/Cancel, the reactor goes through the same transition
//! methods for cascade cancellation, and nothing else touches it.

pub mod code;
pub mod config;
pub mod fees;
pub mod ports;
pub mod transfer;

pub use code::*;
pub use config::*;
pub use fees::*;
pub use ports::*;
pub use transfer::*;
