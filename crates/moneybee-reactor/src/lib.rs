//! MoneyBee Customer-Event Reactor
//!
//! A long-lived consumer on the `customer.*` routing keys. When the
//! customer bounded context blocks or deletes a customer, every Pending
//! transfer touching that customer is cancelled through the engine's
//! cancel path, one `TransferCancelled` event per row.
//!
//! The bus is at-least-once: a redelivered block event finds no Pending
//! rows on the second pass and cancels nothing. A handler failure is
//! acknowledged without requeue; the customer status itself is the
//! source of truth, and `reconcile_customer` re-runs the sweep for any
//! event that was missed entirely.

mod reactor;

pub use reactor::CustomerEventReactor;
