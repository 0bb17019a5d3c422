//! Event payloads and routing keys for the `moneybee.events` exchange
//!
//! Outbound events are published by the transfer engine; inbound
//! `customer.*` events are consumed by the reactor. Delivery is
//! at-least-once on both sides, so consumers de-duplicate by transfer id
//! or by (customer id, status transition).

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::currency::Currency;
use crate::status::CustomerStatus;

/// Name of the topic exchange both sides attach to
pub const EVENT_EXCHANGE: &str = "moneybee.events";

/// Routing keys
pub mod routing {
    pub const TRANSFER_CREATED: &str = "transfer.created";
    pub const TRANSFER_COMPLETED: &str = "transfer.completed";
    pub const TRANSFER_CANCELLED: &str = "transfer.cancelled";
    pub const CUSTOMER_STATUS_CHANGED: &str = "customer.status.changed";
    pub const CUSTOMER_CREATED: &str = "customer.created";
    pub const CUSTOMER_DELETED: &str = "customer.deleted";
    /// Pattern covering every customer lifecycle key
    pub const CUSTOMER_WILDCARD: &str = "customer.*";
}

/// Events published by the transfer engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum TransferEvent {
    TransferCreated {
        transfer_id: Uuid,
        sender_id: Uuid,
        receiver_id: Uuid,
        amount: Decimal,
        currency: Currency,
    },
    TransferCompleted {
        transfer_id: Uuid,
        transaction_code: String,
    },
    TransferCancelled {
        transfer_id: Uuid,
        reason: String,
    },
}

impl TransferEvent {
    /// Routing key this event is published under
    pub fn routing_key(&self) -> &'static str {
        match self {
            Self::TransferCreated { .. } => routing::TRANSFER_CREATED,
            Self::TransferCompleted { .. } => routing::TRANSFER_COMPLETED,
            Self::TransferCancelled { .. } => routing::TRANSFER_CANCELLED,
        }
    }

    /// Transfer this event concerns; consumers de-duplicate on it
    pub fn transfer_id(&self) -> Uuid {
        match self {
            Self::TransferCreated { transfer_id, .. }
            | Self::TransferCompleted { transfer_id, .. }
            | Self::TransferCancelled { transfer_id, .. } => *transfer_id,
        }
    }
}

/// A raw message as delivered off the bus: the routing key it arrived
/// under plus its JSON payload. Consumers decode the payload themselves
/// so an unknown key can still be acknowledged and logged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BusMessage {
    pub routing_key: String,
    pub payload: serde_json::Value,
}

/// Customer lifecycle events consumed by the reactor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerStatusChanged {
    pub customer_id: Uuid,
    pub previous_status: CustomerStatus,
    pub new_status: CustomerStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerCreated {
    pub customer_id: Uuid,
    pub national_id: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerDeleted {
    pub customer_id: Uuid,
    pub national_id: String,
    pub timestamp: DateTime<Utc>,
}
