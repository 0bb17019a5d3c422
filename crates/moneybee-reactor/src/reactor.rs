//! Cascade cancellation on customer lifecycle events

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use moneybee_domain::TransferStore;
use moneybee_engine::TransferEngine;
use moneybee_types::{
    routing, BusMessage, CustomerCreated, CustomerDeleted, CustomerStatus, CustomerStatusChanged,
    MoneyBeeError, Result,
};

pub struct CustomerEventReactor {
    engine: Arc<TransferEngine>,
    store: Arc<dyn TransferStore>,
}

impl CustomerEventReactor {
    pub fn new(engine: Arc<TransferEngine>, store: Arc<dyn TransferStore>) -> Self {
        Self { engine, store }
    }

    /// Drain the subscription until the sending side closes. Handler
    /// failures are recorded and acknowledged, never requeued, so one
    /// undecodable message cannot wedge the stream.
    pub async fn run(&self, mut rx: mpsc::Receiver<BusMessage>) {
        info!("Customer-event reactor started");
        while let Some(msg) = rx.recv().await {
            if let Err(e) = self.handle(&msg).await {
                error!(
                    routing_key = %msg.routing_key,
                    error = %e,
                    "Customer event handling failed; acknowledged without requeue"
                );
            }
        }
        info!("Customer event stream closed; reactor stopping");
    }

    /// Process one message from the bus
    pub async fn handle(&self, msg: &BusMessage) -> Result<()> {
        match msg.routing_key.as_str() {
            routing::CUSTOMER_STATUS_CHANGED => {
                let event: CustomerStatusChanged = decode(&msg.payload)?;
                if event.new_status == CustomerStatus::Blocked {
                    self.cascade_cancel(
                        event.customer_id,
                        format!("customer {} was blocked", event.customer_id),
                    )
                    .await?;
                } else {
                    debug!(
                        customer_id = %event.customer_id,
                        new_status = %event.new_status,
                        "Status change needs no cascade"
                    );
                }
            }
            routing::CUSTOMER_DELETED => {
                let event: CustomerDeleted = decode(&msg.payload)?;
                self.cascade_cancel(
                    event.customer_id,
                    format!("customer {} was deleted", event.customer_id),
                )
                .await?;
            }
            routing::CUSTOMER_CREATED => {
                let event: CustomerCreated = decode(&msg.payload)?;
                debug!(customer_id = %event.customer_id, "Customer created");
            }
            other => {
                warn!(routing_key = other, "Unknown routing key acknowledged");
            }
        }
        Ok(())
    }

    /// Manual sweep for a customer whose block/delete event may have been
    /// missed. Safe to repeat: the second pass finds nothing Pending.
    pub async fn reconcile_customer(
        &self,
        customer_id: Uuid,
        reason: Option<String>,
    ) -> Result<usize> {
        let reason =
            reason.unwrap_or_else(|| format!("customer {} reconciliation", customer_id));
        self.cascade_cancel(customer_id, reason).await
    }

    /// Cancel every Pending transfer the customer touches, as sender or
    /// receiver. Rows that reach a terminal state between the sweep read
    /// and the cancel are skipped; someone else already settled them.
    async fn cascade_cancel(&self, customer_id: Uuid, reason: String) -> Result<usize> {
        let pending = self
            .store
            .pending_for_customer(customer_id)
            .await
            .map_err(|e| MoneyBeeError::internal(format!("transfer store: {}", e)))?;

        let mut cancelled = 0usize;
        for transfer in pending {
            match self
                .engine
                .cancel(&transfer.transaction_code, Some(reason.clone()))
                .await
            {
                Ok(_) => cancelled += 1,
                Err(MoneyBeeError::FailedPrecondition(_)) => {
                    debug!(
                        transfer_id = %transfer.id,
                        "Transfer settled concurrently; skipping"
                    );
                }
                Err(e) => return Err(e),
            }
        }

        info!(
            customer_id = %customer_id,
            cancelled,
            "Cascade cancellation complete"
        );
        Ok(cancelled)
    }
}

fn decode<T: serde::de::DeserializeOwned>(payload: &serde_json::Value) -> Result<T> {
    serde_json::from_value(payload.clone())
        .map_err(|e| MoneyBeeError::internal(format!("undecodable customer event: {}", e)))
}
