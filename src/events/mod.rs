use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, info};
use uuid::Uuid;

/// Domain events emitted after a mutating operation commits.
///
/// Delivery is best-effort: services log a warning when a send fails and
/// carry on, so event plumbing can never affect the outcome of the
/// operation that produced the event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    // Product catalog events
    ProductCreated(Uuid),
    ProductUpdated(Uuid),
    ProductDeleted(Uuid),

    // Stock ledger events
    StockAdjusted {
        product_id: Uuid,
        change_qty: i64,
        new_quantity: i64,
        reason: String,
        adjustment_id: Uuid,
    },

    // Invoice lifecycle events
    InvoiceCreated(Uuid),
    InvoiceItemAdded {
        invoice_id: Uuid,
        item_id: Uuid,
        product_id: Uuid,
    },
    InvoiceFinalized(Uuid),
    InvoiceCancelled {
        invoice_id: Uuid,
        previous_status: String,
    },
}

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Sends an event asynchronously.
    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }
}

/// Create a connected sender/receiver pair with the given channel capacity.
pub fn channel(capacity: usize) -> (EventSender, mpsc::Receiver<Event>) {
    let (tx, rx) = mpsc::channel(capacity);
    (EventSender::new(tx), rx)
}

/// Drains the event channel and logs each event. Runs until every sender is
/// dropped.
pub async fn process_events(mut rx: mpsc::Receiver<Event>) {
    info!("Starting event processing loop");

    while let Some(event) = rx.recv().await {
        match &event {
            Event::StockAdjusted {
                product_id,
                change_qty,
                new_quantity,
                reason,
                ..
            } => {
                info!(
                    product_id = %product_id,
                    change_qty = %change_qty,
                    new_quantity = %new_quantity,
                    reason = %reason,
                    "Stock adjusted"
                );
            }
            Event::InvoiceFinalized(invoice_id) => {
                info!(invoice_id = %invoice_id, "Invoice finalized");
            }
            Event::InvoiceCancelled {
                invoice_id,
                previous_status,
            } => {
                info!(invoice_id = %invoice_id, previous_status = %previous_status, "Invoice cancelled");
            }
            other => {
                debug!(event = ?other, "Domain event");
            }
        }
    }

    info!("Event processing loop stopped");
}
