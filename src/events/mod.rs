use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::models::alert::AlertLevel;

/// Telemetry events emitted by the core.
///
/// Emission is fire-and-forget: a full or closed channel drops the event with
/// a warning and never blocks or fails the operation that produced it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    LevelAdjusted {
        level_id: Uuid,
        item_id: Uuid,
        previous_on_hand: i32,
        new_on_hand: i32,
        reason: String,
    },
    InventoryReserved {
        level_id: Uuid,
        item_id: Uuid,
        quantity: i32,
    },
    InventoryReleased {
        level_id: Uuid,
        item_id: Uuid,
        quantity: i32,
    },
    CycleCounted {
        level_id: Uuid,
        counted_quantity: i32,
        variance: i32,
        counted_by: Uuid,
    },
    TransactionCreated(Uuid),
    TransactionApproved(Uuid),
    TransactionRejected(Uuid),
    TransactionCompleted(Uuid),
    TransactionCancelled {
        transaction_id: Uuid,
        reason: String,
    },
    StockAlertRaised {
        alert_id: Uuid,
        level_id: Uuid,
        item_id: Uuid,
        alert_level: AlertLevel,
    },
    StockAlertResolved {
        alert_id: Uuid,
        level_id: Uuid,
    },
    ForecastGenerated {
        item_id: Uuid,
        property_id: Option<Uuid>,
        horizon_days: u32,
        model_version: String,
        generated_at: DateTime<Utc>,
    },
}

/// Handle for emitting telemetry events into the collector channel.
#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Emits an event without waiting. Dropped events are logged, not
    /// surfaced: telemetry must never fail the request path it instruments.
    pub fn send(&self, event: Event) {
        if let Err(e) = self.sender.try_send(event) {
            warn!(error = %e, "Dropping telemetry event");
        }
    }
}

/// Creates the telemetry channel. The receiver side is handed to
/// [`process_events`]; shutdown is dropping every `EventSender` clone and
/// awaiting the drain task.
pub fn channel(buffer: usize) -> (EventSender, mpsc::Receiver<Event>) {
    let (tx, rx) = mpsc::channel(buffer);
    (EventSender::new(tx), rx)
}

/// Drains the telemetry channel until all senders are dropped.
pub async fn process_events(mut rx: mpsc::Receiver<Event>) {
    while let Some(event) = rx.recv().await {
        debug!(?event, "inventory event");
    }
    debug!("telemetry channel closed, event processing stopped");
}
