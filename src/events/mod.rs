use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    /// Creates a new EventSender
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Sends an event asynchronously
    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }

    /// Publishes an event after a committed change. Failures are logged and
    /// never surface to the caller.
    pub async fn send_or_log(&self, event: Event) {
        metrics::counter!("ilms.events.published", 1);
        if let Err(e) = self.send(event).await {
            metrics::counter!("ilms.events.dropped", 1);
            warn!(error = %e, "Domain event dropped");
        }
    }
}

/// Domain events published once the corresponding transaction has committed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    InventoryRegistered {
        material_id: Uuid,
        count: usize,
    },
    InventoryConfirmed {
        item_id: Uuid,
        serial_number: String,
        location_id: Uuid,
    },
    InventoryVoided(Uuid),

    ContainerCreated {
        container_id: Uuid,
        serial_number: String,
    },
    ContainerPacked {
        container_id: Uuid,
        packed: usize,
        current_count: i32,
    },
    ContainerUnpacked {
        container_id: Uuid,
        removed: usize,
        current_count: i32,
    },
    ContainerSealed(Uuid),

    ShipmentCreated {
        shipment_id: Uuid,
        shipment_number: String,
    },
    ShipmentLoaded {
        shipment_id: Uuid,
        added: usize,
    },
    ShipmentDispatched(Uuid),
    ShipmentInTransit(Uuid),
    ShipmentDelivered(Uuid),
    ShipmentCancelled(Uuid),
}

impl Event {
    pub fn name(&self) -> &'static str {
        match self {
            Event::InventoryRegistered { .. } => "inventory_registered",
            Event::InventoryConfirmed { .. } => "inventory_confirmed",
            Event::InventoryVoided(_) => "inventory_voided",
            Event::ContainerCreated { .. } => "container_created",
            Event::ContainerPacked { .. } => "container_packed",
            Event::ContainerUnpacked { .. } => "container_unpacked",
            Event::ContainerSealed(_) => "container_sealed",
            Event::ShipmentCreated { .. } => "shipment_created",
            Event::ShipmentLoaded { .. } => "shipment_loaded",
            Event::ShipmentDispatched(_) => "shipment_dispatched",
            Event::ShipmentInTransit(_) => "shipment_in_transit",
            Event::ShipmentDelivered(_) => "shipment_delivered",
            Event::ShipmentCancelled(_) => "shipment_cancelled",
        }
    }
}

/// Creates the bounded channel the services publish into.
pub fn channel(capacity: usize) -> (EventSender, mpsc::Receiver<Event>) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (EventSender::new(tx), rx)
}

pub async fn process_events(mut rx: mpsc::Receiver<Event>) {
    info!("Starting event processing loop");

    while let Some(event) = rx.recv().await {
        match &event {
            Event::ContainerSealed(container_id) => {
                info!(%container_id, "Container sealed and ready for shipment");
            }
            Event::ShipmentDispatched(shipment_id) => {
                info!(%shipment_id, "Shipment dispatched");
            }
            Event::ShipmentDelivered(shipment_id) => {
                info!(%shipment_id, "Shipment delivered");
            }
            Event::ShipmentCancelled(shipment_id) => {
                warn!(%shipment_id, "Shipment cancelled");
            }
            other => {
                info!(event = other.name(), payload = ?other, "Received event");
            }
        }
    }

    warn!("Event processing loop has ended");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn send_delivers_to_receiver() {
        let (sender, mut rx) = channel(4);
        let id = Uuid::new_v4();
        sender.send_or_log(Event::ContainerSealed(id)).await;
        assert_eq!(rx.recv().await, Some(Event::ContainerSealed(id)));
    }

    #[tokio::test]
    async fn closed_channel_does_not_fail_the_caller() {
        let (sender, rx) = channel(1);
        drop(rx);
        assert!(sender.send(Event::ShipmentDispatched(Uuid::new_v4())).await.is_err());
        // send_or_log swallows the error
        sender.send_or_log(Event::ShipmentDispatched(Uuid::new_v4())).await;
    }
}
