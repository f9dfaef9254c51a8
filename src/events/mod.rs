use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

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

    /// Sends an event, logging instead of failing when the receiver is gone.
    /// Event delivery is best-effort; request handling must not depend on it.
    pub async fn send_or_log(&self, event: Event) {
        if let Err(e) = self.send(event).await {
            error!("Event delivery failed: {}", e);
        }
    }
}

// Define the various events that can occur in the system.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    // User events
    UserRegistered(i64),
    UserLoggedIn(i64),

    // Catalog events
    ProductCreated(i64),
    ProductUpdated(i64),
    ProductDeleted(i64),
    VariantCreated { product_id: i64, variant_id: i64 },
    VariantUpdated { product_id: i64, variant_id: i64 },
    VariantDeleted { product_id: i64, variant_id: i64 },
    CategoryCreated(i64),
    CategoryDeleted(i64),

    // Order events
    OrderCreated(i64),
    OrderUpdated(i64),
    OrderDeleted(i64),
    OrderStatusChanged {
        order_id: i64,
        old_status: String,
        new_status: String,
    },
    OrderItemAdded { order_id: i64, item_id: i64 },
    OrderItemUpdated { order_id: i64, item_id: i64 },
    OrderItemRemoved { order_id: i64, item_id: i64 },
    OrderTotalRecalculated { order_id: i64, total: Decimal },
    InvoiceRendered { order_id: i64 },

    // Engagement events
    ReviewSubmitted { review_id: i64, product_id: i64 },
    ReviewModerated { review_id: i64, approved: bool },
    ReviewDeleted { review_id: i64 },
    FavoriteAdded { user_id: i64, product_id: i64 },
    FavoriteRemoved { user_id: i64, product_id: i64 },

    // Promotion events
    PromoCreated(i64),
    PromoUpdated(i64),
    PromoDeleted(i64),
}

// Function to process incoming events and distribute them to registered event handlers.
pub async fn process_events(mut rx: mpsc::Receiver<Event>) {
    info!("Starting event processing loop");

    while let Some(event) = rx.recv().await {
        debug!("Received event: {:?}", event);

        match event {
            Event::OrderCreated(order_id) => {
                info!("Order {} created", order_id);
            }
            Event::OrderStatusChanged {
                order_id,
                old_status,
                new_status,
            } => {
                info!(
                    "Order {} moved from {} to {}",
                    order_id, old_status, new_status
                );
            }
            Event::OrderTotalRecalculated { order_id, total } => {
                debug!("Order {} total recalculated to {}", order_id, total);
            }
            Event::ReviewSubmitted {
                review_id,
                product_id,
            } => {
                info!(
                    "Review {} for product {} awaiting moderation",
                    review_id, product_id
                );
            }
            Event::InvoiceRendered { order_id } => {
                info!("Invoice rendered for order {}", order_id);
            }
            _ => {
                debug!("No specific handler for event: {:?}", event);
            }
        }
    }

    warn!("Event processing loop has ended");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn send_delivers_event_to_receiver() {
        let (tx, mut rx) = mpsc::channel(4);
        let sender = EventSender::new(tx);

        sender
            .send(Event::OrderCreated(7))
            .await
            .expect("send should succeed");

        match rx.recv().await {
            Some(Event::OrderCreated(id)) => assert_eq!(id, 7),
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[tokio::test]
    async fn send_or_log_swallows_closed_channel() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let sender = EventSender::new(tx);

        // Must not panic or return an error to the caller
        sender.send_or_log(Event::ProductDeleted(1)).await;
    }

    #[tokio::test]
    async fn send_reports_closed_channel() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let sender = EventSender::new(tx);

        assert!(sender.send(Event::ProductDeleted(1)).await.is_err());
    }
}
