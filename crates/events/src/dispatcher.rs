//! Background consumer that forwards booking events to members.
//!
//! Delivery is best-effort: a failed delivery is logged and dropped, and
//! nothing here can fail or delay the request that published the event.

use tokio::sync::broadcast;

use crate::bus::BookingEvent;
use crate::delivery::webhook::WebhookDelivery;

/// Where notification events are sent.
pub struct WebhookTarget {
    pub url: String,
    pub secret: String,
}

pub struct NotificationDispatcher {
    target: Option<WebhookTarget>,
    delivery: WebhookDelivery,
}

impl NotificationDispatcher {
    /// Without a target, events are only logged.
    pub fn new(target: Option<WebhookTarget>) -> Self {
        Self {
            target,
            delivery: WebhookDelivery::new(),
        }
    }

    pub fn with_delivery(mut self, delivery: WebhookDelivery) -> Self {
        self.delivery = delivery;
        self
    }

    /// Consume events until the bus is dropped.
    ///
    /// Returns the number of events handled.
    pub async fn run(self, mut receiver: broadcast::Receiver<BookingEvent>) -> u64 {
        let mut handled = 0;
        loop {
            match receiver.recv().await {
                Ok(event) => {
                    self.dispatch(&event).await;
                    handled += 1;
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(skipped = n, "Notification dispatcher lagged");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    tracing::info!("Event bus closed, notification dispatcher shutting down");
                    break;
                }
            }
        }
        handled
    }

    async fn dispatch(&self, event: &BookingEvent) {
        let Some(target) = &self.target else {
            tracing::info!(
                event_type = %event.event_type,
                tenant_id = event.tenant_id,
                member_id = event.member_id,
                source_entity_id = event.source_entity_id,
                "Notification event (no gateway configured)"
            );
            return;
        };

        if let Err(e) = self.delivery.deliver(&target.url, &target.secret, event).await {
            tracing::error!(
                event_type = %event.event_type,
                tenant_id = event.tenant_id,
                error = %e,
                "Dropping notification event"
            );
        }
    }
}
