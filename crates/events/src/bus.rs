//! In-process event bus backed by a `tokio::sync::broadcast` channel.
//!
//! Shared as `Arc<EventBus>`. Publishing never blocks and never fails the
//! caller; with no subscribers the event is dropped.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use studio_core::types::DbId;
use tokio::sync::broadcast;

// ---------------------------------------------------------------------------
// Event types
// ---------------------------------------------------------------------------

pub const BOOKING_CONFIRMED: &str = "booking.confirmed";
pub const BOOKING_WAITLISTED: &str = "booking.waitlisted";
pub const BOOKING_CANCELLED: &str = "booking.cancelled";
pub const BOOKING_PROMOTED: &str = "booking.promoted";
pub const BOOKING_CHECKED_IN: &str = "booking.checked_in";
pub const BOOKING_NO_SHOW: &str = "booking.no_show";
pub const CLASS_SESSION_CANCELLED: &str = "class_session.cancelled";

pub const ENTITY_BOOKING: &str = "booking";
pub const ENTITY_CLASS_SESSION: &str = "class_session";

// ---------------------------------------------------------------------------
// BookingEvent
// ---------------------------------------------------------------------------

/// A booking lifecycle event, always scoped to one tenant.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingEvent {
    /// Dot-separated event name, e.g. `"booking.promoted"`.
    pub event_type: String,
    pub tenant_id: DbId,
    pub source_entity_type: Option<String>,
    pub source_entity_id: Option<DbId>,
    /// Member the notification is about, when there is one.
    pub member_id: Option<DbId>,
    /// User whose request caused the event.
    pub actor_user_id: Option<DbId>,
    pub payload: serde_json::Value,
    pub timestamp: DateTime<Utc>,
}

impl BookingEvent {
    pub fn new(event_type: impl Into<String>, tenant_id: DbId) -> Self {
        Self {
            event_type: event_type.into(),
            tenant_id,
            source_entity_type: None,
            source_entity_id: None,
            member_id: None,
            actor_user_id: None,
            payload: serde_json::Value::Object(Default::default()),
            timestamp: Utc::now(),
        }
    }

    pub fn with_source(mut self, entity_type: impl Into<String>, entity_id: DbId) -> Self {
        self.source_entity_type = Some(entity_type.into());
        self.source_entity_id = Some(entity_id);
        self
    }

    pub fn with_member(mut self, member_id: DbId) -> Self {
        self.member_id = Some(member_id);
        self
    }

    pub fn with_actor(mut self, user_id: DbId) -> Self {
        self.actor_user_id = Some(user_id);
        self
    }

    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = payload;
        self
    }
}

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

const DEFAULT_CAPACITY: usize = 1024;

/// Fan-out bus for [`BookingEvent`]s.
pub struct EventBus {
    sender: broadcast::Sender<BookingEvent>,
}

impl EventBus {
    /// Create a bus with a specific channel capacity.
    ///
    /// Slow receivers that fall more than `capacity` events behind observe
    /// `RecvError::Lagged`.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn publish(&self, event: BookingEvent) {
        // SendError only means there are no receivers.
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<BookingEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}
