//! Booking lifecycle events and best-effort notification delivery.
//!
//! - [`EventBus`] -- in-process publish/subscribe hub backed by
//!   `tokio::sync::broadcast`.
//! - [`BookingEvent`] -- the event envelope published by the API.
//! - [`NotificationDispatcher`] -- background consumer that forwards events
//!   to the notification gateway.
//! - [`delivery`] -- outbound channels (signed webhook).

pub mod bus;
pub mod delivery;
pub mod dispatcher;

pub use bus::{BookingEvent, EventBus};
pub use delivery::webhook::{WebhookDelivery, WebhookError};
pub use dispatcher::{NotificationDispatcher, WebhookTarget};
