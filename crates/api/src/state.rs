use std::sync::Arc;

use studio_db::store::BookingStore;
use studio_events::EventBus;

use crate::config::ServerConfig;

/// Shared application state available to all handlers via `State<AppState>`.
#[derive(Clone)]
pub struct AppState {
    /// Booking lifecycle store (Postgres or in-process).
    pub store: Arc<dyn BookingStore>,
    pub config: Arc<ServerConfig>,
    /// Lifecycle events for the notification dispatcher.
    pub event_bus: Arc<EventBus>,
}
