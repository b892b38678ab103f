//! Builders for the lifecycle events handlers publish.

use serde_json::json;
use studio_core::booking::BookingStatus;
use studio_db::models::booking::Booking;
use studio_db::models::class_session::ClassSession;
use studio_events::bus::{self, BookingEvent, ENTITY_BOOKING, ENTITY_CLASS_SESSION};

use crate::middleware::auth::AuthUser;
use crate::state::AppState;

pub fn booking_event(event_type: &str, booking: &Booking, actor: &AuthUser) -> BookingEvent {
    BookingEvent::new(event_type, booking.tenant_id)
        .with_source(ENTITY_BOOKING, booking.id)
        .with_member(booking.member_id)
        .with_actor(actor.user_id)
        .with_payload(json!({
            "bookingId": booking.id,
            "classSessionId": booking.class_session_id,
            "status": booking.status,
        }))
}

/// Event announcing a newly created booking.
pub fn created_event_type(booking: &Booking) -> &'static str {
    match booking.status {
        BookingStatus::Waitlisted => bus::BOOKING_WAITLISTED,
        _ => bus::BOOKING_CONFIRMED,
    }
}

pub fn session_cancelled_event(session: &ClassSession, actor: &AuthUser) -> BookingEvent {
    BookingEvent::new(bus::CLASS_SESSION_CANCELLED, session.tenant_id)
        .with_source(ENTITY_CLASS_SESSION, session.id)
        .with_actor(actor.user_id)
        .with_payload(json!({
            "classSessionId": session.id,
            "startsAt": session.starts_at,
        }))
}

pub fn publish_booking(state: &AppState, event_type: &str, booking: &Booking, actor: &AuthUser) {
    state
        .event_bus
        .publish(booking_event(event_type, booking, actor));
}

/// Publish one event per booking, e.g. for promotions after a capacity change.
pub fn publish_bookings(
    state: &AppState,
    event_type: &str,
    bookings: &[Booking],
    actor: &AuthUser,
) {
    for booking in bookings {
        publish_booking(state, event_type, booking, actor);
    }
}
