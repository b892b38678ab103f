//! Booking rows and request DTOs.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use studio_core::booking::BookingStatus;
use studio_core::types::{DbId, Timestamp};
use validator::Validate;

/// A row from the `bookings` table.
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    pub id: DbId,
    pub tenant_id: DbId,
    pub member_id: DbId,
    pub class_session_id: DbId,
    #[sqlx(rename = "status_id", try_from = "i16")]
    pub status: BookingStatus,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    pub cancelled_at: Option<Timestamp>,
    pub checked_in_at: Option<Timestamp>,
    pub promoted_at: Option<Timestamp>,
}

impl Booking {
    /// Waitlist order: creation time, then insertion id.
    pub fn queue_key(&self) -> (Timestamp, DbId) {
        (self.created_at, self.id)
    }

    /// Apply a status change and stamp the matching timestamp column.
    ///
    /// Mirrors `BookingRepo::update_status` for the in-process backend.
    pub fn apply_status(&mut self, status: BookingStatus, now: Timestamp) {
        match status {
            BookingStatus::Cancelled => self.cancelled_at = Some(now),
            BookingStatus::CheckedIn => self.checked_in_at = Some(now),
            BookingStatus::Confirmed if self.status == BookingStatus::Waitlisted => {
                self.promoted_at = Some(now)
            }
            _ => {}
        }
        self.status = status;
        self.updated_at = now;
    }
}

/// DTO for `POST /bookings`.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateBooking {
    #[validate(range(min = 1))]
    pub class_session_id: DbId,
    /// Staff may book on behalf of a member; members book for themselves.
    #[validate(range(min = 1))]
    pub member_id: Option<DbId>,
}

/// DTO for `POST /bookings/check-in/qr`.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct QrCheckIn {
    #[validate(length(min = 1, max = 512))]
    pub payload: String,
}

/// Result of cancelling a booking.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelOutcome {
    pub cancelled: Booking,
    /// The waitlisted booking that took the freed spot, if any.
    pub promoted: Option<Booking>,
}

/// A waitlisted booking with its 1-based queue position.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WaitlistEntry {
    pub position: usize,
    #[serde(flatten)]
    pub booking: Booking,
}

impl WaitlistEntry {
    /// Number an already FIFO-ordered waitlist.
    pub fn from_queue(bookings: Vec<Booking>) -> Vec<Self> {
        bookings
            .into_iter()
            .enumerate()
            .map(|(i, booking)| Self {
                position: i + 1,
                booking,
            })
            .collect()
    }
}
