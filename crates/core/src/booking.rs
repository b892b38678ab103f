//! Booking status and state machine.
//!
//! Status ids match the `booking_statuses` seed data (1-based SMALLINT).
//! Both store backends route every status change through
//! [`validate_transition`] so the legal edges live in one place.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Lifecycle status of a member's booking on a class session.
#[repr(i16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookingStatus {
    Confirmed = 1,
    Waitlisted = 2,
    CheckedIn = 3,
    NoShow = 4,
    Cancelled = 5,
}

/// Statuses that hold a member's place on a session.
pub const ACTIVE_STATUSES: [BookingStatus; 3] = [
    BookingStatus::Confirmed,
    BookingStatus::Waitlisted,
    BookingStatus::CheckedIn,
];

/// Statuses shown on a session roster.
pub const ROSTER_STATUSES: [BookingStatus; 2] =
    [BookingStatus::Confirmed, BookingStatus::CheckedIn];

impl BookingStatus {
    /// Return the database status ID.
    pub fn id(self) -> i16 {
        self as i16
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Confirmed => "CONFIRMED",
            Self::Waitlisted => "WAITLISTED",
            Self::CheckedIn => "CHECKED_IN",
            Self::NoShow => "NO_SHOW",
            Self::Cancelled => "CANCELLED",
        }
    }

    /// Terminal statuses have no outbound transitions.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::CheckedIn | Self::NoShow | Self::Cancelled)
    }

    /// Whether this booking counts against the one-active-booking-per-member rule.
    pub fn is_active(self) -> bool {
        ACTIVE_STATUSES.contains(&self)
    }

    /// Whether this booking is counted in the session's `spots_booked`.
    ///
    /// Check-in and no-show keep the spot; only cancellation releases it.
    pub fn holds_spot(self) -> bool {
        matches!(self, Self::Confirmed | Self::CheckedIn | Self::NoShow)
    }
}

impl std::fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raised when a stored status id has no matching variant.
#[derive(Debug, thiserror::Error)]
#[error("unknown booking status id {0}")]
pub struct UnknownBookingStatus(pub i16);

impl TryFrom<i16> for BookingStatus {
    type Error = UnknownBookingStatus;

    fn try_from(value: i16) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::Confirmed),
            2 => Ok(Self::Waitlisted),
            3 => Ok(Self::CheckedIn),
            4 => Ok(Self::NoShow),
            5 => Ok(Self::Cancelled),
            other => Err(UnknownBookingStatus(other)),
        }
    }
}

/// Status a new booking starts in, decided by the capacity check.
pub fn initial_status(has_open_spot: bool) -> BookingStatus {
    if has_open_spot {
        BookingStatus::Confirmed
    } else {
        BookingStatus::Waitlisted
    }
}

/// Returns the set of statuses reachable from `from`.
pub fn valid_transitions(from: BookingStatus) -> &'static [BookingStatus] {
    use BookingStatus::*;
    match from {
        Confirmed => &[CheckedIn, NoShow, Cancelled],
        // Waitlisted -> Confirmed only happens through waitlist promotion.
        Waitlisted => &[Confirmed, Cancelled],
        CheckedIn | NoShow | Cancelled => &[],
    }
}

pub fn can_transition(from: BookingStatus, to: BookingStatus) -> bool {
    valid_transitions(from).contains(&to)
}

/// Validate a booking transition, mapping illegal edges to [`CoreError::InvalidState`].
pub fn validate_transition(from: BookingStatus, to: BookingStatus) -> Result<(), CoreError> {
    if can_transition(from, to) {
        return Ok(());
    }
    if from.is_terminal() {
        return Err(CoreError::InvalidState(format!(
            "Booking is already {from} and cannot become {to}"
        )));
    }
    Err(CoreError::InvalidState(format!(
        "Booking cannot move from {from} to {to}"
    )))
}
