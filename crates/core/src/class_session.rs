//! Class session status, lifecycle transitions, and scheduling validation.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::Timestamp;

/// Upper bound on a single session's capacity.
pub const MAX_CAPACITY: i32 = 1000;

/// Lifecycle status of a scheduled class occurrence.
///
/// Ids match the `class_session_statuses` seed data.
#[repr(i16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionStatus {
    Scheduled = 1,
    InProgress = 2,
    Completed = 3,
    Cancelled = 4,
}

impl SessionStatus {
    /// Return the database status ID.
    pub fn id(self) -> i16 {
        self as i16
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Scheduled => "SCHEDULED",
            Self::InProgress => "IN_PROGRESS",
            Self::Completed => "COMPLETED",
            Self::Cancelled => "CANCELLED",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }

    /// Whether a freed spot should still go to the next waitlisted member.
    pub fn promotes_waitlist(self) -> bool {
        matches!(self, Self::Scheduled | Self::InProgress)
    }
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown class session status id {0}")]
pub struct UnknownSessionStatus(pub i16);

impl TryFrom<i16> for SessionStatus {
    type Error = UnknownSessionStatus;

    fn try_from(value: i16) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::Scheduled),
            2 => Ok(Self::InProgress),
            3 => Ok(Self::Completed),
            4 => Ok(Self::Cancelled),
            other => Err(UnknownSessionStatus(other)),
        }
    }
}

/// Returns the set of statuses reachable from `from`.
pub fn valid_transitions(from: SessionStatus) -> &'static [SessionStatus] {
    use SessionStatus::*;
    match from {
        Scheduled => &[InProgress, Cancelled],
        InProgress => &[Completed, Cancelled],
        Completed | Cancelled => &[],
    }
}

pub fn validate_transition(from: SessionStatus, to: SessionStatus) -> Result<(), CoreError> {
    if valid_transitions(from).contains(&to) {
        Ok(())
    } else {
        Err(CoreError::InvalidState(format!(
            "Class session cannot move from {from} to {to}"
        )))
    }
}

/// Check that a session can take a new booking at `now`.
pub fn ensure_bookable(
    status: SessionStatus,
    ends_at: Timestamp,
    now: Timestamp,
) -> Result<(), CoreError> {
    if status != SessionStatus::Scheduled {
        return Err(CoreError::InvalidState(format!(
            "Class session is {status} and no longer accepts bookings"
        )));
    }
    if now >= ends_at {
        return Err(CoreError::InvalidState(
            "Class session has already ended".into(),
        ));
    }
    Ok(())
}

/// Validate the schedule and capacity of a new session.
pub fn validate_schedule(
    starts_at: Timestamp,
    ends_at: Timestamp,
    capacity: i32,
) -> Result<(), CoreError> {
    if ends_at <= starts_at {
        return Err(CoreError::Validation(
            "endsAt must be after startsAt".into(),
        ));
    }
    validate_capacity(capacity)
}

pub fn validate_capacity(capacity: i32) -> Result<(), CoreError> {
    if !(1..=MAX_CAPACITY).contains(&capacity) {
        return Err(CoreError::Validation(format!(
            "capacity must be between 1 and {MAX_CAPACITY}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use chrono::{Duration, TimeZone, Utc};

    use super::SessionStatus::*;
    use super::*;

    fn at(hour: u32) -> Timestamp {
        Utc.with_ymd_and_hms(2026, 3, 2, hour, 0, 0).unwrap()
    }

    #[test]
    fn lifecycle_edges() {
        assert!(validate_transition(Scheduled, InProgress).is_ok());
        assert!(validate_transition(Scheduled, Cancelled).is_ok());
        assert!(validate_transition(InProgress, Completed).is_ok());
        assert!(validate_transition(InProgress, Cancelled).is_ok());
        assert!(validate_transition(Scheduled, Completed).is_err());
    }

    #[test]
    fn terminal_sessions_cannot_move() {
        assert_matches!(
            validate_transition(Cancelled, Scheduled),
            Err(CoreError::InvalidState(_))
        );
        assert_matches!(
            validate_transition(Completed, Cancelled),
            Err(CoreError::InvalidState(_))
        );
    }

    #[test]
    fn only_running_sessions_promote() {
        assert!(Scheduled.promotes_waitlist());
        assert!(InProgress.promotes_waitlist());
        assert!(!Completed.promotes_waitlist());
        assert!(!Cancelled.promotes_waitlist());
    }

    #[test]
    fn scheduled_future_session_is_bookable() {
        assert!(ensure_bookable(Scheduled, at(10), at(8)).is_ok());
    }

    #[test]
    fn cancelled_session_is_not_bookable() {
        assert_matches!(
            ensure_bookable(Cancelled, at(10), at(8)),
            Err(CoreError::InvalidState(_))
        );
    }

    #[test]
    fn ended_session_is_not_bookable() {
        assert_matches!(
            ensure_bookable(Scheduled, at(10), at(10)),
            Err(CoreError::InvalidState(_))
        );
    }

    #[test]
    fn schedule_requires_end_after_start() {
        assert_matches!(
            validate_schedule(at(10), at(10), 5),
            Err(CoreError::Validation(_))
        );
        assert!(validate_schedule(at(10), at(10) + Duration::minutes(45), 5).is_ok());
    }

    #[test]
    fn capacity_bounds() {
        assert!(validate_capacity(0).is_err());
        assert!(validate_capacity(1).is_ok());
        assert!(validate_capacity(MAX_CAPACITY).is_ok());
        assert!(validate_capacity(MAX_CAPACITY + 1).is_err());
    }
}
