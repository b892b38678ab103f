//! Check-in and no-show timing policy.

use chrono::Duration;

use crate::error::CoreError;
use crate::types::Timestamp;

/// Default minutes before start at which check-in opens.
///
/// Deployment default only; studios override it with `CHECK_IN_GRACE_MINS`.
pub const DEFAULT_GRACE_MINS: i64 = 30;

/// When a confirmed booking may be checked in.
///
/// The window runs from `starts_at - grace` through `ends_at`, inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckInPolicy {
    pub grace: Duration,
}

impl CheckInPolicy {
    pub fn new(grace_mins: i64) -> Self {
        Self {
            grace: Duration::minutes(grace_mins),
        }
    }

    pub fn opens_at(&self, starts_at: Timestamp) -> Timestamp {
        starts_at - self.grace
    }

    pub fn is_open(&self, starts_at: Timestamp, ends_at: Timestamp, now: Timestamp) -> bool {
        now >= self.opens_at(starts_at) && now <= ends_at
    }

    pub fn ensure_open(
        &self,
        starts_at: Timestamp,
        ends_at: Timestamp,
        now: Timestamp,
    ) -> Result<(), CoreError> {
        if self.is_open(starts_at, ends_at, now) {
            return Ok(());
        }
        Err(CoreError::InvalidState(format!(
            "Check-in is only open from {} until {}",
            self.opens_at(starts_at).to_rfc3339(),
            ends_at.to_rfc3339()
        )))
    }
}

impl Default for CheckInPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_GRACE_MINS)
    }
}

/// No-shows can only be recorded once the session is over.
pub fn ensure_no_show_allowed(ends_at: Timestamp, now: Timestamp) -> Result<(), CoreError> {
    if now < ends_at {
        return Err(CoreError::InvalidState(
            "No-shows can only be recorded after the class session ends".into(),
        ));
    }
    Ok(())
}
