//! Class session rows and scheduling DTOs.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use studio_core::capacity::SpotCounter;
use studio_core::class_session::SessionStatus;
use studio_core::types::{DbId, Timestamp};
use validator::Validate;

use super::booking::Booking;

/// A row from the `class_sessions` table.
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassSession {
    pub id: DbId,
    pub tenant_id: DbId,
    pub class_type_id: DbId,
    pub location_id: DbId,
    pub starts_at: Timestamp,
    pub ends_at: Timestamp,
    pub capacity: i32,
    pub spots_booked: i32,
    #[sqlx(rename = "status_id", try_from = "i16")]
    pub status: SessionStatus,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl ClassSession {
    pub fn counter(&self) -> SpotCounter {
        SpotCounter::new(self.capacity, self.spots_booked)
    }

    /// Copy the tracker's counters back onto the row.
    pub fn apply_counter(&mut self, counter: SpotCounter) {
        self.capacity = counter.capacity;
        self.spots_booked = counter.spots_booked;
    }
}

/// DTO for scheduling a new session.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateClassSession {
    #[validate(range(min = 1))]
    pub class_type_id: DbId,
    #[validate(range(min = 1))]
    pub location_id: DbId,
    pub starts_at: Timestamp,
    pub ends_at: Timestamp,
    /// Upper bound matches `studio_core::class_session::MAX_CAPACITY`.
    #[validate(range(min = 1, max = 1000))]
    pub capacity: i32,
}

/// DTO for changing a session's capacity.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCapacity {
    #[validate(range(min = 1, max = 1000))]
    pub capacity: i32,
}

/// Filters for listing a tenant's sessions.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionListQuery {
    /// Only sessions starting at or after this instant.
    pub from: Option<Timestamp>,
    /// Only sessions starting before this instant.
    pub to: Option<Timestamp>,
    pub limit: Option<i64>,
}

impl SessionListQuery {
    pub const DEFAULT_LIMIT: i64 = 100;
    pub const MAX_LIMIT: i64 = 500;

    pub fn effective_limit(&self) -> i64 {
        self.limit
            .unwrap_or(Self::DEFAULT_LIMIT)
            .clamp(1, Self::MAX_LIMIT)
    }

    pub fn matches(&self, starts_at: Timestamp) -> bool {
        self.from.is_none_or(|from| starts_at >= from) && self.to.is_none_or(|to| starts_at < to)
    }
}

/// Result of a session status change.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionTransition {
    pub session: ClassSession,
    /// Bookings cancelled because the session itself was cancelled.
    pub cancelled_bookings: Vec<Booking>,
}

/// Result of a capacity change.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CapacityChange {
    pub session: ClassSession,
    /// Waitlisted bookings confirmed into the newly opened spots, oldest first.
    pub promoted: Vec<Booking>,
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};

    use super::*;

    #[test]
    fn list_limit_is_clamped() {
        let mut query = SessionListQuery::default();
        assert_eq!(query.effective_limit(), SessionListQuery::DEFAULT_LIMIT);
        query.limit = Some(0);
        assert_eq!(query.effective_limit(), 1);
        query.limit = Some(10_000);
        assert_eq!(query.effective_limit(), SessionListQuery::MAX_LIMIT);
    }

    #[test]
    fn list_range_is_half_open() {
        let from = Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).unwrap();
        let to = from + Duration::days(1);
        let query = SessionListQuery {
            from: Some(from),
            to: Some(to),
            limit: None,
        };
        assert!(query.matches(from));
        assert!(!query.matches(to));
        assert!(!query.matches(from - Duration::seconds(1)));
    }

    #[test]
    fn create_dto_rejects_zero_capacity() {
        let json = serde_json::json!({
            "classTypeId": 1,
            "locationId": 1,
            "startsAt": "2026-03-02T18:00:00Z",
            "endsAt": "2026-03-02T19:00:00Z",
            "capacity": 0
        });
        let dto: CreateClassSession = serde_json::from_value(json).unwrap();
        assert!(dto.validate().is_err());
    }
}
