//! Booking lifecycle store.
//!
//! [`BookingStore`] is the single seam between the HTTP layer and
//! persistence. Every method that touches `spots_booked` or a session's
//! bookings runs as one unit serialized on that session:
//!
//! - [`postgres::PgBookingStore`] -- one transaction per call, session row
//!   locked with `SELECT ... FOR UPDATE` before any booking row.
//! - [`memory::MemoryBookingStore`] -- one `tokio::sync::Mutex` per
//!   session, held for the whole call. Not durable; for local runs and tests.
//!
//! Both backends apply the same rules from `studio_core` (capacity tracker,
//! booking and session state machines, check-in policy).

use async_trait::async_trait;
use studio_core::booking::{validate_transition, BookingStatus};
use studio_core::check_in::{self, CheckInPolicy};
use studio_core::class_session::SessionStatus;
use studio_core::error::CoreError;
use studio_core::types::{DbId, Timestamp};

use crate::models::booking::{Booking, CancelOutcome};
use crate::models::class_session::{
    CapacityChange, ClassSession, CreateClassSession, SessionListQuery, SessionTransition,
};

pub mod memory;
pub mod postgres;

pub use memory::MemoryBookingStore;
pub use postgres::PgBookingStore;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A domain rule rejected the operation.
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

// ---------------------------------------------------------------------------
// Lifecycle rules shared by both backends
// ---------------------------------------------------------------------------

/// Log and pass through a capacity invariant violation.
pub(crate) fn guard_capacity(
    result: Result<(), CoreError>,
    class_session_id: DbId,
) -> Result<(), CoreError> {
    if let Err(ref e) = result {
        tracing::error!(class_session_id, error = %e, "Capacity invariant violated");
    }
    result
}

pub(crate) fn ensure_no_active_booking(existing: Option<&Booking>) -> Result<(), CoreError> {
    match existing {
        Some(b) => Err(CoreError::Conflict(format!(
            "Member already holds booking {} ({}) on this class session",
            b.id, b.status
        ))),
        None => Ok(()),
    }
}

pub(crate) fn ensure_check_in_allowed(
    session: &ClassSession,
    booking: &Booking,
    policy: &CheckInPolicy,
    now: Timestamp,
) -> Result<(), CoreError> {
    validate_transition(booking.status, BookingStatus::CheckedIn)?;
    if session.status.is_terminal() {
        return Err(CoreError::InvalidState(format!(
            "Class session is {}; check-in is closed",
            session.status
        )));
    }
    policy.ensure_open(session.starts_at, session.ends_at, now)
}

pub(crate) fn ensure_no_show_allowed(
    session: &ClassSession,
    booking: &Booking,
    now: Timestamp,
) -> Result<(), CoreError> {
    validate_transition(booking.status, BookingStatus::NoShow)?;
    check_in::ensure_no_show_allowed(session.ends_at, now)
}

pub(crate) fn ensure_capacity_editable(session: &ClassSession) -> Result<(), CoreError> {
    if session.status != SessionStatus::Scheduled {
        return Err(CoreError::InvalidState(format!(
            "Capacity can only change while SCHEDULED (session is {})",
            session.status
        )));
    }
    Ok(())
}

pub(crate) fn active_booking_not_found(class_session_id: DbId) -> StoreError {
    StoreError::Core(CoreError::NotFound {
        entity: "Active booking on ClassSession",
        id: class_session_id,
    })
}

pub(crate) fn booking_not_found(id: DbId) -> StoreError {
    StoreError::Core(CoreError::NotFound {
        entity: "Booking",
        id,
    })
}

pub(crate) fn session_not_found(id: DbId) -> StoreError {
    StoreError::Core(CoreError::NotFound {
        entity: "ClassSession",
        id,
    })
}

/// Tenant-scoped access to class sessions and their bookings.
///
/// A record owned by another tenant is reported as not found.
#[async_trait]
pub trait BookingStore: Send + Sync {
    async fn create_session(
        &self,
        tenant_id: DbId,
        input: &CreateClassSession,
        now: Timestamp,
    ) -> StoreResult<ClassSession>;

    async fn find_session(&self, tenant_id: DbId, id: DbId) -> StoreResult<Option<ClassSession>>;

    async fn list_sessions(
        &self,
        tenant_id: DbId,
        query: &SessionListQuery,
    ) -> StoreResult<Vec<ClassSession>>;

    /// Move a session through its lifecycle. Cancelling a session cancels
    /// its CONFIRMED and WAITLISTED bookings without promoting anyone.
    async fn transition_session(
        &self,
        tenant_id: DbId,
        id: DbId,
        to: SessionStatus,
        now: Timestamp,
    ) -> StoreResult<SessionTransition>;

    /// Change capacity of a SCHEDULED session, promoting waitlisted
    /// bookings into any newly opened spots.
    async fn change_capacity(
        &self,
        tenant_id: DbId,
        id: DbId,
        capacity: i32,
        now: Timestamp,
    ) -> StoreResult<CapacityChange>;

    /// Book a member onto a session: CONFIRMED if a spot is open,
    /// WAITLISTED otherwise.
    async fn book(
        &self,
        tenant_id: DbId,
        member_id: DbId,
        class_session_id: DbId,
        now: Timestamp,
    ) -> StoreResult<Booking>;

    /// Cancel a booking. A CONFIRMED cancellation releases its spot and
    /// promotes at most one waitlisted booking in the same unit.
    async fn cancel(&self, tenant_id: DbId, booking_id: DbId, now: Timestamp)
        -> StoreResult<CancelOutcome>;

    async fn check_in(
        &self,
        tenant_id: DbId,
        booking_id: DbId,
        policy: &CheckInPolicy,
        now: Timestamp,
    ) -> StoreResult<Booking>;

    /// Check in the member's active booking on a session (QR scan path).
    async fn check_in_member(
        &self,
        tenant_id: DbId,
        member_id: DbId,
        class_session_id: DbId,
        policy: &CheckInPolicy,
        now: Timestamp,
    ) -> StoreResult<Booking>;

    async fn mark_no_show(
        &self,
        tenant_id: DbId,
        booking_id: DbId,
        now: Timestamp,
    ) -> StoreResult<Booking>;

    /// Mark every remaining CONFIRMED booking of an ended session NO_SHOW.
    async fn reconcile_no_shows(
        &self,
        tenant_id: DbId,
        class_session_id: DbId,
        now: Timestamp,
    ) -> StoreResult<Vec<Booking>>;

    async fn find_booking(&self, tenant_id: DbId, id: DbId) -> StoreResult<Option<Booking>>;

    /// A session's bookings in `statuses`, oldest first (waitlist order).
    async fn list_session_bookings(
        &self,
        tenant_id: DbId,
        class_session_id: DbId,
        statuses: &[BookingStatus],
    ) -> StoreResult<Vec<Booking>>;

    /// A member's booking history, newest first.
    async fn list_member_bookings(
        &self,
        tenant_id: DbId,
        member_id: DbId,
    ) -> StoreResult<Vec<Booking>>;

    async fn health_check(&self) -> StoreResult<()>;

    fn backend_name(&self) -> &'static str;
}

/// Parse the `STORE_BACKEND` setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Postgres,
    Memory,
}

impl std::str::FromStr for StoreBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "postgres" | "pg" => Ok(Self::Postgres),
            "memory" | "in-memory" => Ok(Self::Memory),
            other => Err(format!("unknown store backend '{other}'")),
        }
    }
}
