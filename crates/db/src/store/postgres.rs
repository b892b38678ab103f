//! Postgres-backed [`BookingStore`].
//!
//! Every mutation runs in one transaction that locks the session row
//! before touching any booking row. Lock order is always session, then
//! booking, so concurrent work on one session queues up behind the
//! session lock and never deadlocks.

use async_trait::async_trait;
use sqlx::{PgConnection, PgPool};
use studio_core::booking::{initial_status, validate_transition, BookingStatus};
use studio_core::capacity::SpotCounter;
use studio_core::check_in::CheckInPolicy;
use studio_core::class_session::{self, ensure_bookable, SessionStatus};
use studio_core::types::{DbId, Timestamp};

use super::{
    active_booking_not_found, booking_not_found, ensure_capacity_editable,
    ensure_check_in_allowed, ensure_no_active_booking, ensure_no_show_allowed, guard_capacity,
    session_not_found, BookingStore, StoreResult,
};
use crate::models::booking::{Booking, CancelOutcome};
use crate::models::class_session::{
    CapacityChange, ClassSession, CreateClassSession, SessionListQuery, SessionTransition,
};
use crate::repositories::{BookingRepo, ClassSessionRepo};

pub struct PgBookingStore {
    pool: PgPool,
}

impl PgBookingStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

async fn lock_session(
    conn: &mut PgConnection,
    tenant_id: DbId,
    id: DbId,
) -> StoreResult<ClassSession> {
    ClassSessionRepo::lock(conn, tenant_id, id)
        .await?
        .ok_or_else(|| session_not_found(id))
}

/// Lock a booking together with its session, session first.
async fn lock_booking(
    conn: &mut PgConnection,
    tenant_id: DbId,
    booking_id: DbId,
) -> StoreResult<(ClassSession, Booking)> {
    let session_id = BookingRepo::find_session_id(conn, tenant_id, booking_id)
        .await?
        .ok_or_else(|| booking_not_found(booking_id))?;
    let session = lock_session(conn, tenant_id, session_id).await?;
    let booking = BookingRepo::lock(conn, tenant_id, booking_id)
        .await?
        .ok_or_else(|| booking_not_found(booking_id))?;
    Ok((session, booking))
}

/// Confirm up to `limit` waitlisted bookings, oldest first, taking one
/// spot from `counter` for each.
///
/// The caller persists `counter`.
async fn promote_waitlist(
    conn: &mut PgConnection,
    class_session_id: DbId,
    counter: &mut SpotCounter,
    limit: i32,
    now: Timestamp,
) -> StoreResult<Vec<Booking>> {
    if limit <= 0 {
        return Ok(Vec::new());
    }
    let queue = BookingRepo::next_waitlisted(conn, class_session_id, i64::from(limit)).await?;
    let mut promoted = Vec::with_capacity(queue.len());
    for waiting in queue {
        validate_transition(waiting.status, BookingStatus::Confirmed)?;
        guard_capacity(counter.increment(), class_session_id)?;
        let booking =
            BookingRepo::update_status(conn, waiting.id, BookingStatus::Confirmed, now).await?;
        tracing::info!(
            tenant_id = booking.tenant_id,
            booking_id = booking.id,
            member_id = booking.member_id,
            class_session_id,
            "Waitlisted booking promoted"
        );
        promoted.push(booking);
    }
    Ok(promoted)
}

#[async_trait]
impl BookingStore for PgBookingStore {
    async fn create_session(
        &self,
        tenant_id: DbId,
        input: &CreateClassSession,
        now: Timestamp,
    ) -> StoreResult<ClassSession> {
        class_session::validate_schedule(input.starts_at, input.ends_at, input.capacity)?;
        let session = ClassSessionRepo::create(&self.pool, tenant_id, input, now).await?;
        tracing::info!(tenant_id, class_session_id = session.id, "Class session created");
        Ok(session)
    }

    async fn find_session(&self, tenant_id: DbId, id: DbId) -> StoreResult<Option<ClassSession>> {
        Ok(ClassSessionRepo::find_by_id(&self.pool, tenant_id, id).await?)
    }

    async fn list_sessions(
        &self,
        tenant_id: DbId,
        query: &SessionListQuery,
    ) -> StoreResult<Vec<ClassSession>> {
        Ok(ClassSessionRepo::list(&self.pool, tenant_id, query).await?)
    }

    async fn transition_session(
        &self,
        tenant_id: DbId,
        id: DbId,
        to: SessionStatus,
        now: Timestamp,
    ) -> StoreResult<SessionTransition> {
        let mut tx = self.pool.begin().await?;
        let session = lock_session(&mut tx, tenant_id, id).await?;
        class_session::validate_transition(session.status, to)?;

        let mut cancelled_bookings = Vec::new();
        if to == SessionStatus::Cancelled {
            let released =
                BookingRepo::count_in_status(&mut tx, id, BookingStatus::Confirmed).await?;
            let mut counter = session.counter();
            for _ in 0..released {
                guard_capacity(counter.decrement(), id)?;
            }
            cancelled_bookings = BookingRepo::cancel_open_for_session(&mut tx, id, now).await?;
            ClassSessionRepo::save_counter(&mut tx, id, counter, now).await?;
        }
        let session = ClassSessionRepo::set_status(&mut tx, id, to, now).await?;
        tx.commit().await?;

        tracing::info!(
            tenant_id,
            class_session_id = id,
            status = %to,
            cancelled_bookings = cancelled_bookings.len(),
            "Class session status changed"
        );
        Ok(SessionTransition {
            session,
            cancelled_bookings,
        })
    }

    async fn change_capacity(
        &self,
        tenant_id: DbId,
        id: DbId,
        capacity: i32,
        now: Timestamp,
    ) -> StoreResult<CapacityChange> {
        let mut tx = self.pool.begin().await?;
        let session = lock_session(&mut tx, tenant_id, id).await?;
        ensure_capacity_editable(&session)?;

        let mut counter = session.counter();
        counter.resize(capacity)?;
        let open = counter.open_spots();
        let promoted = promote_waitlist(&mut tx, id, &mut counter, open, now).await?;
        let session = ClassSessionRepo::save_counter(&mut tx, id, counter, now).await?;
        tx.commit().await?;

        tracing::info!(
            tenant_id,
            class_session_id = id,
            capacity,
            promoted = promoted.len(),
            "Class session capacity changed"
        );
        Ok(CapacityChange { session, promoted })
    }

    async fn book(
        &self,
        tenant_id: DbId,
        member_id: DbId,
        class_session_id: DbId,
        now: Timestamp,
    ) -> StoreResult<Booking> {
        let mut tx = self.pool.begin().await?;
        let session = lock_session(&mut tx, tenant_id, class_session_id).await?;
        ensure_bookable(session.status, session.ends_at, now)?;

        let existing =
            BookingRepo::find_active_for_member(&mut tx, tenant_id, member_id, class_session_id)
                .await?;
        ensure_no_active_booking(existing.as_ref())?;

        let mut counter = session.counter();
        let status = initial_status(counter.has_open_spot());
        if status == BookingStatus::Confirmed {
            guard_capacity(counter.increment(), class_session_id)?;
            ClassSessionRepo::save_counter(&mut tx, class_session_id, counter, now).await?;
        }
        let booking =
            BookingRepo::insert(&mut tx, tenant_id, member_id, class_session_id, status, now)
                .await?;
        tx.commit().await?;

        tracing::info!(
            tenant_id,
            booking_id = booking.id,
            member_id,
            class_session_id,
            status = %booking.status,
            spots_booked = counter.spots_booked,
            "Booking created"
        );
        Ok(booking)
    }

    async fn cancel(
        &self,
        tenant_id: DbId,
        booking_id: DbId,
        now: Timestamp,
    ) -> StoreResult<CancelOutcome> {
        let mut tx = self.pool.begin().await?;
        let (session, booking) = lock_booking(&mut tx, tenant_id, booking_id).await?;
        validate_transition(booking.status, BookingStatus::Cancelled)?;

        let mut promoted = None;
        if booking.status.holds_spot() {
            let mut counter = session.counter();
            guard_capacity(counter.decrement(), session.id)?;
            if session.status.promotes_waitlist() {
                promoted = promote_waitlist(&mut tx, session.id, &mut counter, 1, now)
                    .await?
                    .pop();
            }
            ClassSessionRepo::save_counter(&mut tx, session.id, counter, now).await?;
        }
        let cancelled =
            BookingRepo::update_status(&mut tx, booking_id, BookingStatus::Cancelled, now).await?;
        tx.commit().await?;

        tracing::info!(
            tenant_id,
            booking_id,
            class_session_id = session.id,
            was = %booking.status,
            promoted_booking_id = promoted.as_ref().map(|b| b.id),
            "Booking cancelled"
        );
        Ok(CancelOutcome {
            cancelled,
            promoted,
        })
    }

    async fn check_in(
        &self,
        tenant_id: DbId,
        booking_id: DbId,
        policy: &CheckInPolicy,
        now: Timestamp,
    ) -> StoreResult<Booking> {
        let mut tx = self.pool.begin().await?;
        let (session, booking) = lock_booking(&mut tx, tenant_id, booking_id).await?;
        ensure_check_in_allowed(&session, &booking, policy, now)?;
        let booking =
            BookingRepo::update_status(&mut tx, booking_id, BookingStatus::CheckedIn, now).await?;
        tx.commit().await?;

        tracing::info!(
            tenant_id,
            booking_id,
            class_session_id = session.id,
            "Booking checked in"
        );
        Ok(booking)
    }

    async fn check_in_member(
        &self,
        tenant_id: DbId,
        member_id: DbId,
        class_session_id: DbId,
        policy: &CheckInPolicy,
        now: Timestamp,
    ) -> StoreResult<Booking> {
        let mut tx = self.pool.begin().await?;
        let session = lock_session(&mut tx, tenant_id, class_session_id).await?;
        let booking =
            BookingRepo::find_active_for_member(&mut tx, tenant_id, member_id, class_session_id)
                .await?
                .ok_or_else(|| active_booking_not_found(class_session_id))?;
        ensure_check_in_allowed(&session, &booking, policy, now)?;
        let booking =
            BookingRepo::update_status(&mut tx, booking.id, BookingStatus::CheckedIn, now).await?;
        tx.commit().await?;

        tracing::info!(
            tenant_id,
            booking_id = booking.id,
            member_id,
            class_session_id,
            "Booking checked in from pass"
        );
        Ok(booking)
    }

    async fn mark_no_show(
        &self,
        tenant_id: DbId,
        booking_id: DbId,
        now: Timestamp,
    ) -> StoreResult<Booking> {
        let mut tx = self.pool.begin().await?;
        let (session, booking) = lock_booking(&mut tx, tenant_id, booking_id).await?;
        ensure_no_show_allowed(&session, &booking, now)?;
        let booking =
            BookingRepo::update_status(&mut tx, booking_id, BookingStatus::NoShow, now).await?;
        tx.commit().await?;

        tracing::info!(tenant_id, booking_id, class_session_id = session.id, "Booking marked no-show");
        Ok(booking)
    }

    async fn reconcile_no_shows(
        &self,
        tenant_id: DbId,
        class_session_id: DbId,
        now: Timestamp,
    ) -> StoreResult<Vec<Booking>> {
        let mut tx = self.pool.begin().await?;
        let session = lock_session(&mut tx, tenant_id, class_session_id).await?;
        studio_core::check_in::ensure_no_show_allowed(session.ends_at, now)?;
        let marked = BookingRepo::mark_no_shows(&mut tx, class_session_id, now).await?;
        tx.commit().await?;

        tracing::info!(
            tenant_id,
            class_session_id,
            marked = marked.len(),
            "No-shows reconciled"
        );
        Ok(marked)
    }

    async fn find_booking(&self, tenant_id: DbId, id: DbId) -> StoreResult<Option<Booking>> {
        Ok(BookingRepo::find_by_id(&self.pool, tenant_id, id).await?)
    }

    async fn list_session_bookings(
        &self,
        tenant_id: DbId,
        class_session_id: DbId,
        statuses: &[BookingStatus],
    ) -> StoreResult<Vec<Booking>> {
        Ok(BookingRepo::list_for_session(&self.pool, tenant_id, class_session_id, statuses).await?)
    }

    async fn list_member_bookings(
        &self,
        tenant_id: DbId,
        member_id: DbId,
    ) -> StoreResult<Vec<Booking>> {
        Ok(BookingRepo::list_for_member(&self.pool, tenant_id, member_id).await?)
    }

    async fn health_check(&self) -> StoreResult<()> {
        Ok(crate::health_check(&self.pool).await?)
    }

    fn backend_name(&self) -> &'static str {
        "postgres"
    }
}
