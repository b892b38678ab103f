//! Repository for the `bookings` table.
//!
//! Uses `BookingStatus` from `studio_core::booking` for every status
//! literal; status ids are always bound, never inlined.

use sqlx::{PgConnection, PgPool};
use studio_core::booking::{BookingStatus, ACTIVE_STATUSES};
use studio_core::types::{DbId, Timestamp};

use crate::models::booking::Booking;

/// Column list for `bookings` queries.
const COLUMNS: &str = "\
    id, tenant_id, member_id, class_session_id, status_id, \
    created_at, updated_at, cancelled_at, checked_in_at, promoted_at";

/// Maximum rows returned by a member history query.
pub const MEMBER_HISTORY_LIMIT: i64 = 200;

fn status_ids(statuses: &[BookingStatus]) -> Vec<i16> {
    statuses.iter().map(|s| s.id()).collect()
}

/// Provides SQL operations for bookings.
pub struct BookingRepo;

impl BookingRepo {
    /// Insert a booking in its initial status.
    pub async fn insert(
        conn: &mut PgConnection,
        tenant_id: DbId,
        member_id: DbId,
        class_session_id: DbId,
        status: BookingStatus,
        now: Timestamp,
    ) -> Result<Booking, sqlx::Error> {
        let query = format!(
            "INSERT INTO bookings \
                 (tenant_id, member_id, class_session_id, status_id, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $5) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Booking>(&query)
            .bind(tenant_id)
            .bind(member_id)
            .bind(class_session_id)
            .bind(status.id())
            .bind(now)
            .fetch_one(conn)
            .await
    }

    /// Find a booking by id within a tenant.
    pub async fn find_by_id(
        pool: &PgPool,
        tenant_id: DbId,
        id: DbId,
    ) -> Result<Option<Booking>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM bookings WHERE id = $1 AND tenant_id = $2");
        sqlx::query_as::<_, Booking>(&query)
            .bind(id)
            .bind(tenant_id)
            .fetch_optional(pool)
            .await
    }

    /// Resolve which session a booking belongs to, without locking.
    ///
    /// Used to find the session row to lock before locking the booking.
    pub async fn find_session_id(
        conn: &mut PgConnection,
        tenant_id: DbId,
        id: DbId,
    ) -> Result<Option<DbId>, sqlx::Error> {
        sqlx::query_scalar::<_, DbId>(
            "SELECT class_session_id FROM bookings WHERE id = $1 AND tenant_id = $2",
        )
        .bind(id)
        .bind(tenant_id)
        .fetch_optional(conn)
        .await
    }

    /// Lock a booking row. Callers must already hold its session lock.
    pub async fn lock(
        conn: &mut PgConnection,
        tenant_id: DbId,
        id: DbId,
    ) -> Result<Option<Booking>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM bookings \
             WHERE id = $1 AND tenant_id = $2 \
             FOR UPDATE"
        );
        sqlx::query_as::<_, Booking>(&query)
            .bind(id)
            .bind(tenant_id)
            .fetch_optional(conn)
            .await
    }

    /// Find the member's active booking on a session, if any.
    pub async fn find_active_for_member(
        conn: &mut PgConnection,
        tenant_id: DbId,
        member_id: DbId,
        class_session_id: DbId,
    ) -> Result<Option<Booking>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM bookings \
             WHERE tenant_id = $1 AND member_id = $2 AND class_session_id = $3 \
               AND status_id = ANY($4) \
             FOR UPDATE"
        );
        sqlx::query_as::<_, Booking>(&query)
            .bind(tenant_id)
            .bind(member_id)
            .bind(class_session_id)
            .bind(status_ids(&ACTIVE_STATUSES))
            .fetch_optional(conn)
            .await
    }

    /// Lock the `limit` oldest waitlisted bookings of a session, FIFO.
    pub async fn next_waitlisted(
        conn: &mut PgConnection,
        class_session_id: DbId,
        limit: i64,
    ) -> Result<Vec<Booking>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM bookings \
             WHERE class_session_id = $1 AND status_id = $2 \
             ORDER BY created_at ASC, id ASC \
             LIMIT $3 \
             FOR UPDATE"
        );
        sqlx::query_as::<_, Booking>(&query)
            .bind(class_session_id)
            .bind(BookingStatus::Waitlisted.id())
            .bind(limit)
            .fetch_all(conn)
            .await
    }

    /// Move a booking to `status`, stamping the matching timestamp column.
    ///
    /// Callers validate the transition first; this is a plain write.
    pub async fn update_status(
        conn: &mut PgConnection,
        id: DbId,
        status: BookingStatus,
        now: Timestamp,
    ) -> Result<Booking, sqlx::Error> {
        let query = format!(
            "UPDATE bookings SET \
                 cancelled_at  = CASE WHEN $2 = $4 THEN $3 ELSE cancelled_at END, \
                 checked_in_at = CASE WHEN $2 = $5 THEN $3 ELSE checked_in_at END, \
                 promoted_at   = CASE WHEN $2 = $6 AND status_id = $7 THEN $3 ELSE promoted_at END, \
                 status_id = $2, \
                 updated_at = $3 \
             WHERE id = $1 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Booking>(&query)
            .bind(id)
            .bind(status.id())
            .bind(now)
            .bind(BookingStatus::Cancelled.id())
            .bind(BookingStatus::CheckedIn.id())
            .bind(BookingStatus::Confirmed.id())
            .bind(BookingStatus::Waitlisted.id())
            .fetch_one(conn)
            .await
    }

    /// Count a session's bookings in one status.
    pub async fn count_in_status(
        conn: &mut PgConnection,
        class_session_id: DbId,
        status: BookingStatus,
    ) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM bookings WHERE class_session_id = $1 AND status_id = $2",
        )
        .bind(class_session_id)
        .bind(status.id())
        .fetch_one(conn)
        .await
    }

    /// Cancel every CONFIRMED or WAITLISTED booking of a session.
    pub async fn cancel_open_for_session(
        conn: &mut PgConnection,
        class_session_id: DbId,
        now: Timestamp,
    ) -> Result<Vec<Booking>, sqlx::Error> {
        let query = format!(
            "UPDATE bookings \
             SET status_id = $2, cancelled_at = $3, updated_at = $3 \
             WHERE class_session_id = $1 AND status_id = ANY($4) \
             RETURNING {COLUMNS}"
        );
        let mut rows = sqlx::query_as::<_, Booking>(&query)
            .bind(class_session_id)
            .bind(BookingStatus::Cancelled.id())
            .bind(now)
            .bind(status_ids(&[
                BookingStatus::Confirmed,
                BookingStatus::Waitlisted,
            ]))
            .fetch_all(conn)
            .await?;
        rows.sort_by_key(Booking::queue_key);
        Ok(rows)
    }

    /// Mark every remaining CONFIRMED booking of a session as NO_SHOW.
    pub async fn mark_no_shows(
        conn: &mut PgConnection,
        class_session_id: DbId,
        now: Timestamp,
    ) -> Result<Vec<Booking>, sqlx::Error> {
        let query = format!(
            "UPDATE bookings \
             SET status_id = $2, updated_at = $3 \
             WHERE class_session_id = $1 AND status_id = $4 \
             RETURNING {COLUMNS}"
        );
        let mut rows = sqlx::query_as::<_, Booking>(&query)
            .bind(class_session_id)
            .bind(BookingStatus::NoShow.id())
            .bind(now)
            .bind(BookingStatus::Confirmed.id())
            .fetch_all(conn)
            .await?;
        rows.sort_by_key(Booking::queue_key);
        Ok(rows)
    }

    /// List a session's bookings in the given statuses, FIFO.
    pub async fn list_for_session(
        pool: &PgPool,
        tenant_id: DbId,
        class_session_id: DbId,
        statuses: &[BookingStatus],
    ) -> Result<Vec<Booking>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM bookings \
             WHERE tenant_id = $1 AND class_session_id = $2 AND status_id = ANY($3) \
             ORDER BY created_at ASC, id ASC"
        );
        sqlx::query_as::<_, Booking>(&query)
            .bind(tenant_id)
            .bind(class_session_id)
            .bind(status_ids(statuses))
            .fetch_all(pool)
            .await
    }

    /// A member's booking history, newest first.
    pub async fn list_for_member(
        pool: &PgPool,
        tenant_id: DbId,
        member_id: DbId,
    ) -> Result<Vec<Booking>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM bookings \
             WHERE tenant_id = $1 AND member_id = $2 \
             ORDER BY created_at DESC, id DESC \
             LIMIT $3"
        );
        sqlx::query_as::<_, Booking>(&query)
            .bind(tenant_id)
            .bind(member_id)
            .bind(MEMBER_HISTORY_LIMIT)
            .fetch_all(pool)
            .await
    }
}
