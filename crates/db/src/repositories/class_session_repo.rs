//! Repository for the `class_sessions` table.

use sqlx::{PgConnection, PgPool};
use studio_core::capacity::SpotCounter;
use studio_core::class_session::SessionStatus;
use studio_core::types::{DbId, Timestamp};

use crate::models::class_session::{ClassSession, CreateClassSession, SessionListQuery};

/// Column list for `class_sessions` queries.
const COLUMNS: &str = "\
    id, tenant_id, class_type_id, location_id, starts_at, ends_at, \
    capacity, spots_booked, status_id, created_at, updated_at";

/// Provides SQL operations for class sessions.
pub struct ClassSessionRepo;

impl ClassSessionRepo {
    /// Insert a new `SCHEDULED` session with no spots booked.
    pub async fn create(
        pool: &PgPool,
        tenant_id: DbId,
        input: &CreateClassSession,
        now: Timestamp,
    ) -> Result<ClassSession, sqlx::Error> {
        let query = format!(
            "INSERT INTO class_sessions \
                 (tenant_id, class_type_id, location_id, starts_at, ends_at, \
                  capacity, spots_booked, status_id, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, 0, $7, $8, $8) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ClassSession>(&query)
            .bind(tenant_id)
            .bind(input.class_type_id)
            .bind(input.location_id)
            .bind(input.starts_at)
            .bind(input.ends_at)
            .bind(input.capacity)
            .bind(SessionStatus::Scheduled.id())
            .bind(now)
            .fetch_one(pool)
            .await
    }

    /// Find a session by id within a tenant.
    pub async fn find_by_id(
        pool: &PgPool,
        tenant_id: DbId,
        id: DbId,
    ) -> Result<Option<ClassSession>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM class_sessions WHERE id = $1 AND tenant_id = $2");
        sqlx::query_as::<_, ClassSession>(&query)
            .bind(id)
            .bind(tenant_id)
            .fetch_optional(pool)
            .await
    }

    /// Lock a session row for the rest of the transaction.
    ///
    /// Every booking mutation takes this lock first, which serializes
    /// work on one session without blocking any other session.
    pub async fn lock(
        conn: &mut PgConnection,
        tenant_id: DbId,
        id: DbId,
    ) -> Result<Option<ClassSession>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM class_sessions \
             WHERE id = $1 AND tenant_id = $2 \
             FOR UPDATE"
        );
        sqlx::query_as::<_, ClassSession>(&query)
            .bind(id)
            .bind(tenant_id)
            .fetch_optional(conn)
            .await
    }

    /// List a tenant's sessions ordered by start time.
    pub async fn list(
        pool: &PgPool,
        tenant_id: DbId,
        params: &SessionListQuery,
    ) -> Result<Vec<ClassSession>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM class_sessions \
             WHERE tenant_id = $1 \
               AND ($2::timestamptz IS NULL OR starts_at >= $2) \
               AND ($3::timestamptz IS NULL OR starts_at < $3) \
             ORDER BY starts_at, id \
             LIMIT $4"
        );
        sqlx::query_as::<_, ClassSession>(&query)
            .bind(tenant_id)
            .bind(params.from)
            .bind(params.to)
            .bind(params.effective_limit())
            .fetch_all(pool)
            .await
    }

    /// Persist the capacity tracker's counters.
    pub async fn save_counter(
        conn: &mut PgConnection,
        id: DbId,
        counter: SpotCounter,
        now: Timestamp,
    ) -> Result<ClassSession, sqlx::Error> {
        let query = format!(
            "UPDATE class_sessions \
             SET capacity = $2, spots_booked = $3, updated_at = $4 \
             WHERE id = $1 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ClassSession>(&query)
            .bind(id)
            .bind(counter.capacity)
            .bind(counter.spots_booked)
            .bind(now)
            .fetch_one(conn)
            .await
    }

    /// Set the lifecycle status. Callers validate the transition first.
    pub async fn set_status(
        conn: &mut PgConnection,
        id: DbId,
        status: SessionStatus,
        now: Timestamp,
    ) -> Result<ClassSession, sqlx::Error> {
        let query = format!(
            "UPDATE class_sessions SET status_id = $2, updated_at = $3 \
             WHERE id = $1 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ClassSession>(&query)
            .bind(id)
            .bind(status.id())
            .bind(now)
            .fetch_one(conn)
            .await
    }
}
