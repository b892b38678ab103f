//! Handlers for the `/classes` resource (scheduled class sessions).
//!
//! Reads are open to any authenticated caller of the tenant. Scheduling,
//! lifecycle changes and the roster views require staff.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use studio_core::booking::{BookingStatus, ROSTER_STATUSES};
use studio_core::class_session::SessionStatus;
use studio_core::error::CoreError;
use studio_core::types::DbId;
use studio_db::models::booking::{Booking, WaitlistEntry};
use studio_db::models::class_session::{
    CapacityChange, ClassSession, CreateClassSession, SessionListQuery, SessionTransition,
    UpdateCapacity,
};
use studio_events::bus;

use crate::error::{AppError, AppResult};
use crate::extract::{ApiPath, ApiQuery, ValidJson};
use crate::middleware::auth::AuthUser;
use crate::middleware::rbac::RequireStaff;
use crate::notify;
use crate::response::DataResponse;
use crate::state::AppState;

async fn ensure_session_exists(
    state: &AppState,
    tenant_id: DbId,
    session_id: DbId,
) -> AppResult<ClassSession> {
    state
        .store
        .find_session(tenant_id, session_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "ClassSession",
            id: session_id,
        }))
}

async fn transition(
    state: &AppState,
    auth: &AuthUser,
    session_id: DbId,
    to: SessionStatus,
) -> AppResult<SessionTransition> {
    Ok(state
        .store
        .transition_session(auth.tenant_id, session_id, to, chrono::Utc::now())
        .await?)
}

// ---------------------------------------------------------------------------
// Scheduling
// ---------------------------------------------------------------------------

/// POST /api/v1/classes
pub async fn create_session(
    RequireStaff(auth): RequireStaff,
    State(state): State<AppState>,
    ValidJson(input): ValidJson<CreateClassSession>,
) -> AppResult<(StatusCode, Json<DataResponse<ClassSession>>)> {
    let session = state
        .store
        .create_session(auth.tenant_id, &input, chrono::Utc::now())
        .await?;
    Ok((StatusCode::CREATED, Json(DataResponse::new(session))))
}

/// GET /api/v1/classes?from=&to=&limit=
pub async fn list_sessions(
    auth: AuthUser,
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<SessionListQuery>,
) -> AppResult<Json<DataResponse<Vec<ClassSession>>>> {
    let sessions = state.store.list_sessions(auth.tenant_id, &query).await?;
    Ok(Json(DataResponse::new(sessions)))
}

/// GET /api/v1/classes/{id}
pub async fn get_session(
    auth: AuthUser,
    State(state): State<AppState>,
    ApiPath(session_id): ApiPath<DbId>,
) -> AppResult<Json<DataResponse<ClassSession>>> {
    let session = ensure_session_exists(&state, auth.tenant_id, session_id).await?;
    Ok(Json(DataResponse::new(session)))
}

/// PUT /api/v1/classes/{id}/capacity
///
/// Raising capacity promotes waitlisted bookings into the new spots.
pub async fn update_capacity(
    RequireStaff(auth): RequireStaff,
    State(state): State<AppState>,
    ApiPath(session_id): ApiPath<DbId>,
    ValidJson(input): ValidJson<UpdateCapacity>,
) -> AppResult<Json<DataResponse<CapacityChange>>> {
    let change = state
        .store
        .change_capacity(
            auth.tenant_id,
            session_id,
            input.capacity,
            chrono::Utc::now(),
        )
        .await?;

    notify::publish_bookings(&state, bus::BOOKING_PROMOTED, &change.promoted, &auth);

    Ok(Json(DataResponse::new(change)))
}

// ---------------------------------------------------------------------------
// Lifecycle
// ---------------------------------------------------------------------------

/// POST /api/v1/classes/{id}/start
pub async fn start_session(
    RequireStaff(auth): RequireStaff,
    State(state): State<AppState>,
    ApiPath(session_id): ApiPath<DbId>,
) -> AppResult<Json<DataResponse<SessionTransition>>> {
    let result = transition(&state, &auth, session_id, SessionStatus::InProgress).await?;
    Ok(Json(DataResponse::new(result)))
}

/// POST /api/v1/classes/{id}/complete
pub async fn complete_session(
    RequireStaff(auth): RequireStaff,
    State(state): State<AppState>,
    ApiPath(session_id): ApiPath<DbId>,
) -> AppResult<Json<DataResponse<SessionTransition>>> {
    let result = transition(&state, &auth, session_id, SessionStatus::Completed).await?;
    Ok(Json(DataResponse::new(result)))
}

/// POST /api/v1/classes/{id}/cancel
///
/// Cancels the session and every confirmed or waitlisted booking on it.
pub async fn cancel_session(
    RequireStaff(auth): RequireStaff,
    State(state): State<AppState>,
    ApiPath(session_id): ApiPath<DbId>,
) -> AppResult<Json<DataResponse<SessionTransition>>> {
    let result = transition(&state, &auth, session_id, SessionStatus::Cancelled).await?;

    state
        .event_bus
        .publish(notify::session_cancelled_event(&result.session, &auth));
    notify::publish_bookings(
        &state,
        bus::BOOKING_CANCELLED,
        &result.cancelled_bookings,
        &auth,
    );

    Ok(Json(DataResponse::new(result)))
}

/// POST /api/v1/classes/{id}/no-shows
///
/// Mark every booking still CONFIRMED after the session ended as NO_SHOW.
pub async fn reconcile_no_shows(
    RequireStaff(auth): RequireStaff,
    State(state): State<AppState>,
    ApiPath(session_id): ApiPath<DbId>,
) -> AppResult<Json<DataResponse<Vec<Booking>>>> {
    let marked = state
        .store
        .reconcile_no_shows(auth.tenant_id, session_id, chrono::Utc::now())
        .await?;

    notify::publish_bookings(&state, bus::BOOKING_NO_SHOW, &marked, &auth);

    Ok(Json(DataResponse::new(marked)))
}

// ---------------------------------------------------------------------------
// Roster views
// ---------------------------------------------------------------------------

/// GET /api/v1/classes/{id}/roster
pub async fn roster(
    RequireStaff(auth): RequireStaff,
    State(state): State<AppState>,
    ApiPath(session_id): ApiPath<DbId>,
) -> AppResult<Json<DataResponse<Vec<Booking>>>> {
    ensure_session_exists(&state, auth.tenant_id, session_id).await?;
    let bookings = state
        .store
        .list_session_bookings(auth.tenant_id, session_id, &ROSTER_STATUSES)
        .await?;
    Ok(Json(DataResponse::new(bookings)))
}

/// GET /api/v1/classes/{id}/waitlist
///
/// Waitlisted bookings in promotion order, numbered from 1.
pub async fn waitlist(
    RequireStaff(auth): RequireStaff,
    State(state): State<AppState>,
    ApiPath(session_id): ApiPath<DbId>,
) -> AppResult<Json<DataResponse<Vec<WaitlistEntry>>>> {
    ensure_session_exists(&state, auth.tenant_id, session_id).await?;
    let queue = state
        .store
        .list_session_bookings(auth.tenant_id, session_id, &[BookingStatus::Waitlisted])
        .await?;
    Ok(Json(DataResponse::new(WaitlistEntry::from_queue(queue))))
}
