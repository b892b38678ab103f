//! Handlers for the `/bookings` resource.
//!
//! Members act on their own bookings; staff act on any booking of their
//! tenant. Check-in and no-show endpoints are staff-only.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;
use studio_core::error::CoreError;
use studio_core::pass::CheckInPass;
use studio_core::types::DbId;
use studio_db::models::booking::{Booking, CancelOutcome, CreateBooking, QrCheckIn};
use studio_db::store::BookingStore;
use studio_events::bus;

use crate::error::{AppError, AppResult};
use crate::extract::{ApiPath, ValidJson};
use crate::middleware::auth::AuthUser;
use crate::middleware::rbac::RequireStaff;
use crate::notify;
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

/// Signed payload to render as the member's check-in QR code.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PassResponse {
    pub payload: String,
    pub booking_id: DbId,
    pub class_session_id: DbId,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Load a booking the caller is allowed to see.
async fn load_booking(
    store: &dyn BookingStore,
    auth: &AuthUser,
    booking_id: DbId,
) -> AppResult<Booking> {
    let booking = store
        .find_booking(auth.tenant_id, booking_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Booking",
            id: booking_id,
        }))?;
    auth.ensure_can_act_for(booking.member_id)?;
    Ok(booking)
}

// ---------------------------------------------------------------------------
// Member-facing endpoints
// ---------------------------------------------------------------------------

/// POST /api/v1/bookings
///
/// Book a spot, or join the waitlist when the session is full.
pub async fn create_booking(
    auth: AuthUser,
    State(state): State<AppState>,
    ValidJson(input): ValidJson<CreateBooking>,
) -> AppResult<(StatusCode, Json<DataResponse<Booking>>)> {
    let member_id = auth.resolve_member(input.member_id)?;

    let booking = state
        .store
        .book(
            auth.tenant_id,
            member_id,
            input.class_session_id,
            chrono::Utc::now(),
        )
        .await?;

    notify::publish_booking(&state, notify::created_event_type(&booking), &booking, &auth);

    Ok((StatusCode::CREATED, Json(DataResponse::new(booking))))
}

/// GET /api/v1/bookings/{id}
pub async fn get_booking(
    auth: AuthUser,
    State(state): State<AppState>,
    ApiPath(booking_id): ApiPath<DbId>,
) -> AppResult<Json<DataResponse<Booking>>> {
    let booking = load_booking(state.store.as_ref(), &auth, booking_id).await?;
    Ok(Json(DataResponse::new(booking)))
}

/// DELETE /api/v1/bookings/{id}
///
/// Cancel a booking. Returns the cancelled booking and, when a spot was
/// freed, the waitlisted booking promoted into it.
pub async fn cancel_booking(
    auth: AuthUser,
    State(state): State<AppState>,
    ApiPath(booking_id): ApiPath<DbId>,
) -> AppResult<Json<DataResponse<CancelOutcome>>> {
    load_booking(state.store.as_ref(), &auth, booking_id).await?;

    let outcome = state
        .store
        .cancel(auth.tenant_id, booking_id, chrono::Utc::now())
        .await?;

    notify::publish_booking(&state, bus::BOOKING_CANCELLED, &outcome.cancelled, &auth);
    if let Some(promoted) = &outcome.promoted {
        notify::publish_booking(&state, bus::BOOKING_PROMOTED, promoted, &auth);
    }

    Ok(Json(DataResponse::new(outcome)))
}

/// GET /api/v1/bookings/{id}/pass
///
/// Issue the signed check-in pass for an active booking.
pub async fn get_pass(
    auth: AuthUser,
    State(state): State<AppState>,
    ApiPath(booking_id): ApiPath<DbId>,
) -> AppResult<Json<DataResponse<PassResponse>>> {
    let booking = load_booking(state.store.as_ref(), &auth, booking_id).await?;

    if !booking.status.is_active() {
        return Err(AppError::Core(CoreError::InvalidState(format!(
            "No check-in pass for a {} booking",
            booking.status.as_str()
        ))));
    }

    let pass = CheckInPass::new(booking.tenant_id, booking.member_id, booking.class_session_id);

    Ok(Json(DataResponse::new(PassResponse {
        payload: pass.encode(&state.config.qr_secret),
        booking_id: booking.id,
        class_session_id: booking.class_session_id,
    })))
}

// ---------------------------------------------------------------------------
// Front-desk endpoints
// ---------------------------------------------------------------------------

/// POST /api/v1/bookings/{id}/check-in
pub async fn check_in(
    RequireStaff(auth): RequireStaff,
    State(state): State<AppState>,
    ApiPath(booking_id): ApiPath<DbId>,
) -> AppResult<Json<DataResponse<Booking>>> {
    let booking = state
        .store
        .check_in(
            auth.tenant_id,
            booking_id,
            &state.config.check_in,
            chrono::Utc::now(),
        )
        .await?;

    notify::publish_booking(&state, bus::BOOKING_CHECKED_IN, &booking, &auth);

    Ok(Json(DataResponse::new(booking)))
}

/// POST /api/v1/bookings/check-in/qr
///
/// Check in the booking named by a scanned pass. Passes issued by another
/// studio are reported as not found.
pub async fn check_in_qr(
    RequireStaff(auth): RequireStaff,
    State(state): State<AppState>,
    ValidJson(input): ValidJson<QrCheckIn>,
) -> AppResult<Json<DataResponse<Booking>>> {
    let pass = CheckInPass::decode(&input.payload, &state.config.qr_secret)?;

    if pass.tenant_id != auth.tenant_id {
        return Err(AppError::Core(CoreError::NotFound {
            entity: "ClassSession",
            id: pass.class_session_id,
        }));
    }

    let booking = state
        .store
        .check_in_member(
            auth.tenant_id,
            pass.member_id,
            pass.class_session_id,
            &state.config.check_in,
            chrono::Utc::now(),
        )
        .await?;

    notify::publish_booking(&state, bus::BOOKING_CHECKED_IN, &booking, &auth);

    Ok(Json(DataResponse::new(booking)))
}

/// POST /api/v1/bookings/{id}/no-show
pub async fn mark_no_show(
    RequireStaff(auth): RequireStaff,
    State(state): State<AppState>,
    ApiPath(booking_id): ApiPath<DbId>,
) -> AppResult<Json<DataResponse<Booking>>> {
    let booking = state
        .store
        .mark_no_show(auth.tenant_id, booking_id, chrono::Utc::now())
        .await?;

    notify::publish_booking(&state, bus::BOOKING_NO_SHOW, &booking, &auth);

    Ok(Json(DataResponse::new(booking)))
}
