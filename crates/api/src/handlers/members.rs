//! Handlers for member-scoped views.

use axum::extract::State;
use axum::Json;
use studio_core::types::DbId;
use studio_db::models::booking::Booking;

use crate::error::AppResult;
use crate::extract::ApiPath;
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

/// GET /api/v1/members/{id}/bookings
///
/// Booking history, newest first. Members may only read their own.
pub async fn list_bookings(
    auth: AuthUser,
    State(state): State<AppState>,
    ApiPath(member_id): ApiPath<DbId>,
) -> AppResult<Json<DataResponse<Vec<Booking>>>> {
    auth.ensure_can_act_for(member_id)?;

    let bookings = state
        .store
        .list_member_bookings(auth.tenant_id, member_id)
        .await?;

    Ok(Json(DataResponse::new(bookings)))
}
