pub mod bookings;
pub mod classes;
pub mod health;
pub mod members;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Every route requires a Bearer token; the token's tenant scopes all
/// reads and writes.
///
/// ```text
/// /bookings                          create
/// /bookings/check-in/qr              check in by scanned pass (staff)
/// /bookings/{id}                     get, cancel (DELETE)
/// /bookings/{id}/check-in            check in (staff)
/// /bookings/{id}/no-show             mark no-show (staff)
/// /bookings/{id}/pass                signed check-in pass
///
/// /classes                           list, create (staff)
/// /classes/{id}                      get
/// /classes/{id}/capacity             change capacity (staff, PUT)
/// /classes/{id}/start                start (staff)
/// /classes/{id}/complete             complete (staff)
/// /classes/{id}/cancel               cancel with its bookings (staff)
/// /classes/{id}/no-shows             reconcile no-shows (staff)
/// /classes/{id}/roster               confirmed and checked-in (staff)
/// /classes/{id}/waitlist             waitlist with positions (staff)
///
/// /members/{id}/bookings             booking history
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/bookings", bookings::router())
        .nest("/classes", classes::router())
        .nest("/members", members::router())
}
