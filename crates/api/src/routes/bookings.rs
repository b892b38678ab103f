//! Route definitions for the `/bookings` resource.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::bookings;
use crate::state::AppState;

/// Routes mounted at `/bookings`.
///
/// ```text
/// POST   /                  -> create_booking
/// POST   /check-in/qr       -> check_in_qr
/// GET    /{id}              -> get_booking
/// DELETE /{id}              -> cancel_booking
/// POST   /{id}/check-in     -> check_in
/// POST   /{id}/no-show      -> mark_no_show
/// GET    /{id}/pass         -> get_pass
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(bookings::create_booking))
        .route("/check-in/qr", post(bookings::check_in_qr))
        .route(
            "/{id}",
            get(bookings::get_booking).delete(bookings::cancel_booking),
        )
        .route("/{id}/check-in", post(bookings::check_in))
        .route("/{id}/no-show", post(bookings::mark_no_show))
        .route("/{id}/pass", get(bookings::get_pass))
}
