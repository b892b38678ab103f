//! Route definitions for the `/classes` resource.

use axum::routing::{get, post, put};
use axum::Router;

use crate::handlers::classes;
use crate::state::AppState;

/// Routes mounted at `/classes`.
///
/// ```text
/// GET    /                  -> list_sessions
/// POST   /                  -> create_session
/// GET    /{id}              -> get_session
/// PUT    /{id}/capacity     -> update_capacity
/// POST   /{id}/start        -> start_session
/// POST   /{id}/complete     -> complete_session
/// POST   /{id}/cancel       -> cancel_session
/// POST   /{id}/no-shows     -> reconcile_no_shows
/// GET    /{id}/roster       -> roster
/// GET    /{id}/waitlist     -> waitlist
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(classes::list_sessions).post(classes::create_session),
        )
        .route("/{id}", get(classes::get_session))
        .route("/{id}/capacity", put(classes::update_capacity))
        // Lifecycle
        .route("/{id}/start", post(classes::start_session))
        .route("/{id}/complete", post(classes::complete_session))
        .route("/{id}/cancel", post(classes::cancel_session))
        .route("/{id}/no-shows", post(classes::reconcile_no_shows))
        // Roster views
        .route("/{id}/roster", get(classes::roster))
        .route("/{id}/waitlist", get(classes::waitlist))
}
