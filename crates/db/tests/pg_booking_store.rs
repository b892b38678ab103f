//! Postgres store tests. Run with `--features pg-tests` and `DATABASE_URL` set.
#![cfg(feature = "pg-tests")]

use std::sync::Arc;

use assert_matches::assert_matches;
use chrono::{Duration, TimeZone, Utc};
use sqlx::PgPool;
use studio_core::booking::BookingStatus;
use studio_core::check_in::CheckInPolicy;
use studio_core::class_session::SessionStatus;
use studio_core::error::CoreError;
use studio_core::types::{DbId, Timestamp};
use studio_db::models::class_session::{ClassSession, CreateClassSession};
use studio_db::store::{BookingStore, PgBookingStore, StoreError};

const TENANT: DbId = 1;

fn starts_at() -> Timestamp {
    Utc.with_ymd_and_hms(2026, 3, 2, 18, 0, 0).unwrap()
}

fn before() -> Timestamp {
    starts_at() - Duration::days(1)
}

async fn session(store: &PgBookingStore, capacity: i32) -> ClassSession {
    let input = CreateClassSession {
        class_type_id: 1,
        location_id: 1,
        starts_at: starts_at(),
        ends_at: starts_at() + Duration::hours(1),
        capacity,
    };
    store.create_session(TENANT, &input, before()).await.unwrap()
}

async fn spots_booked(store: &PgBookingStore, id: DbId) -> i32 {
    store
        .find_session(TENANT, id)
        .await
        .unwrap()
        .unwrap()
        .spots_booked
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn cancel_promotes_oldest_waitlisted(pool: PgPool) {
    let store = PgBookingStore::new(pool);
    let s = session(&store, 1).await;

    let a = store.book(TENANT, 10, s.id, before()).await.unwrap();
    let b = store.book(TENANT, 11, s.id, before()).await.unwrap();
    let c = store.book(TENANT, 12, s.id, before()).await.unwrap();
    assert_eq!(a.status, BookingStatus::Confirmed);
    assert_eq!(b.status, BookingStatus::Waitlisted);
    assert_eq!(c.status, BookingStatus::Waitlisted);

    let outcome = store.cancel(TENANT, a.id, before()).await.unwrap();
    assert_eq!(outcome.cancelled.status, BookingStatus::Cancelled);
    assert_eq!(outcome.promoted.as_ref().map(|p| p.id), Some(b.id));
    assert_eq!(spots_booked(&store, s.id).await, 1);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn double_cancel_does_not_double_decrement(pool: PgPool) {
    let store = PgBookingStore::new(pool);
    let s = session(&store, 2).await;
    let a = store.book(TENANT, 1, s.id, before()).await.unwrap();
    store.book(TENANT, 2, s.id, before()).await.unwrap();

    store.cancel(TENANT, a.id, before()).await.unwrap();
    assert_matches!(
        store.cancel(TENANT, a.id, before()).await,
        Err(StoreError::Core(CoreError::InvalidState(_)))
    );
    assert_eq!(spots_booked(&store, s.id).await, 1);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn duplicate_active_booking_conflicts(pool: PgPool) {
    let store = PgBookingStore::new(pool);
    let s = session(&store, 3).await;
    store.book(TENANT, 5, s.id, before()).await.unwrap();

    assert_matches!(
        store.book(TENANT, 5, s.id, before()).await,
        Err(StoreError::Core(CoreError::Conflict(_)))
    );
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn concurrent_bookings_respect_capacity(pool: PgPool) {
    let store = Arc::new(PgBookingStore::new(pool));
    let s = session(&store, 2).await;
    store.book(TENANT, 1, s.id, before()).await.unwrap();

    let handles: Vec<_> = (100..110)
        .map(|member| {
            let store = Arc::clone(&store);
            tokio::spawn(async move { store.book(TENANT, member, s.id, before()).await })
        })
        .collect();
    let confirmed = futures::future::join_all(handles)
        .await
        .into_iter()
        .map(|r| r.unwrap().unwrap())
        .filter(|b| b.status == BookingStatus::Confirmed)
        .count();

    assert_eq!(confirmed, 1);
    assert_eq!(spots_booked(&store, s.id).await, 2);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn check_in_window_and_terminal_state(pool: PgPool) {
    let store = PgBookingStore::new(pool);
    let s = session(&store, 2).await;
    let a = store.book(TENANT, 1, s.id, before()).await.unwrap();
    let policy = CheckInPolicy::new(10);

    assert_matches!(
        store
            .check_in(TENANT, a.id, &policy, starts_at() - Duration::minutes(11))
            .await,
        Err(StoreError::Core(CoreError::InvalidState(_)))
    );
    let checked = store.check_in(TENANT, a.id, &policy, starts_at()).await.unwrap();
    assert_eq!(checked.status, BookingStatus::CheckedIn);
    assert!(checked.checked_in_at.is_some());

    assert_matches!(
        store.cancel(TENANT, a.id, starts_at()).await,
        Err(StoreError::Core(CoreError::InvalidState(_)))
    );
    assert_eq!(spots_booked(&store, s.id).await, 1);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn session_cancel_releases_confirmed_spots(pool: PgPool) {
    let store = PgBookingStore::new(pool);
    let s = session(&store, 2).await;
    let a = store.book(TENANT, 1, s.id, before()).await.unwrap();
    store.book(TENANT, 2, s.id, before()).await.unwrap();
    store.book(TENANT, 3, s.id, before()).await.unwrap();
    store
        .check_in(TENANT, a.id, &CheckInPolicy::default(), starts_at())
        .await
        .unwrap();

    let transition = store
        .transition_session(TENANT, s.id, SessionStatus::Cancelled, starts_at())
        .await
        .unwrap();
    assert_eq!(transition.cancelled_bookings.len(), 2);
    assert_eq!(transition.session.status, SessionStatus::Cancelled);
    // The checked-in booking keeps its spot.
    assert_eq!(transition.session.spots_booked, 1);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn other_tenant_is_not_found(pool: PgPool) {
    let store = PgBookingStore::new(pool);
    let s = session(&store, 1).await;
    let a = store.book(TENANT, 1, s.id, before()).await.unwrap();

    assert!(store.find_booking(TENANT + 1, a.id).await.unwrap().is_none());
    assert_matches!(
        store.cancel(TENANT + 1, a.id, before()).await,
        Err(StoreError::Core(CoreError::NotFound { .. }))
    );
}
