//! In-process [`BookingStore`].
//!
//! Each session and its bookings live behind one `tokio::sync::Mutex`; every
//! operation on a session holds that mutex for its whole read-check-write
//! sequence. Sessions never share a lock. Fallible checks run before any
//! mutation so a rejected call leaves the slot untouched.

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use studio_core::booking::{initial_status, validate_transition, BookingStatus};
use studio_core::capacity::SpotCounter;
use studio_core::check_in::{self, CheckInPolicy};
use studio_core::class_session::{self, ensure_bookable, SessionStatus};
use studio_core::types::{DbId, Timestamp};
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};

use super::{
    active_booking_not_found, booking_not_found, ensure_capacity_editable,
    ensure_check_in_allowed, ensure_no_active_booking, ensure_no_show_allowed, guard_capacity,
    session_not_found, BookingStore, StoreResult,
};
use crate::models::booking::{Booking, CancelOutcome};
use crate::models::class_session::{
    CapacityChange, ClassSession, CreateClassSession, SessionListQuery, SessionTransition,
};
use crate::repositories::booking_repo::MEMBER_HISTORY_LIMIT;

/// A session and every booking made on it.
struct SessionSlot {
    session: ClassSession,
    bookings: Vec<Booking>,
}

impl SessionSlot {
    fn booking_index(&self, booking_id: DbId) -> Option<usize> {
        self.bookings.iter().position(|b| b.id == booking_id)
    }

    fn active_for_member(&self, member_id: DbId) -> Option<usize> {
        self.bookings
            .iter()
            .position(|b| b.member_id == member_id && b.status.is_active())
    }

    /// Indices of waitlisted bookings in FIFO order.
    fn waitlist(&self) -> Vec<usize> {
        let mut queue: Vec<usize> = self
            .bookings
            .iter()
            .enumerate()
            .filter(|(_, b)| b.status == BookingStatus::Waitlisted)
            .map(|(i, _)| i)
            .collect();
        queue.sort_by_key(|&i| self.bookings[i].queue_key());
        queue
    }

    /// Confirm up to `limit` waitlisted bookings, oldest first.
    ///
    /// All spots are taken from `counter` before any booking changes.
    fn promote_waitlist(
        &mut self,
        counter: &mut SpotCounter,
        limit: i32,
        now: Timestamp,
    ) -> StoreResult<Vec<Booking>> {
        let session_id = self.session.id;
        let mut queue = self.waitlist();
        queue.truncate(usize::try_from(limit).unwrap_or(0));
        for &i in &queue {
            validate_transition(self.bookings[i].status, BookingStatus::Confirmed)?;
            guard_capacity(counter.increment(), session_id)?;
        }

        let mut promoted = Vec::with_capacity(queue.len());
        for i in queue {
            let booking = &mut self.bookings[i];
            booking.apply_status(BookingStatus::Confirmed, now);
            tracing::info!(
                tenant_id = booking.tenant_id,
                booking_id = booking.id,
                member_id = booking.member_id,
                class_session_id = session_id,
                "Waitlisted booking promoted"
            );
            promoted.push(booking.clone());
        }
        Ok(promoted)
    }

    fn commit_counter(&mut self, counter: SpotCounter, now: Timestamp) {
        self.session.apply_counter(counter);
        self.session.updated_at = now;
    }
}

/// Non-durable store for local runs and tests.
#[derive(Default)]
pub struct MemoryBookingStore {
    sessions: RwLock<HashMap<DbId, Arc<Mutex<SessionSlot>>>>,
    /// booking id -> session id
    booking_sessions: RwLock<HashMap<DbId, DbId>>,
    next_session_id: AtomicI64,
    next_booking_id: AtomicI64,
}

impl MemoryBookingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lock a session's slot, hiding sessions of other tenants.
    async fn lock_session(
        &self,
        tenant_id: DbId,
        id: DbId,
    ) -> StoreResult<OwnedMutexGuard<SessionSlot>> {
        let slot = self
            .sessions
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or_else(|| session_not_found(id))?;
        let guard = slot.lock_owned().await;
        if guard.session.tenant_id != tenant_id {
            return Err(session_not_found(id));
        }
        Ok(guard)
    }

    /// Lock the slot owning a booking and return the booking's index in it.
    async fn lock_booking(
        &self,
        tenant_id: DbId,
        booking_id: DbId,
    ) -> StoreResult<(OwnedMutexGuard<SessionSlot>, usize)> {
        let session_id = self
            .booking_sessions
            .read()
            .await
            .get(&booking_id)
            .copied()
            .ok_or_else(|| booking_not_found(booking_id))?;
        let slot = self
            .lock_session(tenant_id, session_id)
            .await
            .map_err(|_| booking_not_found(booking_id))?;
        let index = slot
            .booking_index(booking_id)
            .ok_or_else(|| booking_not_found(booking_id))?;
        Ok((slot, index))
    }

    fn next_id(counter: &AtomicI64) -> DbId {
        counter.fetch_add(1, Ordering::Relaxed) + 1
    }

    fn check_in_at(
        slot: &mut SessionSlot,
        index: usize,
        policy: &CheckInPolicy,
        now: Timestamp,
    ) -> StoreResult<Booking> {
        ensure_check_in_allowed(&slot.session, &slot.bookings[index], policy, now)?;
        let booking = &mut slot.bookings[index];
        booking.apply_status(BookingStatus::CheckedIn, now);
        tracing::info!(
            tenant_id = booking.tenant_id,
            booking_id = booking.id,
            class_session_id = booking.class_session_id,
            "Booking checked in"
        );
        Ok(booking.clone())
    }
}

#[async_trait]
impl BookingStore for MemoryBookingStore {
    async fn create_session(
        &self,
        tenant_id: DbId,
        input: &CreateClassSession,
        now: Timestamp,
    ) -> StoreResult<ClassSession> {
        class_session::validate_schedule(input.starts_at, input.ends_at, input.capacity)?;
        let session = ClassSession {
            id: Self::next_id(&self.next_session_id),
            tenant_id,
            class_type_id: input.class_type_id,
            location_id: input.location_id,
            starts_at: input.starts_at,
            ends_at: input.ends_at,
            capacity: input.capacity,
            spots_booked: 0,
            status: SessionStatus::Scheduled,
            created_at: now,
            updated_at: now,
        };
        let slot = SessionSlot {
            session: session.clone(),
            bookings: Vec::new(),
        };
        self.sessions
            .write()
            .await
            .insert(session.id, Arc::new(Mutex::new(slot)));
        tracing::info!(tenant_id, class_session_id = session.id, "Class session created");
        Ok(session)
    }

    async fn find_session(&self, tenant_id: DbId, id: DbId) -> StoreResult<Option<ClassSession>> {
        match self.lock_session(tenant_id, id).await {
            Ok(slot) => Ok(Some(slot.session.clone())),
            Err(_) => Ok(None),
        }
    }

    async fn list_sessions(
        &self,
        tenant_id: DbId,
        query: &SessionListQuery,
    ) -> StoreResult<Vec<ClassSession>> {
        let slots: Vec<_> = self.sessions.read().await.values().cloned().collect();
        let mut sessions = Vec::new();
        for slot in slots {
            let slot = slot.lock().await;
            if slot.session.tenant_id == tenant_id && query.matches(slot.session.starts_at) {
                sessions.push(slot.session.clone());
            }
        }
        sessions.sort_by_key(|s| (s.starts_at, s.id));
        sessions.truncate(usize::try_from(query.effective_limit()).unwrap_or(usize::MAX));
        Ok(sessions)
    }

    async fn transition_session(
        &self,
        tenant_id: DbId,
        id: DbId,
        to: SessionStatus,
        now: Timestamp,
    ) -> StoreResult<SessionTransition> {
        let mut slot = self.lock_session(tenant_id, id).await?;
        class_session::validate_transition(slot.session.status, to)?;

        let mut cancelled_bookings = Vec::new();
        if to == SessionStatus::Cancelled {
            let mut counter = slot.session.counter();
            for b in &slot.bookings {
                if b.status == BookingStatus::Confirmed {
                    guard_capacity(counter.decrement(), id)?;
                }
            }
            for b in slot.bookings.iter_mut() {
                if matches!(b.status, BookingStatus::Confirmed | BookingStatus::Waitlisted) {
                    b.apply_status(BookingStatus::Cancelled, now);
                    cancelled_bookings.push(b.clone());
                }
            }
            cancelled_bookings.sort_by_key(Booking::queue_key);
            slot.commit_counter(counter, now);
        }
        slot.session.status = to;
        slot.session.updated_at = now;

        tracing::info!(
            tenant_id,
            class_session_id = id,
            status = %to,
            cancelled_bookings = cancelled_bookings.len(),
            "Class session status changed"
        );
        Ok(SessionTransition {
            session: slot.session.clone(),
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
        let mut slot = self.lock_session(tenant_id, id).await?;
        ensure_capacity_editable(&slot.session)?;

        let mut counter = slot.session.counter();
        counter.resize(capacity)?;
        let open = counter.open_spots();
        let promoted = slot.promote_waitlist(&mut counter, open, now)?;
        slot.commit_counter(counter, now);

        tracing::info!(
            tenant_id,
            class_session_id = id,
            capacity,
            promoted = promoted.len(),
            "Class session capacity changed"
        );
        Ok(CapacityChange {
            session: slot.session.clone(),
            promoted,
        })
    }

    async fn book(
        &self,
        tenant_id: DbId,
        member_id: DbId,
        class_session_id: DbId,
        now: Timestamp,
    ) -> StoreResult<Booking> {
        let mut slot = self.lock_session(tenant_id, class_session_id).await?;
        ensure_bookable(slot.session.status, slot.session.ends_at, now)?;
        let existing = slot.active_for_member(member_id).map(|i| &slot.bookings[i]);
        ensure_no_active_booking(existing)?;

        let mut counter = slot.session.counter();
        let status = initial_status(counter.has_open_spot());
        if status == BookingStatus::Confirmed {
            guard_capacity(counter.increment(), class_session_id)?;
            slot.commit_counter(counter, now);
        }

        let booking = Booking {
            id: Self::next_id(&self.next_booking_id),
            tenant_id,
            member_id,
            class_session_id,
            status,
            created_at: now,
            updated_at: now,
            cancelled_at: None,
            checked_in_at: None,
            promoted_at: None,
        };
        slot.bookings.push(booking.clone());
        self.booking_sessions
            .write()
            .await
            .insert(booking.id, class_session_id);

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
        let (mut slot, index) = self.lock_booking(tenant_id, booking_id).await?;
        let was = slot.bookings[index].status;
        validate_transition(was, BookingStatus::Cancelled)?;

        let mut promoted = None;
        if was.holds_spot() {
            let mut counter = slot.session.counter();
            guard_capacity(counter.decrement(), slot.session.id)?;
            if slot.session.status.promotes_waitlist() {
                promoted = slot.promote_waitlist(&mut counter, 1, now)?.pop();
            }
            slot.commit_counter(counter, now);
        }
        let booking = &mut slot.bookings[index];
        booking.apply_status(BookingStatus::Cancelled, now);
        let cancelled = booking.clone();

        tracing::info!(
            tenant_id,
            booking_id,
            class_session_id = cancelled.class_session_id,
            was = %was,
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
        let (mut slot, index) = self.lock_booking(tenant_id, booking_id).await?;
        Self::check_in_at(&mut slot, index, policy, now)
    }

    async fn check_in_member(
        &self,
        tenant_id: DbId,
        member_id: DbId,
        class_session_id: DbId,
        policy: &CheckInPolicy,
        now: Timestamp,
    ) -> StoreResult<Booking> {
        let mut slot = self.lock_session(tenant_id, class_session_id).await?;
        let index = slot
            .active_for_member(member_id)
            .ok_or_else(|| active_booking_not_found(class_session_id))?;
        Self::check_in_at(&mut slot, index, policy, now)
    }

    async fn mark_no_show(
        &self,
        tenant_id: DbId,
        booking_id: DbId,
        now: Timestamp,
    ) -> StoreResult<Booking> {
        let (mut slot, index) = self.lock_booking(tenant_id, booking_id).await?;
        ensure_no_show_allowed(&slot.session, &slot.bookings[index], now)?;
        let booking = &mut slot.bookings[index];
        booking.apply_status(BookingStatus::NoShow, now);
        tracing::info!(
            tenant_id,
            booking_id,
            class_session_id = booking.class_session_id,
            "Booking marked no-show"
        );
        Ok(booking.clone())
    }

    async fn reconcile_no_shows(
        &self,
        tenant_id: DbId,
        class_session_id: DbId,
        now: Timestamp,
    ) -> StoreResult<Vec<Booking>> {
        let mut slot = self.lock_session(tenant_id, class_session_id).await?;
        check_in::ensure_no_show_allowed(slot.session.ends_at, now)?;

        let mut marked = Vec::new();
        for b in slot.bookings.iter_mut() {
            if b.status == BookingStatus::Confirmed {
                b.apply_status(BookingStatus::NoShow, now);
                marked.push(b.clone());
            }
        }
        marked.sort_by_key(Booking::queue_key);

        tracing::info!(
            tenant_id,
            class_session_id,
            marked = marked.len(),
            "No-shows reconciled"
        );
        Ok(marked)
    }

    async fn find_booking(&self, tenant_id: DbId, id: DbId) -> StoreResult<Option<Booking>> {
        match self.lock_booking(tenant_id, id).await {
            Ok((slot, index)) => Ok(Some(slot.bookings[index].clone())),
            Err(_) => Ok(None),
        }
    }

    async fn list_session_bookings(
        &self,
        tenant_id: DbId,
        class_session_id: DbId,
        statuses: &[BookingStatus],
    ) -> StoreResult<Vec<Booking>> {
        let slot = match self.lock_session(tenant_id, class_session_id).await {
            Ok(slot) => slot,
            Err(_) => return Ok(Vec::new()),
        };
        let mut bookings: Vec<Booking> = slot
            .bookings
            .iter()
            .filter(|b| statuses.contains(&b.status))
            .cloned()
            .collect();
        bookings.sort_by_key(Booking::queue_key);
        Ok(bookings)
    }

    async fn list_member_bookings(
        &self,
        tenant_id: DbId,
        member_id: DbId,
    ) -> StoreResult<Vec<Booking>> {
        let slots: Vec<_> = self.sessions.read().await.values().cloned().collect();
        let mut bookings = Vec::new();
        for slot in slots {
            let slot = slot.lock().await;
            bookings.extend(
                slot.bookings
                    .iter()
                    .filter(|b| b.tenant_id == tenant_id && b.member_id == member_id)
                    .cloned(),
            );
        }
        bookings.sort_by_key(|b| std::cmp::Reverse(b.queue_key()));
        bookings.truncate(MEMBER_HISTORY_LIMIT as usize);
        Ok(bookings)
    }

    async fn health_check(&self) -> StoreResult<()> {
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use chrono::{Duration, TimeZone, Utc};
    use studio_core::error::CoreError;

    use super::*;
    use crate::store::StoreError;

    const TENANT: DbId = 1;

    fn starts_at() -> Timestamp {
        Utc.with_ymd_and_hms(2026, 3, 2, 18, 0, 0).unwrap()
    }

    fn ends_at() -> Timestamp {
        starts_at() + Duration::minutes(60)
    }

    /// A moment well before the session, when booking is open.
    fn before() -> Timestamp {
        starts_at() - Duration::days(1)
    }

    async fn session(store: &MemoryBookingStore, capacity: i32) -> ClassSession {
        let input = CreateClassSession {
            class_type_id: 1,
            location_id: 1,
            starts_at: starts_at(),
            ends_at: ends_at(),
            capacity,
        };
        store.create_session(TENANT, &input, before()).await.unwrap()
    }

    async fn spots_booked(store: &MemoryBookingStore, id: DbId) -> i32 {
        store
            .find_session(TENANT, id)
            .await
            .unwrap()
            .unwrap()
            .spots_booked
    }

    #[tokio::test]
    async fn cancel_promotes_waitlisted_member() {
        let store = MemoryBookingStore::new();
        let s = session(&store, 1).await;

        let a = store.book(TENANT, 10, s.id, before()).await.unwrap();
        assert_eq!(a.status, BookingStatus::Confirmed);
        assert_eq!(spots_booked(&store, s.id).await, 1);

        let b = store
            .book(TENANT, 11, s.id, before() + Duration::seconds(1))
            .await
            .unwrap();
        assert_eq!(b.status, BookingStatus::Waitlisted);
        assert_eq!(spots_booked(&store, s.id).await, 1);

        let outcome = store
            .cancel(TENANT, a.id, before() + Duration::minutes(5))
            .await
            .unwrap();
        assert_eq!(outcome.cancelled.status, BookingStatus::Cancelled);
        assert!(outcome.cancelled.cancelled_at.is_some());
        let promoted = outcome.promoted.expect("waitlisted booking promoted");
        assert_eq!(promoted.id, b.id);
        assert_eq!(promoted.status, BookingStatus::Confirmed);
        assert!(promoted.promoted_at.is_some());
        assert_eq!(spots_booked(&store, s.id).await, 1);
    }

    #[tokio::test]
    async fn promotion_is_fifo_with_id_tiebreak() {
        let store = MemoryBookingStore::new();
        let s = session(&store, 1).await;
        let holder = store.book(TENANT, 1, s.id, before()).await.unwrap();

        // Same timestamp: the earlier insert wins.
        let first = store.book(TENANT, 2, s.id, before()).await.unwrap();
        let second = store.book(TENANT, 3, s.id, before()).await.unwrap();
        assert!(first.id < second.id);

        let outcome = store.cancel(TENANT, holder.id, before()).await.unwrap();
        assert_eq!(outcome.promoted.map(|b| b.id), Some(first.id));

        let waitlist = store
            .list_session_bookings(TENANT, s.id, &[BookingStatus::Waitlisted])
            .await
            .unwrap();
        assert_eq!(waitlist.len(), 1);
        assert_eq!(waitlist[0].id, second.id);
    }

    #[tokio::test]
    async fn cancel_without_waitlist_frees_spot() {
        let store = MemoryBookingStore::new();
        let s = session(&store, 2).await;
        let a = store.book(TENANT, 1, s.id, before()).await.unwrap();

        let outcome = store.cancel(TENANT, a.id, before()).await.unwrap();
        assert!(outcome.promoted.is_none());
        assert_eq!(spots_booked(&store, s.id).await, 0);
    }

    #[tokio::test]
    async fn cancelling_waitlisted_booking_keeps_counter() {
        let store = MemoryBookingStore::new();
        let s = session(&store, 1).await;
        store.book(TENANT, 1, s.id, before()).await.unwrap();
        let waiting = store.book(TENANT, 2, s.id, before()).await.unwrap();

        let outcome = store.cancel(TENANT, waiting.id, before()).await.unwrap();
        assert!(outcome.promoted.is_none());
        assert_eq!(spots_booked(&store, s.id).await, 1);
    }

    #[tokio::test]
    async fn double_cancel_is_invalid_state_without_double_decrement() {
        let store = MemoryBookingStore::new();
        let s = session(&store, 3).await;
        let a = store.book(TENANT, 1, s.id, before()).await.unwrap();
        store.book(TENANT, 2, s.id, before()).await.unwrap();

        store.cancel(TENANT, a.id, before()).await.unwrap();
        assert_eq!(spots_booked(&store, s.id).await, 1);

        let err = store.cancel(TENANT, a.id, before()).await.unwrap_err();
        assert_matches!(err, StoreError::Core(CoreError::InvalidState(_)));
        assert_eq!(spots_booked(&store, s.id).await, 1);
    }

    #[tokio::test]
    async fn duplicate_active_booking_conflicts() {
        let store = MemoryBookingStore::new();
        let s = session(&store, 5).await;
        store.book(TENANT, 7, s.id, before()).await.unwrap();

        let err = store.book(TENANT, 7, s.id, before()).await.unwrap_err();
        assert_matches!(err, StoreError::Core(CoreError::Conflict(_)));
        assert_eq!(spots_booked(&store, s.id).await, 1);
    }

    #[tokio::test]
    async fn member_can_rebook_after_cancelling() {
        let store = MemoryBookingStore::new();
        let s = session(&store, 5).await;
        let first = store.book(TENANT, 7, s.id, before()).await.unwrap();
        store.cancel(TENANT, first.id, before()).await.unwrap();

        let again = store.book(TENANT, 7, s.id, before()).await.unwrap();
        assert_eq!(again.status, BookingStatus::Confirmed);
        assert_ne!(again.id, first.id);
    }

    #[tokio::test]
    async fn concurrent_bookings_never_exceed_capacity() {
        let store = Arc::new(MemoryBookingStore::new());
        let s = session(&store, 2).await;
        store.book(TENANT, 1, s.id, before()).await.unwrap();

        let handles: Vec<_> = (100..120)
            .map(|member| {
                let store = Arc::clone(&store);
                tokio::spawn(async move { store.book(TENANT, member, s.id, before()).await })
            })
            .collect();
        let results = futures::future::join_all(handles).await;

        let confirmed = results
            .into_iter()
            .map(|r| r.unwrap().unwrap())
            .filter(|b| b.status == BookingStatus::Confirmed)
            .count();
        assert_eq!(confirmed, 1);
        assert_eq!(spots_booked(&store, s.id).await, 2);
    }

    #[tokio::test]
    async fn check_in_on_cancelled_booking_is_invalid_state() {
        let store = MemoryBookingStore::new();
        let s = session(&store, 1).await;
        let a = store.book(TENANT, 1, s.id, before()).await.unwrap();
        store.cancel(TENANT, a.id, before()).await.unwrap();

        let err = store
            .check_in(TENANT, a.id, &CheckInPolicy::default(), starts_at())
            .await
            .unwrap_err();
        assert_matches!(err, StoreError::Core(CoreError::InvalidState(_)));
        let stored = store.find_booking(TENANT, a.id).await.unwrap().unwrap();
        assert_eq!(stored.status, BookingStatus::Cancelled);
    }

    #[tokio::test]
    async fn check_in_outside_window_leaves_booking_confirmed() {
        let store = MemoryBookingStore::new();
        let s = session(&store, 1).await;
        let a = store.book(TENANT, 1, s.id, before()).await.unwrap();
        let policy = CheckInPolicy::new(15);

        let err = store
            .check_in(TENANT, a.id, &policy, starts_at() - Duration::minutes(16))
            .await
            .unwrap_err();
        assert_matches!(err, StoreError::Core(CoreError::InvalidState(_)));
        let stored = store.find_booking(TENANT, a.id).await.unwrap().unwrap();
        assert_eq!(stored.status, BookingStatus::Confirmed);

        let checked = store
            .check_in(TENANT, a.id, &policy, starts_at() - Duration::minutes(15))
            .await
            .unwrap();
        assert_eq!(checked.status, BookingStatus::CheckedIn);
        assert!(checked.checked_in_at.is_some());
        assert_eq!(spots_booked(&store, s.id).await, 1);
    }

    #[tokio::test]
    async fn check_in_member_uses_active_booking() {
        let store = MemoryBookingStore::new();
        let s = session(&store, 1).await;
        store.book(TENANT, 5, s.id, before()).await.unwrap();
        let policy = CheckInPolicy::default();

        let booking = store
            .check_in_member(TENANT, 5, s.id, &policy, starts_at())
            .await
            .unwrap();
        assert_eq!(booking.status, BookingStatus::CheckedIn);

        let err = store
            .check_in_member(TENANT, 6, s.id, &policy, starts_at())
            .await
            .unwrap_err();
        assert_matches!(err, StoreError::Core(CoreError::NotFound { .. }));
    }

    #[tokio::test]
    async fn other_tenant_sees_nothing() {
        let store = MemoryBookingStore::new();
        let s = session(&store, 1).await;
        let a = store.book(TENANT, 1, s.id, before()).await.unwrap();

        assert!(store.find_session(2, s.id).await.unwrap().is_none());
        assert!(store.find_booking(2, a.id).await.unwrap().is_none());
        assert_matches!(
            store.cancel(2, a.id, before()).await,
            Err(StoreError::Core(CoreError::NotFound { .. }))
        );
        assert_matches!(
            store.book(2, 1, s.id, before()).await,
            Err(StoreError::Core(CoreError::NotFound { .. }))
        );
    }

    #[tokio::test]
    async fn no_shows_only_after_session_ends() {
        let store = MemoryBookingStore::new();
        let s = session(&store, 3).await;
        let a = store.book(TENANT, 1, s.id, before()).await.unwrap();
        let b = store.book(TENANT, 2, s.id, before()).await.unwrap();
        store
            .check_in(TENANT, b.id, &CheckInPolicy::default(), starts_at())
            .await
            .unwrap();

        assert_matches!(
            store.reconcile_no_shows(TENANT, s.id, starts_at()).await,
            Err(StoreError::Core(CoreError::InvalidState(_)))
        );

        let marked = store.reconcile_no_shows(TENANT, s.id, ends_at()).await.unwrap();
        assert_eq!(marked.len(), 1);
        assert_eq!(marked[0].id, a.id);
        assert_eq!(marked[0].status, BookingStatus::NoShow);
        assert_eq!(spots_booked(&store, s.id).await, 2);

        assert_matches!(
            store.mark_no_show(TENANT, a.id, ends_at()).await,
            Err(StoreError::Core(CoreError::InvalidState(_)))
        );
    }

    #[tokio::test]
    async fn capacity_increase_promotes_in_order() {
        let store = MemoryBookingStore::new();
        let s = session(&store, 1).await;
        store.book(TENANT, 1, s.id, before()).await.unwrap();
        let w1 = store.book(TENANT, 2, s.id, before()).await.unwrap();
        let w2 = store.book(TENANT, 3, s.id, before()).await.unwrap();
        let w3 = store.book(TENANT, 4, s.id, before()).await.unwrap();

        let change = store.change_capacity(TENANT, s.id, 3, before()).await.unwrap();
        let ids: Vec<_> = change.promoted.iter().map(|b| b.id).collect();
        assert_eq!(ids, vec![w1.id, w2.id]);
        assert_eq!(change.session.capacity, 3);
        assert_eq!(change.session.spots_booked, 3);

        let waitlist = store
            .list_session_bookings(TENANT, s.id, &[BookingStatus::Waitlisted])
            .await
            .unwrap();
        assert_eq!(waitlist.len(), 1);
        assert_eq!(waitlist[0].id, w3.id);
    }

    #[tokio::test]
    async fn capacity_below_booked_conflicts() {
        let store = MemoryBookingStore::new();
        let s = session(&store, 3).await;
        store.book(TENANT, 1, s.id, before()).await.unwrap();
        store.book(TENANT, 2, s.id, before()).await.unwrap();

        assert_matches!(
            store.change_capacity(TENANT, s.id, 1, before()).await,
            Err(StoreError::Core(CoreError::Conflict(_)))
        );
        let s = store.find_session(TENANT, s.id).await.unwrap().unwrap();
        assert_eq!(s.capacity, 3);
    }

    #[tokio::test]
    async fn cancelling_session_cancels_open_bookings_without_promotion() {
        let store = MemoryBookingStore::new();
        let s = session(&store, 1).await;
        store.book(TENANT, 1, s.id, before()).await.unwrap();
        store.book(TENANT, 2, s.id, before()).await.unwrap();

        let transition = store
            .transition_session(TENANT, s.id, SessionStatus::Cancelled, before())
            .await
            .unwrap();
        assert_eq!(transition.session.status, SessionStatus::Cancelled);
        assert_eq!(transition.session.spots_booked, 0);
        assert_eq!(transition.cancelled_bookings.len(), 2);
        assert!(transition
            .cancelled_bookings
            .iter()
            .all(|b| b.status == BookingStatus::Cancelled));

        assert_matches!(
            store.book(TENANT, 3, s.id, before()).await,
            Err(StoreError::Core(CoreError::InvalidState(_)))
        );
        assert_matches!(
            store
                .transition_session(TENANT, s.id, SessionStatus::InProgress, before())
                .await,
            Err(StoreError::Core(CoreError::InvalidState(_)))
        );
    }

    #[tokio::test]
    async fn completed_session_does_not_promote() {
        let store = MemoryBookingStore::new();
        let s = session(&store, 1).await;
        let a = store.book(TENANT, 1, s.id, before()).await.unwrap();
        store.book(TENANT, 2, s.id, before()).await.unwrap();
        store
            .transition_session(TENANT, s.id, SessionStatus::InProgress, starts_at())
            .await
            .unwrap();
        store
            .transition_session(TENANT, s.id, SessionStatus::Completed, ends_at())
            .await
            .unwrap();

        let outcome = store.cancel(TENANT, a.id, ends_at()).await.unwrap();
        assert!(outcome.promoted.is_none());
        assert_eq!(spots_booked(&store, s.id).await, 0);
    }

    #[tokio::test]
    async fn member_history_is_newest_first() {
        let store = MemoryBookingStore::new();
        let s1 = session(&store, 5).await;
        let s2 = session(&store, 5).await;
        let old = store.book(TENANT, 9, s1.id, before()).await.unwrap();
        let new = store
            .book(TENANT, 9, s2.id, before() + Duration::hours(1))
            .await
            .unwrap();
        store.book(TENANT, 10, s2.id, before()).await.unwrap();

        let history = store.list_member_bookings(TENANT, 9).await.unwrap();
        let ids: Vec<_> = history.iter().map(|b| b.id).collect();
        assert_eq!(ids, vec![new.id, old.id]);
    }
}
