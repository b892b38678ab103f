//! Repository layer for the Postgres backend.
//!
//! Each repository is a zero-sized struct providing async SQL methods.
//! Reads take `&PgPool`; anything that must run inside a booking
//! transaction takes `&mut PgConnection` so callers pass the open transaction.

pub mod booking_repo;
pub mod class_session_repo;

pub use booking_repo::BookingRepo;
pub use class_session_repo::ClassSessionRepo;
