//! Domain rules for the studio booking service.
//!
//! This crate has zero internal deps so the same rules back both store
//! backends, the HTTP layer, and any future tooling.

pub mod booking;
pub mod capacity;
pub mod check_in;
pub mod class_session;
pub mod error;
pub mod pass;
pub mod roles;
pub mod signing;
pub mod types;
