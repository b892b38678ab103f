//! Authentication and authorization extractors.
//!
//! - [`auth::AuthUser`] -- the caller, decoded from the JWT Bearer token.
//! - [`rbac::RequireStaff`] -- requires `staff` or `admin`.

pub mod auth;
pub mod rbac;
