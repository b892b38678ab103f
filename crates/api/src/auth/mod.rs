//! Bearer-token verification.
//!
//! Tokens are minted by the identity service; this crate only validates
//! them. [`jwt::generate_access_token`] exists for local tooling and tests.

pub mod jwt;
