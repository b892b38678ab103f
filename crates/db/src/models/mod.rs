//! Domain model structs and DTOs.
//!
//! Each submodule contains a `FromRow` + `Serialize` entity struct matching
//! the database row plus the `Deserialize` DTOs accepted by the API.

pub mod booking;
pub mod class_session;
