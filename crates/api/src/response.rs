//! Success envelope shared by every handler.
//!
//! Errors use the matching shape rendered by [`AppError`](crate::error::AppError).

use serde::Serialize;

/// `{ "success": true, "data": T }`
#[derive(Debug, Serialize)]
pub struct DataResponse<T: Serialize> {
    pub success: bool,
    pub data: T,
}

impl<T: Serialize> DataResponse<T> {
    pub fn new(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}
