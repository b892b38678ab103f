//! JWT-based authentication extractor for Axum handlers.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use studio_core::error::CoreError;
use studio_core::roles;
use studio_core::types::DbId;

use crate::auth::jwt::validate_token;
use crate::error::AppError;
use crate::state::AppState;

/// The caller, decoded from the `Authorization: Bearer <jwt>` header.
///
/// Every store call made on behalf of this caller is scoped to `tenant_id`.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: DbId,
    pub tenant_id: DbId,
    pub role: String,
    pub member_id: Option<DbId>,
}

impl AuthUser {
    pub fn is_staff(&self) -> bool {
        roles::is_staff(&self.role)
    }

    /// Staff may act for any member of their tenant; members only for
    /// themselves.
    pub fn ensure_can_act_for(&self, member_id: DbId) -> Result<(), AppError> {
        if self.is_staff() || self.member_id == Some(member_id) {
            return Ok(());
        }
        Err(AppError::Core(CoreError::Forbidden(
            "Members may only act on their own bookings".into(),
        )))
    }

    /// Resolve which member a booking request is for.
    ///
    /// Staff must name the member unless their own account has one.
    pub fn resolve_member(&self, requested: Option<DbId>) -> Result<DbId, AppError> {
        let member_id = requested.or(self.member_id).ok_or_else(|| {
            AppError::Core(CoreError::Validation("memberId is required".into()))
        })?;
        self.ensure_can_act_for(member_id)?;
        Ok(member_id)
    }
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| {
                AppError::Core(CoreError::Unauthorized(
                    "Missing Authorization header".into(),
                ))
            })?;

        let token = auth_header.strip_prefix("Bearer ").ok_or_else(|| {
            AppError::Core(CoreError::Unauthorized(
                "Invalid Authorization format. Expected: Bearer <token>".into(),
            ))
        })?;

        let claims = validate_token(token, &state.config.jwt).map_err(|_| {
            AppError::Core(CoreError::Unauthorized("Invalid or expired token".into()))
        })?;

        Ok(AuthUser {
            user_id: claims.sub,
            tenant_id: claims.tenant_id,
            role: claims.role,
            member_id: claims.member_id,
        })
    }
}
