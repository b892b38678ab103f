//! Well-known role name constants.
//!
//! These must match the `role` claim minted by the identity service.

pub const ROLE_ADMIN: &str = "admin";
pub const ROLE_STAFF: &str = "staff";
pub const ROLE_MEMBER: &str = "member";

/// Whether `role` may perform front-desk actions (check-in, roster, no-shows).
pub fn is_staff(role: &str) -> bool {
    role == ROLE_ADMIN || role == ROLE_STAFF
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admin_and_staff_are_staff() {
        assert!(is_staff(ROLE_ADMIN));
        assert!(is_staff(ROLE_STAFF));
    }

    #[test]
    fn member_is_not_staff() {
        assert!(!is_staff(ROLE_MEMBER));
        assert!(!is_staff(""));
    }
}
