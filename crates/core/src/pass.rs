//! Signed check-in passes rendered as QR codes.
//!
//! Wire format: `{tenant_id}.{member_id}.{class_session_id}.{signature}`,
//! where the signature is [`sign_hex`] over the first three fields.

use crate::error::CoreError;
use crate::signing::{sign_hex, verify_hex};
use crate::types::DbId;

/// The identity a pass vouches for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckInPass {
    pub tenant_id: DbId,
    pub member_id: DbId,
    pub class_session_id: DbId,
}

impl CheckInPass {
    pub fn new(tenant_id: DbId, member_id: DbId, class_session_id: DbId) -> Self {
        Self {
            tenant_id,
            member_id,
            class_session_id,
        }
    }

    fn body(&self) -> String {
        format!(
            "{}.{}.{}",
            self.tenant_id, self.member_id, self.class_session_id
        )
    }

    /// Render the signed payload embedded in the QR code.
    pub fn encode(&self, secret: &str) -> String {
        let body = self.body();
        let signature = sign_hex(secret, &body);
        format!("{body}.{signature}")
    }

    /// Parse and verify a scanned payload.
    pub fn decode(payload: &str, secret: &str) -> Result<Self, CoreError> {
        let malformed = || CoreError::Validation("Malformed check-in pass".into());

        let mut parts = payload.trim().split('.');
        let (Some(tenant), Some(member), Some(session), Some(signature), None) = (
            parts.next(),
            parts.next(),
            parts.next(),
            parts.next(),
            parts.next(),
        ) else {
            return Err(malformed());
        };

        let pass = Self {
            tenant_id: tenant.parse().map_err(|_| malformed())?,
            member_id: member.parse().map_err(|_| malformed())?,
            class_session_id: session.parse().map_err(|_| malformed())?,
        };

        if !verify_hex(secret, &pass.body(), signature) {
            return Err(CoreError::Unauthorized(
                "Check-in pass signature is invalid".into(),
            ));
        }
        Ok(pass)
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    const SECRET: &str = "pass-secret";

    #[test]
    fn encoded_pass_decodes_to_same_identity() {
        let pass = CheckInPass::new(3, 42, 900);
        let payload = pass.encode(SECRET);
        assert!(payload.starts_with("3.42.900."));
        assert_eq!(CheckInPass::decode(&payload, SECRET).unwrap(), pass);
    }

    #[test]
    fn tampered_member_is_unauthorized() {
        let payload = CheckInPass::new(3, 42, 900).encode(SECRET);
        let tampered = payload.replacen("3.42.", "3.43.", 1);
        assert_matches!(
            CheckInPass::decode(&tampered, SECRET),
            Err(CoreError::Unauthorized(_))
        );
    }

    #[test]
    fn wrong_secret_is_unauthorized() {
        let payload = CheckInPass::new(1, 2, 3).encode(SECRET);
        assert_matches!(
            CheckInPass::decode(&payload, "other"),
            Err(CoreError::Unauthorized(_))
        );
    }

    #[test]
    fn malformed_payloads_are_validation_errors() {
        for payload in ["", "1.2.3", "a.2.3.sig", "1.2.3.sig.extra"] {
            assert_matches!(
                CheckInPass::decode(payload, SECRET),
                Err(CoreError::Validation(_)),
                "payload {payload:?}"
            );
        }
    }
}
