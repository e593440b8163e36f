//! Challenge reconstruction
//!
//! The wallet signs `account: <stake address>`. The server never issues the
//! challenge; it rebuilds it from the identity found in the envelope.

use super::{AuthError, Identity};

pub const CHALLENGE_PREFIX: &str = "account: ";

/// The exact payload a wallet must sign for `identity`
pub fn expected_challenge(identity: &Identity) -> String {
    format!("{}{}", CHALLENGE_PREFIX, identity)
}

/// Compare the signed payload byte-for-byte against the expected challenge
pub fn validate_challenge(identity: &Identity, payload: &[u8]) -> Result<(), AuthError> {
    if payload == expected_challenge(identity).as_bytes() {
        Ok(())
    } else {
        Err(AuthError::PayloadMismatch)
    }
}
