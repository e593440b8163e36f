//! Wallet signature authentication
//!
//! Verifies CIP-30 `signData` envelopes produced by a Cardano wallet:
//! - COSE_Sign1 / COSE_Key decoding
//! - Stake address resolution from the protected `address` header
//! - Ed25519 verification over the Sig_structure bytes
//! - Challenge and allow-list checks before a session is issued

pub mod address;
pub mod challenge;
mod crypto;
pub mod envelope;
pub mod registry;
mod service;

#[cfg(test)]
pub(crate) mod fixtures;

use thiserror::Error;

pub use address::{AddressFraming, Identity, RewardAddress, StakeCredential};
pub use crypto::{key_hash, verify_ed25519_signature, CryptoError};
pub use envelope::{decode_public_key, HeaderLabel, SignedEnvelope};
pub use registry::{IdentityRegistry, RegistryError, StaticRegistry};
pub use service::{AuthOutcome, AuthService, AuthSettings, ServiceError};

/// Reasons an authentication attempt is rejected.
///
/// The variants are only ever surfaced in logs and tests. Callers of the HTTP
/// API see a single generic failure regardless of which stage failed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("Malformed signed envelope: {0}")]
    MalformedEnvelope(String),

    #[error("Malformed public key envelope: {0}")]
    MalformedKey(String),

    #[error("Unsupported address type: {0}")]
    UnsupportedAddressType(String),

    #[error("Signature verification failed")]
    SignatureInvalid,

    #[error("Public key does not match the stake credential")]
    KeyMismatch,

    #[error("Payload does not match the expected challenge")]
    PayloadMismatch,

    #[error("Identity is not registered")]
    NotAuthorized,
}

impl AuthError {
    /// Stable reason code for structured logs
    pub fn reason(&self) -> &'static str {
        match self {
            AuthError::MalformedEnvelope(_) => "malformed_envelope",
            AuthError::MalformedKey(_) => "malformed_key",
            AuthError::UnsupportedAddressType(_) => "unsupported_address_type",
            AuthError::SignatureInvalid => "signature_invalid",
            AuthError::KeyMismatch => "key_mismatch",
            AuthError::PayloadMismatch => "payload_mismatch",
            AuthError::NotAuthorized => "not_authorized",
        }
    }
}

impl From<CryptoError> for AuthError {
    fn from(_: CryptoError) -> Self {
        AuthError::SignatureInvalid
    }
}
