//! Authentication service
//!
//! Core business logic for wallet-based authentication: decode, resolve,
//! verify, check the challenge and the allow-list, then open a session.

use std::sync::Arc;

use thiserror::Error;

use crate::session::{redact_session_id, Session, SessionError, SessionManager};

use super::address::{resolve_reward_address, AddressFraming, StakeCredential};
use super::challenge::validate_challenge;
use super::crypto::{key_hash, verify_ed25519_signature};
use super::envelope::{decode_public_key, SignedEnvelope};
use super::registry::{IdentityRegistry, RegistryError};
use super::{AuthError, Identity};

/// Faults that are not a verdict on the credentials
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Identity registry error: {0}")]
    Registry(#[from] RegistryError),

    #[error("Session error: {0}")]
    Session(#[from] SessionError),
}

/// Result of one authentication attempt
#[derive(Debug)]
pub enum AuthOutcome {
    Authenticated(Session),
    Rejected(AuthError),
}

/// Verification policy
#[derive(Debug, Clone, Copy)]
pub struct AuthSettings {
    pub address_framing: AddressFraming,
    /// Require the COSE_Key to hash to the stake key credential
    pub require_key_binding: bool,
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            address_framing: AddressFraming::default(),
            require_key_binding: true,
        }
    }
}

/// Authentication service
pub struct AuthService {
    registry: Arc<dyn IdentityRegistry>,
    sessions: Arc<SessionManager>,
    settings: AuthSettings,
}

impl AuthService {
    pub fn new(
        registry: Arc<dyn IdentityRegistry>,
        sessions: Arc<SessionManager>,
        settings: AuthSettings,
    ) -> Self {
        Self {
            registry,
            sessions,
            settings,
        }
    }

    /// Check an envelope and key without touching the registry or sessions.
    ///
    /// Returns the identity that provably signed its own challenge.
    pub fn verify_envelope(&self, envelope: &[u8], key: &[u8]) -> Result<Identity, AuthError> {
        let envelope = SignedEnvelope::from_bytes(envelope)?;
        let public_key = decode_public_key(key)?;

        let address =
            resolve_reward_address(envelope.address_header()?, self.settings.address_framing)?;
        let identity = address.to_identity()?;

        verify_ed25519_signature(&public_key, envelope.signed_data(), envelope.signature())?;

        if self.settings.require_key_binding {
            match address.credential() {
                StakeCredential::KeyHash(hash) if *hash == key_hash(&public_key) => {}
                _ => return Err(AuthError::KeyMismatch),
            }
        }

        validate_challenge(&identity, envelope.payload())?;

        Ok(identity)
    }

    /// Authenticate a signed envelope and key, opening a session on success
    pub async fn authenticate(
        &self,
        envelope: &[u8],
        key: &[u8],
    ) -> Result<AuthOutcome, ServiceError> {
        let identity = match self.verify_envelope(envelope, key) {
            Ok(identity) => identity,
            Err(reason) => return Ok(reject(reason, None)),
        };

        if !self.registry.is_registered(&identity).await? {
            return Ok(reject(AuthError::NotAuthorized, Some(&identity)));
        }

        let session = self.sessions.issue(identity).await?;

        tracing::info!(
            identity = %session.identity,
            session = redact_session_id(&session.id),
            expires_at = %session.expires_at,
            "Wallet authentication succeeded"
        );

        Ok(AuthOutcome::Authenticated(session))
    }

    /// Authenticate hex-encoded envelope and key as sent by the browser
    pub async fn authenticate_hex(
        &self,
        envelope_hex: &str,
        key_hex: &str,
    ) -> Result<AuthOutcome, ServiceError> {
        let envelope = match hex::decode(envelope_hex.trim()) {
            Ok(bytes) => bytes,
            Err(e) => {
                return Ok(reject(
                    AuthError::MalformedEnvelope(format!("invalid hex: {}", e)),
                    None,
                ))
            }
        };

        let key = match hex::decode(key_hex.trim()) {
            Ok(bytes) => bytes,
            Err(e) => {
                return Ok(reject(
                    AuthError::MalformedKey(format!("invalid hex: {}", e)),
                    None,
                ))
            }
        };

        self.authenticate(&envelope, &key).await
    }
}

fn reject(reason: AuthError, identity: Option<&Identity>) -> AuthOutcome {
    tracing::warn!(
        reason = reason.reason(),
        identity = identity.map(|i| i.as_str()),
        detail = %reason,
        "Wallet authentication rejected"
    );
    AuthOutcome::Rejected(reason)
}
