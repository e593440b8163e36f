//! Session management
//!
//! Sessions are opaque random tokens mapped to an authenticated identity.
//! They are issued after a successful wallet authentication, resolved on
//! every protected request and die at `expires_at` or on revocation.

mod clock;
mod cookie;
mod store;

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use rand::rngs::OsRng;
use rand::RngCore;
use thiserror::Error;

use crate::auth::Identity;

pub use clock::{Clock, ManualClock, SystemClock};
pub use cookie::CookieSettings;
pub use store::{InMemorySessionStore, SessionStore, SessionStoreError};

/// Bytes of randomness in a session id
const SESSION_ID_BYTES: usize = 32;

/// Attempts at drawing an unused session id before giving up
const MAX_ID_ATTEMPTS: usize = 3;

/// Session lookup errors
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Session not found")]
    SessionNotFound,

    #[error("Session expired")]
    SessionExpired,

    #[error("Session lifetime overflows the calendar")]
    ExpiryOutOfRange,

    #[error(transparent)]
    Store(#[from] SessionStoreError),
}

/// An authenticated session
#[derive(Debug, Clone)]
pub struct Session {
    pub id: String,
    pub identity: Identity,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    /// A session is expired from `expires_at` onwards
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// Issues, resolves and revokes sessions
pub struct SessionManager {
    store: Arc<dyn SessionStore>,
    clock: Arc<dyn Clock>,
    ttl: Duration,
}

impl SessionManager {
    pub fn new(store: Arc<dyn SessionStore>, clock: Arc<dyn Clock>, ttl: Duration) -> Self {
        Self { store, clock, ttl }
    }

    /// Create and store a fresh session for `identity`
    pub async fn issue(&self, identity: Identity) -> Result<Session, SessionError> {
        let created_at = self.clock.now();
        let expires_at = created_at
            .checked_add_signed(self.ttl)
            .ok_or(SessionError::ExpiryOutOfRange)?;

        let mut attempts = 0;
        loop {
            let session = Session {
                id: generate_session_id(),
                identity: identity.clone(),
                created_at,
                expires_at,
            };

            match self.store.put(session.clone()).await {
                Ok(()) => return Ok(session),
                Err(SessionStoreError::DuplicateId) if attempts + 1 < MAX_ID_ATTEMPTS => {
                    attempts += 1;
                    tracing::warn!(attempts, "Session id collision, drawing a new id");
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Look up a live session by id, removing it if it has expired
    pub async fn resolve(&self, id: &str) -> Result<Session, SessionError> {
        let session = self
            .store
            .get(id)
            .await?
            .ok_or(SessionError::SessionNotFound)?;

        if session.is_expired_at(self.clock.now()) {
            self.store.delete(id).await?;
            return Err(SessionError::SessionExpired);
        }

        Ok(session)
    }

    /// Revoke a session (logout)
    pub async fn revoke(&self, id: &str) -> Result<bool, SessionStoreError> {
        self.store.delete(id).await
    }

    /// Remove every expired session
    pub async fn sweep_expired(&self) -> Result<usize, SessionStoreError> {
        self.store.purge_expired(self.clock.now()).await
    }

    pub async fn active_sessions(&self) -> Result<usize, SessionStoreError> {
        self.store.len().await
    }
}

/// Periodically purge expired sessions
pub async fn run_expiry_sweeper(manager: Arc<SessionManager>, interval: std::time::Duration) {
    tracing::info!(interval_secs = interval.as_secs(), "Starting session expiry sweeper");

    loop {
        tokio::time::sleep(interval).await;

        match manager.sweep_expired().await {
            Ok(0) => {}
            Ok(removed) => tracing::debug!(removed, "Purged expired sessions"),
            Err(e) => tracing::error!("Error purging expired sessions: {}", e),
        }
    }
}

/// Short, non-secret prefix of a session id for logs
pub fn redact_session_id(id: &str) -> &str {
    id.get(..8).unwrap_or(id)
}

fn generate_session_id() -> String {
    let mut bytes = [0u8; SESSION_ID_BYTES];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}
