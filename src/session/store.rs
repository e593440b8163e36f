//! Session storage backends

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio::sync::RwLock;

use super::Session;

/// Session store errors
#[derive(Error, Debug)]
pub enum SessionStoreError {
    #[error("Session id already exists")]
    DuplicateId,

    #[error("Session backend unavailable: {0}")]
    Unavailable(String),
}

/// Key/value storage for sessions, keyed by session id
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Insert a new session; fails if the id is already taken
    async fn put(&self, session: Session) -> Result<(), SessionStoreError>;

    async fn get(&self, id: &str) -> Result<Option<Session>, SessionStoreError>;

    /// Remove a session, returning whether it existed
    async fn delete(&self, id: &str) -> Result<bool, SessionStoreError>;

    /// Drop every session expired at `now`, returning how many were removed
    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<usize, SessionStoreError>;

    async fn len(&self) -> Result<usize, SessionStoreError>;
}

/// Process-local session table
#[derive(Debug, Default)]
pub struct InMemorySessionStore {
    sessions: RwLock<HashMap<String, Session>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn put(&self, session: Session) -> Result<(), SessionStoreError> {
        let mut sessions = self.sessions.write().await;
        if sessions.contains_key(&session.id) {
            return Err(SessionStoreError::DuplicateId);
        }
        sessions.insert(session.id.clone(), session);
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<Session>, SessionStoreError> {
        Ok(self.sessions.read().await.get(id).cloned())
    }

    async fn delete(&self, id: &str) -> Result<bool, SessionStoreError> {
        Ok(self.sessions.write().await.remove(id).is_some())
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<usize, SessionStoreError> {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, session| !session.is_expired_at(now));
        Ok(before - sessions.len())
    }

    async fn len(&self) -> Result<usize, SessionStoreError> {
        Ok(self.sessions.read().await.len())
    }
}
