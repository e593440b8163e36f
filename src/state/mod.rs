//! Application state shared across handlers

use std::sync::Arc;

use axum::extract::FromRef;

use crate::auth::AuthService;
use crate::session::{CookieSettings, SessionManager};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub auth_service: Arc<AuthService>,
    pub sessions: Arc<SessionManager>,
    pub cookie: CookieSettings,
}

impl AppState {
    pub fn new(
        auth_service: Arc<AuthService>,
        sessions: Arc<SessionManager>,
        cookie: CookieSettings,
    ) -> Self {
        Self {
            auth_service,
            sessions,
            cookie,
        }
    }
}

impl FromRef<AppState> for Arc<AuthService> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.auth_service.clone()
    }
}

impl FromRef<AppState> for Arc<SessionManager> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.sessions.clone()
    }
}

impl FromRef<AppState> for CookieSettings {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.cookie.clone()
    }
}
