//! Session middleware
//!
//! Resolves the session cookie to an identity for protected handlers.

use std::sync::Arc;

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use axum_extra::extract::cookie::CookieJar;

use crate::auth::Identity;
use crate::error::ApiError;
use crate::session::{redact_session_id, CookieSettings, SessionError, SessionManager};

/// Same message for a missing, unknown or expired session
const NOT_AUTHENTICATED: &str = "You are not authenticated";

/// Identity behind a valid session cookie
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(user: AuthenticatedUser) -> impl IntoResponse {
///     format!("Hello, {}", user.identity)
/// }
/// ```
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub identity: Identity,
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthenticatedUser
where
    Arc<SessionManager>: FromRef<S>,
    CookieSettings: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let cookie = CookieSettings::from_ref(state);
        let jar = CookieJar::from_headers(&parts.headers);

        let Some(session_id) = cookie.session_id(&jar) else {
            return Err(ApiError::Unauthorized(NOT_AUTHENTICATED.to_string()));
        };

        let sessions = Arc::<SessionManager>::from_ref(state);

        match sessions.resolve(session_id).await {
            Ok(session) => Ok(AuthenticatedUser {
                identity: session.identity,
            }),
            Err(SessionError::Store(e)) => Err(e.into()),
            Err(e) => {
                tracing::debug!(
                    session = redact_session_id(session_id),
                    reason = %e,
                    "Session rejected"
                );
                Err(ApiError::Unauthorized(NOT_AUTHENTICATED.to_string()))
            }
        }
    }
}
