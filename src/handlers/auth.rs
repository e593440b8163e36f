//! Authentication HTTP handlers
//!
//! Endpoints for wallet-based authentication and the example gated resource.

use axum::{extract::rejection::JsonRejection, extract::State, http::StatusCode, Json};
use axum_extra::extract::cookie::CookieJar;
use validator::Validate;

use super::AuthenticatedUser;
use crate::auth::AuthOutcome;
use crate::error::ApiResult;
use crate::models::{AuthenticateRequest, AuthenticateResponse, PrivateResponse};
use crate::session::redact_session_id;
use crate::state::AppState;

type AuthenticateReply = (StatusCode, CookieJar, Json<AuthenticateResponse>);

/// POST /authenticate - Verify a CIP-30 signature and open a session
pub async fn authenticate(
    State(state): State<AppState>,
    jar: CookieJar,
    payload: Result<Json<AuthenticateRequest>, JsonRejection>,
) -> ApiResult<AuthenticateReply> {
    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => {
            tracing::warn!(error = %rejection, "Rejected unreadable authentication body");
            return Ok(rejected(&state, jar));
        }
    };

    if let Err(e) = request.validate() {
        tracing::warn!(error = %e, "Rejected invalid authentication body");
        return Ok(rejected(&state, jar));
    }

    let outcome = state
        .auth_service
        .authenticate_hex(&request.signature, &request.key)
        .await?;

    match outcome {
        AuthOutcome::Authenticated(session) => {
            let jar = jar.add(state.cookie.session_cookie(&session.id));
            Ok((StatusCode::OK, jar, Json(AuthenticateResponse::success())))
        }
        AuthOutcome::Rejected(_) => Ok(rejected(&state, jar)),
    }
}

fn rejected(state: &AppState, jar: CookieJar) -> AuthenticateReply {
    (
        StatusCode::UNAUTHORIZED,
        state.cookie.clear(jar),
        Json(AuthenticateResponse::failure()),
    )
}

/// GET /private - Example resource gated on a valid session
pub async fn private(user: AuthenticatedUser) -> Json<PrivateResponse> {
    Json(PrivateResponse {
        message: format!("Welcome {} to the members area!", user.identity),
        identity: user.identity,
    })
}

/// POST /logout - Revoke the current session and clear the cookie
pub async fn logout(
    State(state): State<AppState>,
    jar: CookieJar,
) -> ApiResult<(StatusCode, CookieJar)> {
    if let Some(session_id) = state.cookie.session_id(&jar) {
        if state.sessions.revoke(session_id).await? {
            tracing::info!(session = redact_session_id(session_id), "Session revoked");
        }
    }

    Ok((StatusCode::NO_CONTENT, state.cookie.clear(jar)))
}
