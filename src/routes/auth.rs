//! Authentication routes

use axum::{
    routing::{get, post},
    Router,
};

use crate::handlers::auth;
use crate::state::AppState;

/// Create authentication routes
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/authenticate", post(auth::authenticate))
        .route("/logout", post(auth::logout))
        .route("/private", get(auth::private))
}
