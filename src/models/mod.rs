//! Request and response models

mod auth;

use serde::Serialize;

pub use auth::{AuthenticateRequest, AuthenticateResponse, PrivateResponse};

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub active_sessions: usize,
}
