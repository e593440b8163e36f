//! Middleware for the auth server
//!
//! Request tracing, security headers and the session extractor that guards
//! protected routes.

pub mod auth;
mod security;
mod tracing;

pub use auth::AuthenticatedUser;
pub use security::security_headers;
pub use self::tracing::request_tracing;
