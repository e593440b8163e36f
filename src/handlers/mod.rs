//! API handlers

pub mod auth;
pub mod health;

pub use auth::{authenticate, logout, private};
pub use health::{health_check, root};

pub use crate::middleware::auth::AuthenticatedUser;
