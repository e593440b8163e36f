//! Wallet Auth Server Library
//!
//! Wallet-signature authentication for Cardano stake addresses: verifies
//! CIP-30 `signData` envelopes and turns them into server-side sessions that
//! gate protected routes.

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod session;
pub mod state;
