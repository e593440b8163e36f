//! Authentication models

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::auth::Identity;

/// Output of the wallet's CIP-30 `signData`, hex encoded
#[derive(Debug, Deserialize, Validate)]
pub struct AuthenticateRequest {
    /// COSE_Sign1 bytes
    #[validate(length(min = 2, max = 16384))]
    pub signature: String,
    /// COSE_Key bytes
    #[validate(length(min = 2, max = 16384))]
    pub key: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AuthenticateResponse {
    pub success: bool,
    pub message: String,
}

impl AuthenticateResponse {
    pub fn success() -> Self {
        Self {
            success: true,
            message: "Authentication success!".to_string(),
        }
    }

    /// Identical for every rejection reason
    pub fn failure() -> Self {
        Self {
            success: false,
            message: "Authentication failed.".to_string(),
        }
    }
}

/// Body of the example protected resource
#[derive(Debug, Serialize)]
pub struct PrivateResponse {
    pub message: String,
    pub identity: Identity,
}
