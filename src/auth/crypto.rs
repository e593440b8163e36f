//! Ed25519 signature verification
//!
//! Verifies CIP-30 signatures over the COSE Sig_structure and binds the
//! signing key to the stake credential it claims.

use blake2::digest::consts::U28;
use blake2::{Blake2b, Digest};
use ed25519_dalek::{Signature, Verifier, VerifyingKey};
use thiserror::Error;

use super::address::CREDENTIAL_HASH_LENGTH;

type Blake2b224 = Blake2b<U28>;

/// Errors that can occur during signature verification
#[derive(Error, Debug)]
pub enum CryptoError {
    #[error("Invalid signature format: {0}")]
    InvalidSignatureFormat(String),

    #[error("Signature verification failed")]
    VerificationFailed,

    #[error("Invalid public key: {0}")]
    InvalidPublicKey(String),
}

/// Verify an Ed25519 signature
///
/// # Arguments
/// * `public_key` - Raw 32-byte Ed25519 key from the COSE_Key
/// * `signed_data` - The Sig_structure bytes, not the bare payload
/// * `signature` - Detached 64-byte signature from the COSE_Sign1
pub fn verify_ed25519_signature(
    public_key: &[u8; 32],
    signed_data: &[u8],
    signature: &[u8],
) -> Result<(), CryptoError> {
    let signature = Signature::from_slice(signature)
        .map_err(|e| CryptoError::InvalidSignatureFormat(e.to_string()))?;

    let verifying_key = VerifyingKey::from_bytes(public_key)
        .map_err(|e| CryptoError::InvalidPublicKey(e.to_string()))?;

    verifying_key
        .verify(signed_data, &signature)
        .map_err(|_| CryptoError::VerificationFailed)
}

/// Blake2b-224 hash of a public key, as used for Cardano key credentials
pub fn key_hash(public_key: &[u8; 32]) -> [u8; CREDENTIAL_HASH_LENGTH] {
    let digest = Blake2b224::digest(public_key);
    let mut hash = [0u8; CREDENTIAL_HASH_LENGTH];
    hash.copy_from_slice(&digest);
    hash
}
