//! Test helpers that play the wallet side of CIP-30 `signData`

use ciborium::value::Value;
use ed25519_dalek::{Signer, SigningKey, VerifyingKey};

use super::crypto::key_hash;

pub(crate) fn signing_key(seed: u8) -> SigningKey {
    SigningKey::from_bytes(&[seed; 32])
}

/// 29-byte key-hash reward address for a signing key
pub(crate) fn reward_address(key: &SigningKey, network_id: u8) -> Vec<u8> {
    let mut address = vec![0xe0 | network_id];
    address.extend_from_slice(&key_hash(&key.verifying_key().to_bytes()));
    address
}

pub(crate) fn protected_header(address: &[u8]) -> Vec<u8> {
    cbor(&Value::Map(vec![
        (Value::Integer(1.into()), Value::Integer((-8).into())),
        (Value::Text("address".into()), Value::Bytes(address.to_vec())),
    ]))
}

/// COSE_Sign1 over `payload`, signed the way a wallet does
pub(crate) fn sign_envelope(key: &SigningKey, address: &[u8], payload: &[u8]) -> Vec<u8> {
    let protected = protected_header(address);
    let sig_structure = cbor(&Value::Array(vec![
        Value::Text("Signature1".into()),
        Value::Bytes(protected.clone()),
        Value::Bytes(Vec::new()),
        Value::Bytes(payload.to_vec()),
    ]));
    let signature = key.sign(&sig_structure);

    cbor(&Value::Array(vec![
        Value::Bytes(protected),
        Value::Map(vec![(Value::Text("hashed".into()), Value::Bool(false))]),
        Value::Bytes(payload.to_vec()),
        Value::Bytes(signature.to_bytes().to_vec()),
    ]))
}

pub(crate) fn cose_key(key: &VerifyingKey) -> Vec<u8> {
    cbor(&Value::Map(vec![
        (Value::Integer(1.into()), Value::Integer(1.into())),
        (Value::Integer(3.into()), Value::Integer((-8).into())),
        (Value::Integer((-1).into()), Value::Integer(6.into())),
        (Value::Integer((-2).into()), Value::Bytes(key.to_bytes().to_vec())),
    ]))
}

fn cbor(value: &Value) -> Vec<u8> {
    let mut out = Vec::new();
    ciborium::ser::into_writer(value, &mut out).unwrap();
    out
}
