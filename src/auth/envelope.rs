//! COSE envelope decoding
//!
//! Decodes the two CBOR structures a CIP-30 wallet returns from `signData`:
//! the COSE_Sign1 signed message and the COSE_Key holding the signer's key.

use std::collections::BTreeMap;
use std::fmt;
use std::io::Cursor;

use ciborium::value::Value;

use super::AuthError;

/// CBOR tag for a tagged COSE_Sign1 message
const COSE_SIGN1_TAG: u64 = 18;

/// Context string of the Sig_structure for single-signer messages
const SIGNATURE1_CONTEXT: &str = "Signature1";

/// Protected header label carrying the signer's address
pub const ADDRESS_HEADER: &str = "address";

// COSE_Key labels and values (RFC 8152 sections 7 and 13)
const KEY_LABEL_KTY: i64 = 1;
const KEY_LABEL_CRV: i64 = -1;
const KEY_LABEL_X: i64 = -2;
const KTY_OKP: i64 = 1;
const CRV_ED25519: i64 = 6;

/// Ed25519 public key length in bytes
pub const ED25519_PUBLIC_KEY_LENGTH: usize = 32;

/// COSE header label, either an integer or a text string
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum HeaderLabel {
    Int(i64),
    Text(String),
}

impl HeaderLabel {
    pub fn text(label: &str) -> Self {
        HeaderLabel::Text(label.to_string())
    }

    fn from_value(value: Value) -> Result<Self, String> {
        match value {
            Value::Integer(int) => i64::try_from(int)
                .map(HeaderLabel::Int)
                .map_err(|_| "header label out of range".to_string()),
            Value::Text(text) => Ok(HeaderLabel::Text(text)),
            other => Err(format!("unsupported header label {:?}", other)),
        }
    }
}

impl fmt::Display for HeaderLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HeaderLabel::Int(n) => write!(f, "{}", n),
            HeaderLabel::Text(s) => write!(f, "\"{}\"", s),
        }
    }
}

/// A decoded COSE_Sign1 message.
///
/// Protected header values are kept as their CBOR encodings, exactly as the
/// signer serialized them. The Sig_structure is computed once at decode time
/// from the protected bytes as received.
#[derive(Debug, Clone)]
pub struct SignedEnvelope {
    protected_headers: BTreeMap<HeaderLabel, Vec<u8>>,
    payload: Vec<u8>,
    signature: Vec<u8>,
    signed_data: Vec<u8>,
}

impl SignedEnvelope {
    /// Decode a COSE_Sign1 message, tagged or untagged
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, AuthError> {
        let value = decode_exact(bytes).map_err(AuthError::MalformedEnvelope)?;

        let value = match value {
            Value::Tag(COSE_SIGN1_TAG, inner) => *inner,
            Value::Tag(tag, _) => {
                return Err(AuthError::MalformedEnvelope(format!(
                    "unexpected CBOR tag {}",
                    tag
                )))
            }
            other => other,
        };

        let Value::Array(items) = value else {
            return Err(AuthError::MalformedEnvelope(
                "COSE_Sign1 must be a CBOR array".to_string(),
            ));
        };

        let [protected, unprotected, payload, signature]: [Value; 4] =
            items.try_into().map_err(|items: Vec<Value>| {
                AuthError::MalformedEnvelope(format!(
                    "COSE_Sign1 must have 4 elements, got {}",
                    items.len()
                ))
            })?;

        let Value::Bytes(protected_raw) = protected else {
            return Err(AuthError::MalformedEnvelope(
                "protected header must be a byte string".to_string(),
            ));
        };
        let protected_headers =
            decode_header_map(&protected_raw).map_err(AuthError::MalformedEnvelope)?;

        if !matches!(unprotected, Value::Map(_)) {
            return Err(AuthError::MalformedEnvelope(
                "unprotected header must be a map".to_string(),
            ));
        }

        let payload = match payload {
            Value::Bytes(payload) => payload,
            Value::Null => {
                return Err(AuthError::MalformedEnvelope(
                    "detached payloads are not supported".to_string(),
                ))
            }
            _ => {
                return Err(AuthError::MalformedEnvelope(
                    "payload must be a byte string".to_string(),
                ))
            }
        };

        let Value::Bytes(signature) = signature else {
            return Err(AuthError::MalformedEnvelope(
                "signature must be a byte string".to_string(),
            ));
        };

        if !protected_headers.contains_key(&HeaderLabel::text(ADDRESS_HEADER)) {
            return Err(AuthError::MalformedEnvelope(
                "protected header has no address entry".to_string(),
            ));
        }

        let signed_data = sig_structure(&protected_raw, &payload)
            .map_err(AuthError::MalformedEnvelope)?;

        Ok(Self {
            protected_headers,
            payload,
            signature,
            signed_data,
        })
    }

    /// CBOR-encoded value of a protected header
    pub fn header(&self, label: &HeaderLabel) -> Option<&[u8]> {
        self.protected_headers.get(label).map(Vec::as_slice)
    }

    /// CBOR-encoded `address` header, still carrying its byte string framing
    pub fn address_header(&self) -> Result<&[u8], AuthError> {
        self.header(&HeaderLabel::text(ADDRESS_HEADER))
            .ok_or_else(|| {
                AuthError::MalformedEnvelope("protected header has no address entry".to_string())
            })
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    pub fn signature(&self) -> &[u8] {
        &self.signature
    }

    /// The bytes the wallet actually signed
    pub fn signed_data(&self) -> &[u8] {
        &self.signed_data
    }
}

/// Extract the raw Ed25519 public key from a COSE_Key
pub fn decode_public_key(bytes: &[u8]) -> Result<[u8; ED25519_PUBLIC_KEY_LENGTH], AuthError> {
    let value = decode_exact(bytes).map_err(AuthError::MalformedKey)?;

    let Value::Map(entries) = value else {
        return Err(AuthError::MalformedKey("COSE_Key must be a CBOR map".to_string()));
    };

    let mut key_type = None;
    let mut curve = None;
    let mut x = None;

    for (label, value) in entries {
        let Some(label) = label.as_integer().and_then(|i| i64::try_from(i).ok()) else {
            continue;
        };
        match label {
            KEY_LABEL_KTY => key_type = Some(value),
            KEY_LABEL_CRV => curve = Some(value),
            KEY_LABEL_X => x = Some(value),
            _ => {}
        }
    }

    if let Some(kty) = key_type {
        if int_value(&kty) != Some(KTY_OKP) {
            return Err(AuthError::MalformedKey(format!(
                "unsupported key type {:?}",
                kty
            )));
        }
    }

    if let Some(crv) = curve {
        if int_value(&crv) != Some(CRV_ED25519) {
            return Err(AuthError::MalformedKey(format!(
                "unsupported curve {:?}",
                crv
            )));
        }
    }

    let Some(Value::Bytes(x)) = x else {
        return Err(AuthError::MalformedKey(
            "missing public key parameter -2".to_string(),
        ));
    };

    x.as_slice().try_into().map_err(|_| {
        AuthError::MalformedKey(format!(
            "expected {} byte Ed25519 key, got {}",
            ED25519_PUBLIC_KEY_LENGTH,
            x.len()
        ))
    })
}

fn int_value(value: &Value) -> Option<i64> {
    value.as_integer().and_then(|i| i64::try_from(i).ok())
}

fn decode_header_map(raw: &[u8]) -> Result<BTreeMap<HeaderLabel, Vec<u8>>, String> {
    // A zero-length protected header is an empty map
    if raw.is_empty() {
        return Ok(BTreeMap::new());
    }

    let Value::Map(entries) = decode_exact(raw)? else {
        return Err("protected header must encode a map".to_string());
    };

    let mut headers = BTreeMap::new();
    for (label, value) in entries {
        let label = HeaderLabel::from_value(label)?;
        let encoded = encode(&value)?;
        if headers.insert(label.clone(), encoded).is_some() {
            return Err(format!("duplicate header label {}", label));
        }
    }

    Ok(headers)
}

fn sig_structure(protected: &[u8], payload: &[u8]) -> Result<Vec<u8>, String> {
    encode(&Value::Array(vec![
        Value::Text(SIGNATURE1_CONTEXT.to_string()),
        Value::Bytes(protected.to_vec()),
        Value::Bytes(Vec::new()),
        Value::Bytes(payload.to_vec()),
    ]))
}

/// Decode one CBOR item and reject trailing bytes
fn decode_exact(bytes: &[u8]) -> Result<Value, String> {
    let mut cursor = Cursor::new(bytes);
    let value: Value =
        ciborium::de::from_reader(&mut cursor).map_err(|e| format!("invalid CBOR: {:?}", e))?;

    let consumed = cursor.position() as usize;
    if consumed != bytes.len() {
        return Err(format!("{} trailing bytes", bytes.len() - consumed));
    }

    Ok(value)
}

fn encode(value: &Value) -> Result<Vec<u8>, String> {
    let mut out = Vec::new();
    ciborium::ser::into_writer(value, &mut out).map_err(|e| format!("CBOR encoding: {:?}", e))?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::fixtures;

    fn cbor(value: &Value) -> Vec<u8> {
        encode(value).unwrap()
    }

    #[test]
    fn test_decode_signed_envelope() {
        let key = fixtures::signing_key(1);
        let address = fixtures::reward_address(&key, 0);
        let bytes = fixtures::sign_envelope(&key, &address, b"account: test");

        let envelope = SignedEnvelope::from_bytes(&bytes).unwrap();
        assert_eq!(envelope.payload(), b"account: test");
        assert_eq!(envelope.signature().len(), 64);

        let header = envelope.address_header().unwrap();
        assert_eq!(&header[..2], &[0x58, 0x1d]);
        assert_eq!(&header[2..], address.as_slice());
        assert!(envelope.header(&HeaderLabel::Int(1)).is_some());
    }

    #[test]
    fn test_signed_data_is_sig_structure() {
        let key = fixtures::signing_key(1);
        let address = fixtures::reward_address(&key, 0);
        let bytes = fixtures::sign_envelope(&key, &address, b"hello");
        let envelope = SignedEnvelope::from_bytes(&bytes).unwrap();

        let data = envelope.signed_data();
        // array(4), text(10) "Signature1"
        assert_eq!(data[0], 0x84);
        assert_eq!(data[1], 0x6a);
        assert_eq!(&data[2..12], b"Signature1");
        // external_aad h'' followed by the 5 byte payload
        assert!(data.ends_with(&[0x40, 0x45, b'h', b'e', b'l', b'l', b'o']));
    }

    #[test]
    fn test_tagged_envelope_is_accepted() {
        let key = fixtures::signing_key(2);
        let address = fixtures::reward_address(&key, 1);
        let untagged = fixtures::sign_envelope(&key, &address, b"payload");
        let inner: Value = ciborium::de::from_reader(untagged.as_slice()).unwrap();
        let tagged = cbor(&Value::Tag(COSE_SIGN1_TAG, Box::new(inner)));

        let envelope = SignedEnvelope::from_bytes(&tagged).unwrap();
        assert_eq!(envelope.payload(), b"payload");
    }

    #[test]
    fn test_missing_address_header() {
        let protected = cbor(&Value::Map(vec![(
            Value::Integer(1.into()),
            Value::Integer((-8).into()),
        )]));
        let bytes = cbor(&Value::Array(vec![
            Value::Bytes(protected),
            Value::Map(vec![]),
            Value::Bytes(b"payload".to_vec()),
            Value::Bytes(vec![0; 64]),
        ]));

        let result = SignedEnvelope::from_bytes(&bytes);
        assert!(matches!(result, Err(AuthError::MalformedEnvelope(_))));
    }

    #[test]
    fn test_detached_payload_rejected() {
        let protected = cbor(&Value::Map(vec![(
            Value::Text("address".into()),
            Value::Bytes(vec![0xe0; 29]),
        )]));
        let bytes = cbor(&Value::Array(vec![
            Value::Bytes(protected),
            Value::Map(vec![]),
            Value::Null,
            Value::Bytes(vec![0; 64]),
        ]));

        let result = SignedEnvelope::from_bytes(&bytes);
        assert!(matches!(result, Err(AuthError::MalformedEnvelope(_))));
    }

    #[test]
    fn test_truncated_and_trailing_input() {
        let key = fixtures::signing_key(3);
        let address = fixtures::reward_address(&key, 0);
        let bytes = fixtures::sign_envelope(&key, &address, b"payload");

        for len in [0, 1, bytes.len() / 2, bytes.len() - 1] {
            let result = SignedEnvelope::from_bytes(&bytes[..len]);
            assert!(
                matches!(result, Err(AuthError::MalformedEnvelope(_))),
                "truncated to {} bytes",
                len
            );
        }

        let mut trailing = bytes.clone();
        trailing.push(0x00);
        assert!(matches!(
            SignedEnvelope::from_bytes(&trailing),
            Err(AuthError::MalformedEnvelope(_))
        ));
    }

    #[test]
    fn test_wrong_arity_rejected() {
        let bytes = cbor(&Value::Array(vec![Value::Bytes(vec![]), Value::Map(vec![])]));
        assert!(matches!(
            SignedEnvelope::from_bytes(&bytes),
            Err(AuthError::MalformedEnvelope(_))
        ));
    }

    #[test]
    fn test_decode_public_key() {
        let key = fixtures::signing_key(4);
        let bytes = fixtures::cose_key(&key.verifying_key());
        let raw = decode_public_key(&bytes).unwrap();
        assert_eq!(raw, key.verifying_key().to_bytes());
    }

    #[test]
    fn test_public_key_wrong_length() {
        let bytes = cbor(&Value::Map(vec![
            (Value::Integer(1.into()), Value::Integer(1.into())),
            (Value::Integer((-2).into()), Value::Bytes(vec![7; 31])),
        ]));
        assert!(matches!(
            decode_public_key(&bytes),
            Err(AuthError::MalformedKey(_))
        ));
    }

    #[test]
    fn test_public_key_missing_x() {
        let bytes = cbor(&Value::Map(vec![(
            Value::Integer(1.into()),
            Value::Integer(1.into()),
        )]));
        assert!(matches!(
            decode_public_key(&bytes),
            Err(AuthError::MalformedKey(_))
        ));
    }

    #[test]
    fn test_public_key_wrong_curve() {
        let bytes = cbor(&Value::Map(vec![
            (Value::Integer((-1).into()), Value::Integer(4.into())),
            (Value::Integer((-2).into()), Value::Bytes(vec![7; 32])),
        ]));
        assert!(matches!(
            decode_public_key(&bytes),
            Err(AuthError::MalformedKey(_))
        ));
    }

    #[test]
    fn test_public_key_garbage() {
        assert!(matches!(
            decode_public_key(&[0xff, 0x00, 0x13]),
            Err(AuthError::MalformedKey(_))
        ));
    }
}
