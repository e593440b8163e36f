//! Stake address resolution
//!
//! Turns the protected `address` header into the canonical bech32 reward
//! address used as the caller's identity.

use std::fmt;
use std::str::FromStr;

use bech32::primitives::decode::CheckedHrpstring;
use bech32::{Bech32, Hrp};
use serde::Serialize;

use super::AuthError;

/// Length of a Shelley reward address: one header byte plus a 28-byte hash
pub const REWARD_ADDRESS_LENGTH: usize = 29;

/// Length of a Blake2b-224 credential hash
pub const CREDENTIAL_HASH_LENGTH: usize = 28;

const MAINNET_NETWORK_ID: u8 = 1;
const MAINNET_HRP: Hrp = Hrp::parse_unchecked("stake");
const TESTNET_HRP: Hrp = Hrp::parse_unchecked("stake_test");

// Header nibbles of the two reward address kinds
const REWARD_KEY_HASH: u8 = 0b1110;
const REWARD_SCRIPT_HASH: u8 = 0b1111;

/// How the `address` header value is framed before the raw address bytes.
///
/// `Cip30Cbor` reads the definite-length CBOR byte string header, so a
/// 29-byte reward address loses exactly two bytes (`0x58 0x1d`).
/// `FixedPrefix` drops a fixed count of leading bytes regardless of content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AddressFraming {
    #[default]
    Cip30Cbor,
    FixedPrefix(usize),
}

impl AddressFraming {
    /// Strip the framing and return the raw address bytes
    pub fn strip<'a>(&self, header: &'a [u8]) -> Result<&'a [u8], AuthError> {
        match self {
            AddressFraming::Cip30Cbor => strip_cbor_byte_string(header),
            AddressFraming::FixedPrefix(n) => header.get(*n..).ok_or_else(|| {
                AuthError::MalformedEnvelope(format!(
                    "address header shorter than {} byte prefix",
                    n
                ))
            }),
        }
    }
}

impl FromStr for AddressFraming {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_lowercase();
        match s.as_str() {
            "cip30" | "cbor" => Ok(AddressFraming::Cip30Cbor),
            _ => s
                .strip_prefix("fixed:")
                .and_then(|n| n.parse::<usize>().ok())
                .map(AddressFraming::FixedPrefix)
                .ok_or_else(|| {
                    format!(
                        "Invalid address framing: '{}'. Expected: cip30 or fixed:<bytes>",
                        s
                    )
                }),
        }
    }
}

fn strip_cbor_byte_string(header: &[u8]) -> Result<&[u8], AuthError> {
    let malformed = |msg: &str| AuthError::MalformedEnvelope(format!("address header {}", msg));

    let (&initial, rest) = header.split_first().ok_or_else(|| malformed("is empty"))?;

    // Major type 2 is a byte string
    if initial >> 5 != 2 {
        return Err(malformed("is not a byte string"));
    }

    let (declared, body) = match initial & 0x1f {
        n @ 0..=23 => (u64::from(n), rest),
        24 => read_length(rest, 1).ok_or_else(|| malformed("length is truncated"))?,
        25 => read_length(rest, 2).ok_or_else(|| malformed("length is truncated"))?,
        26 => read_length(rest, 4).ok_or_else(|| malformed("length is truncated"))?,
        27 => read_length(rest, 8).ok_or_else(|| malformed("length is truncated"))?,
        _ => return Err(malformed("has an indefinite or reserved length")),
    };

    if body.len() as u64 != declared {
        return Err(malformed(&format!(
            "declares {} bytes but carries {}",
            declared,
            body.len()
        )));
    }

    Ok(body)
}

fn read_length(bytes: &[u8], width: usize) -> Option<(u64, &[u8])> {
    if bytes.len() < width {
        return None;
    }
    let (head, tail) = bytes.split_at(width);
    let length = head.iter().fold(0u64, |acc, b| (acc << 8) | u64::from(*b));
    Some((length, tail))
}

/// The staking credential a reward address points at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StakeCredential {
    KeyHash([u8; CREDENTIAL_HASH_LENGTH]),
    ScriptHash([u8; CREDENTIAL_HASH_LENGTH]),
}

/// A Shelley reward (stake) address
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RewardAddress {
    network_id: u8,
    credential: StakeCredential,
}

impl RewardAddress {
    pub fn new(network_id: u8, credential: StakeCredential) -> Self {
        Self {
            network_id: network_id & 0x0f,
            credential,
        }
    }

    /// Parse raw address bytes, accepting only reward addresses
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, AuthError> {
        let header = *bytes.first().ok_or_else(|| {
            AuthError::UnsupportedAddressType("empty address".to_string())
        })?;

        let kind = header >> 4;
        if kind != REWARD_KEY_HASH && kind != REWARD_SCRIPT_HASH {
            return Err(AuthError::UnsupportedAddressType(format!(
                "{} address (header 0x{:02x})",
                address_kind_name(kind),
                header
            )));
        }

        if bytes.len() != REWARD_ADDRESS_LENGTH {
            return Err(AuthError::UnsupportedAddressType(format!(
                "reward address must be {} bytes, got {}",
                REWARD_ADDRESS_LENGTH,
                bytes.len()
            )));
        }

        let mut hash = [0u8; CREDENTIAL_HASH_LENGTH];
        hash.copy_from_slice(&bytes[1..]);

        let credential = if kind == REWARD_KEY_HASH {
            StakeCredential::KeyHash(hash)
        } else {
            StakeCredential::ScriptHash(hash)
        };

        Ok(Self::new(header & 0x0f, credential))
    }

    /// Parse a bech32 `stake`/`stake_test` address.
    ///
    /// All-lowercase and all-uppercase forms are accepted; mixed case is not
    /// valid bech32.
    pub fn from_bech32(s: &str) -> Result<Self, AuthError> {
        let s = s.trim();
        if s.chars().any(|c| c.is_ascii_lowercase()) && s.chars().any(|c| c.is_ascii_uppercase()) {
            return Err(AuthError::UnsupportedAddressType(
                "invalid bech32: mixed case".to_string(),
            ));
        }

        let lowered = s.to_lowercase();
        let checked = CheckedHrpstring::new::<Bech32>(&lowered)
            .map_err(|e| AuthError::UnsupportedAddressType(format!("invalid bech32: {}", e)))?;

        let bytes: Vec<u8> = checked.byte_iter().collect();
        let address = Self::from_bytes(&bytes)?;

        if checked.hrp() != address.hrp() {
            return Err(AuthError::UnsupportedAddressType(format!(
                "prefix '{}' does not match network {}",
                checked.hrp(),
                address.network_id
            )));
        }

        Ok(address)
    }

    pub fn network_id(&self) -> u8 {
        self.network_id
    }

    pub fn credential(&self) -> &StakeCredential {
        &self.credential
    }

    pub fn to_bytes(&self) -> [u8; REWARD_ADDRESS_LENGTH] {
        let (kind, hash) = match &self.credential {
            StakeCredential::KeyHash(hash) => (REWARD_KEY_HASH, hash),
            StakeCredential::ScriptHash(hash) => (REWARD_SCRIPT_HASH, hash),
        };

        let mut bytes = [0u8; REWARD_ADDRESS_LENGTH];
        bytes[0] = (kind << 4) | self.network_id;
        bytes[1..].copy_from_slice(hash);
        bytes
    }

    fn hrp(&self) -> Hrp {
        if self.network_id == MAINNET_NETWORK_ID {
            MAINNET_HRP
        } else {
            TESTNET_HRP
        }
    }

    /// Canonical lowercase bech32 encoding
    pub fn to_identity(&self) -> Result<Identity, AuthError> {
        bech32::encode::<Bech32>(self.hrp(), &self.to_bytes())
            .map(Identity)
            .map_err(|e| AuthError::UnsupportedAddressType(e.to_string()))
    }
}

fn address_kind_name(kind: u8) -> &'static str {
    match kind {
        0..=3 => "base",
        4 | 5 => "pointer",
        6 | 7 => "enterprise",
        8 => "byron",
        _ => "unknown",
    }
}

/// Strip the header framing and resolve the reward address it carries
pub fn resolve_reward_address(
    header: &[u8],
    framing: AddressFraming,
) -> Result<RewardAddress, AuthError> {
    RewardAddress::from_bytes(framing.strip(header)?)
}

/// Canonical bech32 stake address identifying an authenticated wallet
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Identity(String);

impl Identity {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Identity {
    type Err = AuthError;

    /// Parse and normalize a bech32 stake address
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RewardAddress::from_bech32(s)?.to_identity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TESTNET_IDENTITY: &str =
        "stake_test1uz8uh7u7wudf9rt300vcw77xmwdrm7njsvcqxx4zsa7p8dq9jyy9a";

    fn key_hash_address(network_id: u8, fill: u8) -> Vec<u8> {
        let mut bytes = vec![0xe0 | network_id];
        bytes.extend_from_slice(&[fill; CREDENTIAL_HASH_LENGTH]);
        bytes
    }

    #[test]
    fn test_cip30_framing_strips_two_bytes_for_reward_address() {
        let address = key_hash_address(0, 0xab);
        let mut header = vec![0x58, 0x1d];
        header.extend_from_slice(&address);

        let cip30 = AddressFraming::Cip30Cbor.strip(&header).unwrap();
        let fixed = AddressFraming::FixedPrefix(2).strip(&header).unwrap();
        assert_eq!(cip30, address.as_slice());
        assert_eq!(cip30, fixed);
    }

    #[test]
    fn test_cip30_framing_handles_other_length_encodings() {
        let address = key_hash_address(1, 0x11);

        let mut short = vec![0x58, 0x1d];
        short.extend_from_slice(&address);
        let mut wide = vec![0x59, 0x00, 0x1d];
        wide.extend_from_slice(&address);

        let a = resolve_reward_address(&short, AddressFraming::Cip30Cbor).unwrap();
        let b = resolve_reward_address(&wide, AddressFraming::Cip30Cbor).unwrap();
        assert_eq!(a.to_identity().unwrap(), b.to_identity().unwrap());

        assert_eq!(AddressFraming::Cip30Cbor.strip(&[0x43, 1, 2, 3]).unwrap(), &[1, 2, 3]);
    }

    #[test]
    fn test_cip30_framing_rejects_bad_headers() {
        let framing = AddressFraming::Cip30Cbor;
        // text string instead of bytes
        assert!(framing.strip(&[0x63, b'a', b'b', b'c']).is_err());
        // declared length longer than body
        assert!(framing.strip(&[0x58, 0x1d, 0xe0]).is_err());
        // indefinite length
        assert!(framing.strip(&[0x5f, 0x41, 0x00, 0xff]).is_err());
        assert!(framing.strip(&[]).is_err());
        assert!(AddressFraming::FixedPrefix(4).strip(&[1, 2]).is_err());
    }

    #[test]
    fn test_framing_from_str() {
        assert_eq!(
            "cip30".parse::<AddressFraming>().unwrap(),
            AddressFraming::Cip30Cbor
        );
        assert_eq!(
            "fixed:2".parse::<AddressFraming>().unwrap(),
            AddressFraming::FixedPrefix(2)
        );
        assert!("fixed:two".parse::<AddressFraming>().is_err());
        assert!("xdr".parse::<AddressFraming>().is_err());
    }

    #[test]
    fn test_known_identity_round_trips() {
        let address = RewardAddress::from_bech32(TESTNET_IDENTITY).unwrap();
        assert_eq!(address.network_id(), 0);
        assert!(matches!(address.credential(), StakeCredential::KeyHash(_)));
        assert_eq!(address.to_identity().unwrap().as_str(), TESTNET_IDENTITY);
    }

    #[test]
    fn test_identity_is_normalized_to_lowercase() {
        let upper = TESTNET_IDENTITY.to_uppercase();
        let identity: Identity = upper.parse().unwrap();
        assert_eq!(identity.as_str(), TESTNET_IDENTITY);
    }

    #[test]
    fn test_mixed_case_identity_rejected() {
        let mut mixed = TESTNET_IDENTITY.to_string();
        mixed.replace_range(..1, "S");
        assert!(matches!(
            mixed.parse::<Identity>(),
            Err(AuthError::UnsupportedAddressType(_))
        ));
    }

    #[test]
    fn test_network_prefix() {
        let mainnet = RewardAddress::from_bytes(&key_hash_address(1, 0x01)).unwrap();
        let testnet = RewardAddress::from_bytes(&key_hash_address(0, 0x01)).unwrap();
        assert!(mainnet.to_identity().unwrap().as_str().starts_with("stake1"));
        assert!(testnet.to_identity().unwrap().as_str().starts_with("stake_test1"));
    }

    #[test]
    fn test_script_credential() {
        let mut bytes = vec![0xf1];
        bytes.extend_from_slice(&[0x22; CREDENTIAL_HASH_LENGTH]);
        let address = RewardAddress::from_bytes(&bytes).unwrap();
        assert!(matches!(address.credential(), StakeCredential::ScriptHash(_)));
        assert_eq!(address.to_bytes().as_slice(), bytes.as_slice());
    }

    #[test]
    fn test_non_reward_addresses_rejected() {
        // base address: header + payment hash + stake hash
        let mut base = vec![0x00];
        base.extend_from_slice(&[0x33; 56]);
        assert!(matches!(
            RewardAddress::from_bytes(&base),
            Err(AuthError::UnsupportedAddressType(_))
        ));

        // enterprise address
        let mut enterprise = vec![0x61];
        enterprise.extend_from_slice(&[0x44; 28]);
        assert!(matches!(
            RewardAddress::from_bytes(&enterprise),
            Err(AuthError::UnsupportedAddressType(_))
        ));

        // reward header with the wrong length
        assert!(matches!(
            RewardAddress::from_bytes(&[0xe0, 1, 2, 3]),
            Err(AuthError::UnsupportedAddressType(_))
        ));
    }

    #[test]
    fn test_bech32_prefix_must_match_network() {
        let testnet = RewardAddress::from_bytes(&key_hash_address(0, 0x05)).unwrap();
        let forged = bech32::encode::<Bech32>(MAINNET_HRP, &testnet.to_bytes()).unwrap();
        assert!(RewardAddress::from_bech32(&forged).is_err());
    }

    #[test]
    fn test_bad_checksum_rejected() {
        let mut chars: Vec<char> = TESTNET_IDENTITY.chars().collect();
        let last = chars.len() - 1;
        chars[last] = if chars[last] == 'q' { 'p' } else { 'q' };
        let corrupted: String = chars.into_iter().collect();
        assert!(corrupted.parse::<Identity>().is_err());
    }
}
