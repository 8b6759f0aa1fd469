//! Spend conditions: redeem scripts, program hashes and addresses
//!
//! A program hash is one prefix byte naming the kind of spend condition
//! followed by RIPEMD160(SHA256(redeem script)). Addresses are the
//! Base58Check text form of the 21 program hash bytes.

use crate::crypto::{checksum, hash160, public_key_from_bytes, KeyError, PUBLIC_KEY_LENGTH};
use secp256k1::PublicKey;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

// =============================================================================
// Constants
// =============================================================================

/// Length of a program hash in bytes
pub const PROGRAM_HASH_LENGTH: usize = 21;

/// Prefix byte of single-signature program hashes
pub const PREFIX_STANDARD: u8 = 0x21;

/// Prefix byte of multi-signature program hashes
pub const PREFIX_MULTISIG: u8 = 0x12;

/// Push of a 33-byte compressed public key
pub const OP_PUSH_PUBKEY: u8 = 0x21;

pub const OP_CHECKSIG: u8 = 0xAC;

pub const OP_CHECKMULTISIG: u8 = 0xAE;

/// `OP_1` is `0x51`; `OP_n` is `0x50 + n`
pub const OP_1_BASE: u8 = 0x50;

/// Largest key count encodable with a single small-integer opcode
pub const MAX_SCRIPT_KEYS: usize = 16;

// =============================================================================
// Errors
// =============================================================================

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AddressError {
    #[error("Invalid address {address}: {reason}")]
    InvalidAddress { address: String, reason: String },
    #[error("Invalid program code: {0}")]
    InvalidCode(String),
}

impl From<KeyError> for AddressError {
    fn from(e: KeyError) -> Self {
        AddressError::InvalidCode(e.to_string())
    }
}

// =============================================================================
// Program Hash
// =============================================================================

/// Canonical identity of a spend condition
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProgramHash([u8; PROGRAM_HASH_LENGTH]);

impl ProgramHash {
    /// Hash a redeem script under the given prefix
    pub fn from_code(prefix: u8, code: &[u8]) -> Self {
        let mut bytes = [0u8; PROGRAM_HASH_LENGTH];
        bytes[0] = prefix;
        bytes[1..].copy_from_slice(&hash160(code));
        Self(bytes)
    }

    pub fn from_bytes(bytes: [u8; PROGRAM_HASH_LENGTH]) -> Self {
        Self(bytes)
    }

    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        let array: [u8; PROGRAM_HASH_LENGTH] = bytes.try_into().ok()?;
        Some(Self(array))
    }

    pub fn as_bytes(&self) -> &[u8; PROGRAM_HASH_LENGTH] {
        &self.0
    }

    pub fn prefix(&self) -> u8 {
        self.0[0]
    }

    pub fn is_multisig(&self) -> bool {
        self.prefix() == PREFIX_MULTISIG
    }

    /// Base58Check text encoding
    pub fn to_address(&self) -> String {
        let mut payload = self.0.to_vec();
        payload.extend_from_slice(&checksum(&self.0));
        bs58::encode(payload).into_string()
    }

    /// Decode and verify an address string
    pub fn from_address(address: &str) -> Result<Self, AddressError> {
        let invalid = |reason: &str| AddressError::InvalidAddress {
            address: address.to_string(),
            reason: reason.to_string(),
        };

        let decoded = bs58::decode(address.trim())
            .into_vec()
            .map_err(|_| invalid("not base58"))?;
        if decoded.len() != PROGRAM_HASH_LENGTH + 4 {
            return Err(invalid("wrong length"));
        }

        let (body, sum) = decoded.split_at(PROGRAM_HASH_LENGTH);
        if checksum(body) != sum {
            return Err(invalid("checksum mismatch"));
        }

        let hash = Self::from_slice(body).ok_or_else(|| invalid("wrong length"))?;
        match hash.prefix() {
            PREFIX_STANDARD | PREFIX_MULTISIG => Ok(hash),
            _ => Err(invalid("unknown prefix")),
        }
    }

    /// Hex of the bytes in reverse order, the form block explorers print
    pub fn to_reversed_hex(&self) -> String {
        let mut bytes = self.0;
        bytes.reverse();
        hex::encode(bytes)
    }
}

impl fmt::Display for ProgramHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_address())
    }
}

impl fmt::Debug for ProgramHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ProgramHash({})", self.to_address())
    }
}

impl FromStr for ProgramHash {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_address(s)
    }
}

impl Serialize for ProgramHash {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_address())
    }
}

impl<'de> Deserialize<'de> for ProgramHash {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_address(&s).map_err(serde::de::Error::custom)
    }
}

// =============================================================================
// Redeem Scripts
// =============================================================================

/// Redeem script for a single key: `PUSH33 <key> CHECKSIG`
pub fn standard_code(public_key: &PublicKey) -> Vec<u8> {
    let mut code = Vec::with_capacity(PUBLIC_KEY_LENGTH + 2);
    code.push(OP_PUSH_PUBKEY);
    code.extend_from_slice(&public_key.serialize());
    code.push(OP_CHECKSIG);
    code
}

/// Redeem script for k-of-n: `OP_k (PUSH33 <key>)* OP_n CHECKMULTISIG`.
/// Keys are written in the order given; callers sort them first.
pub fn multisig_code(required: usize, public_keys: &[PublicKey]) -> Result<Vec<u8>, AddressError> {
    let total = public_keys.len();
    if total == 0 || total > MAX_SCRIPT_KEYS || required == 0 || required > total {
        return Err(AddressError::InvalidCode(format!(
            "cannot encode {}-of-{} script",
            required, total
        )));
    }

    let mut code = Vec::with_capacity(3 + total * (PUBLIC_KEY_LENGTH + 1));
    code.push(OP_1_BASE + required as u8);
    for key in public_keys {
        code.push(OP_PUSH_PUBKEY);
        code.extend_from_slice(&key.serialize());
    }
    code.push(OP_1_BASE + total as u8);
    code.push(OP_CHECKMULTISIG);
    Ok(code)
}

/// The spend condition a redeem script encodes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpendCondition {
    Standard(PublicKey),
    MultiSig {
        required: usize,
        public_keys: Vec<PublicKey>,
    },
}

impl SpendCondition {
    /// Parse a redeem script back into its keys and threshold
    pub fn parse(code: &[u8]) -> Result<Self, AddressError> {
        let bad = |reason: &str| AddressError::InvalidCode(reason.to_string());

        match code.last() {
            Some(&OP_CHECKSIG) => {
                if code.len() != PUBLIC_KEY_LENGTH + 2 || code[0] != OP_PUSH_PUBKEY {
                    return Err(bad("malformed standard script"));
                }
                let key = public_key_from_bytes(&code[1..=PUBLIC_KEY_LENGTH])?;
                Ok(SpendCondition::Standard(key))
            }
            Some(&OP_CHECKMULTISIG) => {
                if code.len() < 3 {
                    return Err(bad("multisig script too short"));
                }
                let required = small_int(code[0]).ok_or_else(|| bad("bad threshold opcode"))?;
                let total =
                    small_int(code[code.len() - 2]).ok_or_else(|| bad("bad key count opcode"))?;
                let body = &code[1..code.len() - 2];
                if body.len() != total * (PUBLIC_KEY_LENGTH + 1) || required > total {
                    return Err(bad("multisig key count mismatch"));
                }

                let public_keys = body
                    .chunks(PUBLIC_KEY_LENGTH + 1)
                    .map(|chunk| {
                        if chunk[0] != OP_PUSH_PUBKEY {
                            return Err(bad("expected key push"));
                        }
                        Ok(public_key_from_bytes(&chunk[1..])?)
                    })
                    .collect::<Result<Vec<_>, AddressError>>()?;

                Ok(SpendCondition::MultiSig {
                    required,
                    public_keys,
                })
            }
            _ => Err(bad("unknown script type")),
        }
    }

    /// Signatures needed to satisfy this condition
    pub fn required(&self) -> usize {
        match self {
            SpendCondition::Standard(_) => 1,
            SpendCondition::MultiSig { required, .. } => *required,
        }
    }

    /// Keys allowed to sign, in script order
    pub fn public_keys(&self) -> Vec<PublicKey> {
        match self {
            SpendCondition::Standard(key) => vec![*key],
            SpendCondition::MultiSig { public_keys, .. } => public_keys.clone(),
        }
    }

    pub fn prefix(&self) -> u8 {
        match self {
            SpendCondition::Standard(_) => PREFIX_STANDARD,
            SpendCondition::MultiSig { .. } => PREFIX_MULTISIG,
        }
    }
}

/// Program hash of a redeem script, with the prefix implied by its kind
pub fn program_hash_of_code(code: &[u8]) -> Result<ProgramHash, AddressError> {
    let condition = SpendCondition::parse(code)?;
    Ok(ProgramHash::from_code(condition.prefix(), code))
}

fn small_int(opcode: u8) -> Option<usize> {
    if (OP_1_BASE + 1..=OP_1_BASE + MAX_SCRIPT_KEYS as u8).contains(&opcode) {
        Some((opcode - OP_1_BASE) as usize)
    } else {
        None
    }
}
