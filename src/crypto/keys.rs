//! ECDSA key management for the wallet
//!
//! Provides key pair generation, signing, and verification using
//! the secp256k1 elliptic curve. Secret scalars are erased when the
//! owning [`KeyPair`] is dropped.

use rand::rngs::OsRng;
use secp256k1::{ecdsa, Message, PublicKey, Secp256k1, SecretKey};
use std::cmp::Ordering;
use std::fmt;
use thiserror::Error;
use zeroize::Zeroize;

use super::hash::sha256;

/// Length of a compressed SEC1 public key
pub const PUBLIC_KEY_LENGTH: usize = 33;

/// Length of a compact ECDSA signature
pub const SIGNATURE_LENGTH: usize = 64;

/// Errors that can occur during key operations
#[derive(Error, Debug)]
pub enum KeyError {
    #[error("Invalid private key")]
    InvalidPrivateKey,
    #[error("Invalid public key: {0}")]
    InvalidPublicKey(String),
    #[error("Invalid signature")]
    InvalidSignature,
    #[error("Secp256k1 error: {0}")]
    Secp256k1Error(#[from] secp256k1::Error),
}

/// A key pair consisting of a private key and its corresponding public key
pub struct KeyPair {
    secret_key: SecretKey,
    public_key: PublicKey,
}

impl KeyPair {
    /// Generate a new random key pair
    pub fn generate() -> Self {
        let secp = Secp256k1::new();
        let (secret_key, public_key) = secp.generate_keypair(&mut OsRng);
        Self {
            secret_key,
            public_key,
        }
    }

    /// Create a key pair from raw secret bytes
    pub fn from_secret_bytes(bytes: &[u8]) -> Result<Self, KeyError> {
        let secret_key = SecretKey::from_slice(bytes).map_err(|_| KeyError::InvalidPrivateKey)?;
        let secp = Secp256k1::new();
        let public_key = PublicKey::from_secret_key(&secp, &secret_key);
        Ok(Self {
            secret_key,
            public_key,
        })
    }

    /// Copy of the secret scalar. Callers must wipe it after use.
    pub fn secret_bytes(&self) -> [u8; 32] {
        self.secret_key.secret_bytes()
    }

    pub fn public_key(&self) -> &PublicKey {
        &self.public_key
    }

    /// Get the public key as a hex string (compressed format)
    pub fn public_key_hex(&self) -> String {
        hex::encode(self.public_key.serialize())
    }

    /// Sign a message with the private key. The message is hashed with
    /// SHA-256 unless it already is a 32-byte digest.
    pub fn sign(&self, message: &[u8]) -> Result<[u8; SIGNATURE_LENGTH], KeyError> {
        let secp = Secp256k1::signing_only();
        let message = digest_message(message)?;
        Ok(secp.sign_ecdsa(&message, &self.secret_key).serialize_compact())
    }

    /// Verify a signature against this key pair's public key
    pub fn verify(&self, message: &[u8], signature: &[u8]) -> Result<bool, KeyError> {
        verify_signature(&self.public_key, message, signature)
    }
}

impl Drop for KeyPair {
    fn drop(&mut self) {
        self.secret_key.non_secure_erase();
    }
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("public_key", &self.public_key_hex())
            .finish_non_exhaustive()
    }
}

fn digest_message(message: &[u8]) -> Result<Message, KeyError> {
    let hash = if message.len() == 32 {
        let mut digest = [0u8; 32];
        digest.copy_from_slice(message);
        digest
    } else {
        sha256(message)
    };
    Ok(Message::from_digest_slice(&hash)?)
}

/// Parse a compressed or uncompressed SEC1 public key
pub fn public_key_from_bytes(bytes: &[u8]) -> Result<PublicKey, KeyError> {
    PublicKey::from_slice(bytes).map_err(|e| KeyError::InvalidPublicKey(e.to_string()))
}

/// Parse a public key from hex string
pub fn public_key_from_hex(hex_key: &str) -> Result<PublicKey, KeyError> {
    let bytes = hex::decode(hex_key.trim())
        .map_err(|_| KeyError::InvalidPublicKey(format!("not hex: {}", hex_key.trim())))?;
    public_key_from_bytes(&bytes)
}

/// Verify a compact signature against a public key
pub fn verify_signature(
    public_key: &PublicKey,
    message: &[u8],
    signature: &[u8],
) -> Result<bool, KeyError> {
    let secp = Secp256k1::verification_only();
    let message = digest_message(message)?;
    let sig = ecdsa::Signature::from_compact(signature).map_err(|_| KeyError::InvalidSignature)?;
    Ok(secp.verify_ecdsa(&message, &sig, public_key).is_ok())
}

/// Canonical public key ordering used in multi-signature redeem scripts:
/// by X coordinate, then by Y coordinate.
pub fn compare_public_keys(a: &PublicKey, b: &PublicKey) -> Ordering {
    let a = a.serialize_uncompressed();
    let b = b.serialize_uncompressed();
    a[1..33].cmp(&b[1..33]).then_with(|| a[33..].cmp(&b[33..]))
}

/// Sort public keys into canonical order
pub fn sort_public_keys(keys: &mut [PublicKey]) {
    keys.sort_by(compare_public_keys);
}

/// Wipe a secret buffer in place
pub fn wipe(bytes: &mut [u8]) {
    bytes.zeroize();
}
