//! Cryptographic utilities for the wallet
//!
//! This module provides:
//! - SHA-256 / RIPEMD160 hashing
//! - ECDSA key management (secp256k1)

pub mod hash;
pub mod keys;

pub use hash::{checksum, double_sha256, hash160, sha256, sha256_hex};
pub use keys::{
    compare_public_keys, public_key_from_bytes, public_key_from_hex, sort_public_keys,
    verify_signature, wipe, KeyError, KeyPair, PUBLIC_KEY_LENGTH, SIGNATURE_LENGTH,
};
