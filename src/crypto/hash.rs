//! Hashing utilities for the wallet
//!
//! SHA-256, double SHA-256 and RIPEMD160(SHA256) as used for transaction
//! ids, address checksums and program hashes.

use ripemd::Ripemd160;
use sha2::{Digest, Sha256};

/// Computes SHA-256 hash of the input data
pub fn sha256(data: &[u8]) -> [u8; 32] {
    Sha256::digest(data).into()
}

/// Computes double SHA-256 hash (SHA-256 of SHA-256)
/// Used for transaction ids and address checksums
pub fn double_sha256(data: &[u8]) -> [u8; 32] {
    sha256(&sha256(data))
}

/// Computes RIPEMD160(SHA256(data)), the body of a program hash
pub fn hash160(data: &[u8]) -> [u8; 20] {
    Ripemd160::digest(sha256(data)).into()
}

/// First four bytes of the double SHA-256, appended to Base58 payloads
pub fn checksum(data: &[u8]) -> [u8; 4] {
    let hash = double_sha256(data);
    [hash[0], hash[1], hash[2], hash[3]]
}

/// Computes SHA-256 hash and returns it as a hex string
pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(sha256(data))
}
