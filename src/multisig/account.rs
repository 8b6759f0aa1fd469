//! Multi-signature account configuration
//!
//! Validates k-of-n key sets and derives their redeem script and program hash.

use crate::core::{multisig_code, AddressError, ProgramHash, PREFIX_MULTISIG};
use crate::crypto::sort_public_keys;
use secp256k1::PublicKey;
use std::collections::HashSet;
use thiserror::Error;

/// Fewest distinct public keys a multi-signature account may have
pub const MIN_MULTISIG_KEYS: usize = 3;

/// Most keys a redeem script can carry
pub const MAX_MULTISIG_KEYS: usize = 16;

/// Errors related to multisig operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MultisigError {
    #[error("Insufficient public keys: need at least {}, got {have}", MIN_MULTISIG_KEYS)]
    InsufficientKeys { have: usize },
    #[error("Too many public keys: at most {}, got {have}", MAX_MULTISIG_KEYS)]
    TooManyKeys { have: usize },
    #[error("Invalid threshold: {0}")]
    InvalidThreshold(String),
    #[error("Duplicate signer public key {0}")]
    DuplicateSigner(String),
    #[error("Script error: {0}")]
    Script(#[from] AddressError),
}

/// Configuration for a multisig account
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MultisigConfig {
    /// Minimum signatures required (k in k-of-n)
    threshold: usize,
    /// Signer public keys in canonical (sorted) order
    signers: Vec<PublicKey>,
}

impl MultisigConfig {
    /// Create a new multisig configuration
    ///
    /// # Arguments
    /// * `threshold` - Minimum signatures required; `None` picks a majority
    ///   (`n / 2 + 1`)
    /// * `signers` - Public keys of authorized signers, in any order
    ///
    /// # Errors
    /// Fewer than three keys, duplicates, or a threshold outside `1..=n`
    pub fn new(threshold: Option<usize>, signers: Vec<PublicKey>) -> Result<Self, MultisigError> {
        if signers.len() < MIN_MULTISIG_KEYS {
            return Err(MultisigError::InsufficientKeys {
                have: signers.len(),
            });
        }
        if signers.len() > MAX_MULTISIG_KEYS {
            return Err(MultisigError::TooManyKeys {
                have: signers.len(),
            });
        }

        let mut seen = HashSet::new();
        for key in &signers {
            if !seen.insert(key.serialize()) {
                return Err(MultisigError::DuplicateSigner(hex::encode(key.serialize())));
            }
        }

        let threshold = threshold.unwrap_or(signers.len() / 2 + 1);
        if threshold == 0 {
            return Err(MultisigError::InvalidThreshold(
                "threshold must be at least 1".to_string(),
            ));
        }
        if threshold > signers.len() {
            return Err(MultisigError::InvalidThreshold(format!(
                "threshold {} exceeds signer count {}",
                threshold,
                signers.len()
            )));
        }

        let mut signers = signers;
        sort_public_keys(&mut signers);

        Ok(Self { threshold, signers })
    }

    /// Get the threshold (k)
    pub fn threshold(&self) -> usize {
        self.threshold
    }

    /// Get the total signer count (n)
    pub fn signer_count(&self) -> usize {
        self.signers.len()
    }

    pub fn signers(&self) -> &[PublicKey] {
        &self.signers
    }

    /// Redeem script over the sorted keys
    pub fn redeem_script(&self) -> Result<Vec<u8>, MultisigError> {
        Ok(multisig_code(self.threshold, &self.signers)?)
    }

    pub fn program_hash(&self) -> Result<ProgramHash, MultisigError> {
        Ok(ProgramHash::from_code(PREFIX_MULTISIG, &self.redeem_script()?))
    }

    /// Get description like "2-of-3"
    pub fn description(&self) -> String {
        format!("{}-of-{}", self.threshold, self.signers.len())
    }
}
