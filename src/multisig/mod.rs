//! Multi-signature account support
//!
//! Provides k-of-n threshold accounts where k signatures from n
//! authorized signers are required to spend funds.
//!
//! # Example
//!
//! ```ignore
//! use ela_wallet::multisig::MultisigConfig;
//!
//! // Create a 2-of-3 multisig account; key order does not matter
//! let config = MultisigConfig::new(Some(2), vec![pubkey1, pubkey2, pubkey3])?;
//! let address = config.program_hash()?.to_address();
//! ```

pub mod account;

pub use account::{MultisigConfig, MultisigError, MAX_MULTISIG_KEYS, MIN_MULTISIG_KEYS};
