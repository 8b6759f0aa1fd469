//! Wallet module for key custody, accounts and the transaction pipeline
//!
//! - [`KeyStore`]: password-encrypted private key file
//! - [`AddressBook`]: standard and multi-signature spend addresses
//! - [`TransactionBuilder`], [`sign_transaction`], [`send_transaction`]:
//!   the create, sign and send stages
//! - [`Wallet`] / [`WalletHandle`]: the facade tying them together

pub mod address_book;
pub mod builder;
pub mod config;
pub mod keystore;
pub mod password;
pub mod signer;
pub mod submitter;
pub mod wallet;

use crate::core::{AddressError, AmountError, TransactionError};
use crate::crypto::KeyError;
use crate::multisig::MultisigError;
use crate::network::NetworkError;
use crate::storage::StorageError;
use std::path::PathBuf;
use thiserror::Error;

pub use address_book::{AccountKind, AccountRecord, AddressBook};
pub use builder::{parse_output_content, ChangePolicy, OutputSpec, TransactionBuilder};
pub use config::WalletConfig;
pub use keystore::{KdfParams, KeyStore};
pub use password::{FixedPassword, PasswordGuard, PasswordSource, TerminalPassword};
pub use signer::{ensure_complete, sign_transaction};
pub use submitter::{send_raw_transaction, send_transaction};
pub use wallet::{AccountInfo, BalanceEntry, SessionState, Wallet, WalletHandle};

/// Wallet-related errors
#[derive(Error, Debug)]
pub enum WalletError {
    #[error("Wrong password")]
    WrongPassword,
    #[error("Keystore is corrupt: {0}")]
    Corrupt(String),
    #[error("Not found: {0}")]
    NotFound(PathBuf),
    #[error("Wallet already exists at {0}")]
    AlreadyExists(PathBuf),
    #[error("Passwords do not match")]
    PasswordMismatch,
    #[error("Invalid address: {0}")]
    InvalidAddress(String),
    #[error("Insufficient public keys: need at least 3, got {have}")]
    InsufficientKeys { have: usize },
    #[error("Invalid keys: {0}")]
    InvalidKeys(String),
    #[error("Insufficient funds: available {available}, required {required}, short by {shortfall}")]
    InsufficientFunds {
        available: crate::core::Amount,
        required: crate::core::Amount,
        shortfall: crate::core::Amount,
    },
    #[error("No spendable address in wallet")]
    NoSpendableAddress,
    #[error("Invalid output: {0}")]
    InvalidOutput(String),
    #[error("No program in the transaction can be signed by this account")]
    NothingToSign,
    #[error("Incomplete signature set for inputs {inputs:?} ({addresses:?})")]
    IncompleteSignatureSet {
        inputs: Vec<usize>,
        addresses: Vec<String>,
    },
    #[error("Chain data source unavailable: {0}")]
    SourceUnavailable(String),
    #[error("Transaction rejected by network: {0}")]
    RejectedByNetwork(String),
    #[error("Malformed transaction: {0}")]
    Malformed(String),
    #[error("Amount overflow")]
    Overflow,
    #[error("Storage error: {0}")]
    Storage(StorageError),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Config error: {0}")]
    Config(String),
}

impl From<StorageError> for WalletError {
    fn from(e: StorageError) -> Self {
        match e {
            StorageError::NotFound(path) => WalletError::NotFound(path),
            other => WalletError::Storage(other),
        }
    }
}

impl From<NetworkError> for WalletError {
    fn from(e: NetworkError) -> Self {
        match e {
            NetworkError::SourceUnavailable(msg) => WalletError::SourceUnavailable(msg),
            NetworkError::RejectedByNetwork(msg) => WalletError::RejectedByNetwork(msg),
        }
    }
}

impl From<AmountError> for WalletError {
    fn from(e: AmountError) -> Self {
        match e {
            AmountError::Overflow => WalletError::Overflow,
            AmountError::Invalid(msg) => WalletError::InvalidOutput(msg),
        }
    }
}

impl From<AddressError> for WalletError {
    fn from(e: AddressError) -> Self {
        WalletError::InvalidAddress(e.to_string())
    }
}

impl From<KeyError> for WalletError {
    fn from(e: KeyError) -> Self {
        WalletError::InvalidKeys(e.to_string())
    }
}

impl From<MultisigError> for WalletError {
    fn from(e: MultisigError) -> Self {
        match e {
            MultisigError::InsufficientKeys { have } => WalletError::InsufficientKeys { have },
            other => WalletError::InvalidKeys(other.to_string()),
        }
    }
}

impl From<TransactionError> for WalletError {
    fn from(e: TransactionError) -> Self {
        match e {
            TransactionError::Amount(AmountError::Overflow) => WalletError::Overflow,
            other => WalletError::Malformed(other.to_string()),
        }
    }
}
