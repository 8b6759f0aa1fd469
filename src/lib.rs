//! ela-wallet: transaction and account core of a command-line wallet
//!
//! This crate provides:
//! - Password-encrypted key custody (Argon2id + ChaCha20-Poly1305)
//! - Standard and k-of-n multi-signature spend addresses
//! - A ledger view of unspent outputs refreshed from a node
//! - Byte-exact transactions built, signed and sent in separate steps
//!
//! # Example
//!
//! ```no_run
//! use ela_wallet::network::{RpcClient, RpcConfig};
//! use ela_wallet::wallet::{OutputSpec, Wallet, WalletConfig};
//!
//! let config = WalletConfig::default();
//! let rpc = RpcClient::new(RpcConfig::default())?;
//!
//! let mut password = b"Abc123!".to_vec();
//! let wallet = Wallet::open(config, &mut password)?;
//!
//! let outputs = [OutputSpec::new("EQ4QhsYRwuBbNBXc8BPW972xA9ANByKt6U", "1.5".parse()?)];
//! let tx = wallet.create_transaction(&rpc, &[], &outputs, "0.0001".parse()?, None)?;
//!
//! let mut password = b"Abc123!".to_vec();
//! let tx = wallet.sign_transaction(tx, &mut password)?;
//! let tx_id = wallet.send_transaction(tx, &rpc)?;
//! println!("Sent {}", tx_id);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod cli;
pub mod core;
pub mod crypto;
pub mod multisig;
pub mod network;
pub mod storage;
pub mod wallet;

// Re-export commonly used types
pub use core::{Amount, ProgramHash, SignedTransaction, Transaction, TransactionId, Utxo};
pub use crypto::KeyPair;
pub use multisig::MultisigConfig;
pub use network::{Broadcaster, ChainSource, RpcClient};
pub use storage::LedgerView;
pub use wallet::{Wallet, WalletConfig, WalletError, WalletHandle};
