//! Chain-data and broadcast capabilities
//!
//! The wallet core only needs two things from the network: the current
//! unspent outputs of an address and a way to submit transaction bytes.
//! Both are traits so the JSON-RPC client can be swapped for test doubles.

pub mod rpc;

use crate::core::{ProgramHash, TransactionId, Utxo};
use thiserror::Error;

pub use rpc::{RpcClient, RpcConfig};

/// Network-facing failures, surfaced to callers verbatim
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NetworkError {
    #[error("Chain data source unavailable: {0}")]
    SourceUnavailable(String),
    #[error("Transaction rejected by network: {0}")]
    RejectedByNetwork(String),
}

/// Source of unspent outputs and chain height
pub trait ChainSource {
    /// Current unspent outputs owned by `program_hash`
    fn fetch_utxos(&self, program_hash: &ProgramHash) -> Result<Vec<Utxo>, NetworkError>;

    /// Height of the best block
    fn current_height(&self) -> Result<u32, NetworkError>;
}

/// Transport that hands finished transactions to the network
pub trait Broadcaster {
    /// Submit serialized transaction bytes; no retries
    fn submit(&self, bytes: &[u8]) -> Result<TransactionId, NetworkError>;
}
