//! Storage module for wallet files and the ledger cache

pub mod persistence;
pub mod utxo_cache;

pub use persistence::{load_json, remove_if_exists, save_json, write_atomic, StorageError};
pub use utxo_cache::{CacheStats, LedgerView};
