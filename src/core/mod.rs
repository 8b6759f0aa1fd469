//! Core wallet data types
//!
//! This module contains the fundamental building blocks:
//! - Fixed-point amounts with checked arithmetic
//! - Program hashes, redeem scripts and Base58Check addresses
//! - Transactions with canonical binary encoding and signature programs

pub mod amount;
pub mod codec;
pub mod program;
pub mod transaction;

pub use amount::{Amount, AmountError, UNITS_PER_COIN};
pub use program::{
    multisig_code, program_hash_of_code, standard_code, AddressError, ProgramHash,
    SpendCondition, PREFIX_MULTISIG, PREFIX_STANDARD, PROGRAM_HASH_LENGTH,
};
pub use transaction::{
    OutPoint, Program, Signature, SignedTransaction, Transaction, TransactionError,
    TransactionId, TxInput, TxOutput, UnsignedTransaction, Utxo, SEQUENCE_FINAL,
    SEQUENCE_LOCKTIME,
};
