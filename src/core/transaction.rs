//! Transaction handling for the wallet
//!
//! Implements a UTXO-based transaction with one program (redeem script plus
//! collected signatures) per distinct spending program hash.
//! - Canonical signable encoding that excludes programs, so adding
//!   signatures never changes what is signed
//! - Locktime with per-input sequence numbers
//! - Multi-signature programs filled in incrementally by independent signers

use crate::core::amount::{Amount, AmountError};
use crate::core::codec::{CodecError, Reader, Writer};
use crate::core::program::{AddressError, ProgramHash, SpendCondition, PROGRAM_HASH_LENGTH};
use crate::crypto::{double_sha256, sha256, verify_signature, KeyError, SIGNATURE_LENGTH};
use secp256k1::PublicKey;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

// =============================================================================
// Constants
// =============================================================================

/// Transaction type byte of a plain value transfer
pub const TX_TYPE_TRANSFER: u8 = 0x02;

/// Payload version of a transfer
pub const PAYLOAD_VERSION: u8 = 0x00;

/// Sequence number that disables locktime
pub const SEQUENCE_FINAL: u32 = 0xFFFF_FFFF;

/// Sequence number that keeps locktime enforced
pub const SEQUENCE_LOCKTIME: u32 = 0xFFFF_FFFE;

/// Push opcode in front of each 64-byte signature in a program parameter
pub const OP_PUSH_SIGNATURE: u8 = 0x40;

// =============================================================================
// Error Types
// =============================================================================

/// Transaction-related errors
#[derive(Error, Debug)]
pub enum TransactionError {
    #[error("Malformed transaction: {0}")]
    Malformed(String),
    #[error("Malformed transaction: {0}")]
    Codec(#[from] CodecError),
    #[error("Invalid program: {0}")]
    InvalidProgram(#[from] AddressError),
    #[error("Amount error: {0}")]
    Amount(#[from] AmountError),
    #[error("Crypto error: {0}")]
    Crypto(#[from] KeyError),
    #[error("Signer {public_key} is not part of program {program_hash}")]
    UnauthorizedSigner {
        public_key: String,
        program_hash: ProgramHash,
    },
    #[error("Invalid signature from {0}")]
    InvalidSignature(String),
    #[error("Inputs total {inputs} is less than outputs total {outputs}")]
    ValueNotConserved { inputs: Amount, outputs: Amount },
}

// =============================================================================
// Identifiers
// =============================================================================

/// Transaction id: double SHA-256 of the signable encoding
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TransactionId([u8; 32]);

impl TransactionId {
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for TransactionId {
    /// Byte-reversed hex, the form nodes and explorers print
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut bytes = self.0;
        bytes.reverse();
        f.write_str(&hex::encode(bytes))
    }
}

impl fmt::Debug for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TransactionId({})", self)
    }
}

impl FromStr for TransactionId {
    type Err = TransactionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut bytes: [u8; 32] = hex::decode(s.trim())
            .ok()
            .and_then(|v| v.try_into().ok())
            .ok_or_else(|| TransactionError::Malformed(format!("bad transaction id {}", s)))?;
        bytes.reverse();
        Ok(Self(bytes))
    }
}

impl Serialize for TransactionId {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for TransactionId {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Reference to an output of a previous transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OutPoint {
    pub tx_id: TransactionId,
    pub index: u16,
}

impl fmt::Display for OutPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.tx_id, self.index)
    }
}

// =============================================================================
// UTXO
// =============================================================================

/// Unspent Transaction Output (UTXO)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Utxo {
    pub outpoint: OutPoint,
    pub program_hash: ProgramHash,
    pub amount: Amount,
    /// Height before which the output may not be spent
    #[serde(default)]
    pub lock_height: u32,
}

// =============================================================================
// Inputs and Outputs
// =============================================================================

/// Transaction input. The owning program hash and amount are committed to
/// by the signature so an offline signer can check the fee.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxInput {
    pub outpoint: OutPoint,
    pub sequence: u32,
    pub program_hash: ProgramHash,
    pub amount: Amount,
}

impl TxInput {
    pub fn from_utxo(utxo: &Utxo, sequence: u32) -> Self {
        Self {
            outpoint: utxo.outpoint,
            sequence,
            program_hash: utxo.program_hash,
            amount: utxo.amount,
        }
    }
}

/// Transaction output
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxOutput {
    pub program_hash: ProgramHash,
    pub amount: Amount,
    /// Height before which the output may not be spent by the recipient
    pub output_lock: u32,
}

// =============================================================================
// Programs and Signatures
// =============================================================================

/// A signature tagged with its signer's public key
#[derive(Clone, PartialEq, Eq)]
pub struct Signature {
    pub public_key: PublicKey,
    pub bytes: [u8; SIGNATURE_LENGTH],
}

impl Signature {
    pub fn verify(&self, message: &[u8]) -> bool {
        verify_signature(&self.public_key, message, &self.bytes).unwrap_or(false)
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signature")
            .field("public_key", &hex::encode(self.public_key.serialize()))
            .finish_non_exhaustive()
    }
}

/// Redeem script for one spending program hash and the signatures collected
/// for it so far, kept in script key order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Program {
    pub code: Vec<u8>,
    signatures: Vec<Signature>,
    condition: SpendCondition,
}

impl Program {
    pub fn new(code: Vec<u8>) -> Result<Self, TransactionError> {
        let condition = SpendCondition::parse(&code)?;
        Ok(Self {
            code,
            signatures: Vec::new(),
            condition,
        })
    }

    pub fn program_hash(&self) -> ProgramHash {
        ProgramHash::from_code(self.condition.prefix(), &self.code)
    }

    pub fn condition(&self) -> &SpendCondition {
        &self.condition
    }

    pub fn signatures(&self) -> &[Signature] {
        &self.signatures
    }

    pub fn required(&self) -> usize {
        self.condition.required()
    }

    pub fn is_complete(&self) -> bool {
        self.signatures.len() >= self.required()
    }

    pub fn is_signer(&self, public_key: &PublicKey) -> bool {
        self.condition.public_keys().contains(public_key)
    }

    pub fn has_signed(&self, public_key: &PublicKey) -> bool {
        self.signatures.iter().any(|s| &s.public_key == public_key)
    }

    /// Add a signature after checking the signer belongs to the script and
    /// the signature is valid. Returns `false` when the signer already
    /// signed, leaving the set unchanged.
    pub fn insert_signature(
        &mut self,
        signature: Signature,
        digest: &[u8],
    ) -> Result<bool, TransactionError> {
        let keys = self.condition.public_keys();
        let position = keys
            .iter()
            .position(|k| k == &signature.public_key)
            .ok_or_else(|| TransactionError::UnauthorizedSigner {
                public_key: hex::encode(signature.public_key.serialize()),
                program_hash: self.program_hash(),
            })?;

        if self.has_signed(&signature.public_key) {
            return Ok(false);
        }
        if !signature.verify(digest) {
            return Err(TransactionError::InvalidSignature(hex::encode(
                signature.public_key.serialize(),
            )));
        }

        let at = self
            .signatures
            .iter()
            .position(|s| {
                keys.iter()
                    .position(|k| k == &s.public_key)
                    .map_or(false, |p| p > position)
            })
            .unwrap_or(self.signatures.len());
        self.signatures.insert(at, signature);
        Ok(true)
    }

    /// Serialized signature pushes
    pub fn parameter(&self) -> Vec<u8> {
        let mut parameter = Vec::with_capacity(self.signatures.len() * (SIGNATURE_LENGTH + 1));
        for signature in &self.signatures {
            parameter.push(OP_PUSH_SIGNATURE);
            parameter.extend_from_slice(&signature.bytes);
        }
        parameter
    }

    /// Rebuild the signature set from a serialized parameter, recovering each
    /// signer by verification against the script keys
    fn with_parameter(code: Vec<u8>, parameter: &[u8], digest: &[u8]) -> Result<Self, TransactionError> {
        let mut program = Self::new(code)?;
        if parameter.len() % (SIGNATURE_LENGTH + 1) != 0 {
            return Err(TransactionError::Malformed(
                "program parameter has a partial signature".to_string(),
            ));
        }

        let keys = program.condition.public_keys();
        for chunk in parameter.chunks(SIGNATURE_LENGTH + 1) {
            if chunk[0] != OP_PUSH_SIGNATURE {
                return Err(TransactionError::Malformed(
                    "expected signature push in program parameter".to_string(),
                ));
            }
            let mut bytes = [0u8; SIGNATURE_LENGTH];
            bytes.copy_from_slice(&chunk[1..]);

            let signer = keys
                .iter()
                .find(|k| {
                    !program.has_signed(k)
                        && verify_signature(k, digest, &bytes).unwrap_or(false)
                })
                .ok_or_else(|| {
                    TransactionError::Malformed(format!(
                        "signature matches no unsigned key of {}",
                        program.program_hash()
                    ))
                })?;
            program.insert_signature(
                Signature {
                    public_key: *signer,
                    bytes,
                },
                digest,
            )?;
        }
        Ok(program)
    }
}

// =============================================================================
// Transaction
// =============================================================================

/// A transfer transaction in any signing state. Portable as hex text so
/// signers on different machines can each add their signatures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    pub inputs: Vec<TxInput>,
    pub outputs: Vec<TxOutput>,
    /// 0: no lock; otherwise the block height the transaction waits for
    pub lock_time: u32,
    pub programs: Vec<Program>,
}

/// A transaction as produced by the builder, before any signature
pub type UnsignedTransaction = Transaction;

impl Transaction {
    /// Canonical encoding covered by signatures
    pub fn signable_bytes(&self) -> Vec<u8> {
        let mut w = Writer::new();
        self.write_signable(&mut w);
        w.into_bytes()
    }

    fn write_signable(&self, w: &mut Writer) {
        w.u8(TX_TYPE_TRANSFER);
        w.u8(PAYLOAD_VERSION);

        w.var_int(self.inputs.len() as u64);
        for input in &self.inputs {
            w.bytes(input.outpoint.tx_id.as_bytes());
            w.u16(input.outpoint.index);
            w.u32(input.sequence);
            w.bytes(input.program_hash.as_bytes());
            w.i64(input.amount.units());
        }

        w.var_int(self.outputs.len() as u64);
        for output in &self.outputs {
            w.bytes(output.program_hash.as_bytes());
            w.i64(output.amount.units());
            w.u32(output.output_lock);
        }

        w.u32(self.lock_time);
    }

    /// SHA-256 digest each signer signs
    pub fn signing_digest(&self) -> [u8; 32] {
        sha256(&self.signable_bytes())
    }

    pub fn tx_id(&self) -> TransactionId {
        TransactionId(double_sha256(&self.signable_bytes()))
    }

    /// Full encoding: signable part followed by programs
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut w = Writer::new();
        self.write_signable(&mut w);
        w.var_int(self.programs.len() as u64);
        for program in &self.programs {
            w.var_bytes(&program.code);
            w.var_bytes(&program.parameter());
        }
        w.into_bytes()
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.to_bytes())
    }

    pub fn from_hex(text: &str) -> Result<Self, TransactionError> {
        let bytes = hex::decode(text.trim())
            .map_err(|e| TransactionError::Malformed(format!("not hex: {}", e)))?;
        Self::from_bytes(&bytes)
    }

    /// Decode and validate structure, signatures and value conservation
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, TransactionError> {
        let mut r = Reader::new(bytes);

        let tx_type = r.u8("transaction type")?;
        if tx_type != TX_TYPE_TRANSFER {
            return Err(TransactionError::Malformed(format!(
                "unsupported transaction type {:#04x}",
                tx_type
            )));
        }
        let payload_version = r.u8("payload version")?;
        if payload_version != PAYLOAD_VERSION {
            return Err(TransactionError::Malformed(format!(
                "unsupported payload version {}",
                payload_version
            )));
        }

        let input_count = r.length("input count")?;
        let mut inputs = Vec::with_capacity(input_count.min(1024));
        for _ in 0..input_count {
            let tx_id = TransactionId(r.array("input txid")?);
            let index = r.u16("input index")?;
            let sequence = r.u32("input sequence")?;
            let program_hash = ProgramHash::from_bytes(r.array::<PROGRAM_HASH_LENGTH>("input program hash")?);
            let amount = Amount::from_units(r.i64("input amount")?)?;
            inputs.push(TxInput {
                outpoint: OutPoint { tx_id, index },
                sequence,
                program_hash,
                amount,
            });
        }

        let output_count = r.length("output count")?;
        let mut outputs = Vec::with_capacity(output_count.min(1024));
        for _ in 0..output_count {
            let program_hash = ProgramHash::from_bytes(r.array::<PROGRAM_HASH_LENGTH>("output program hash")?);
            let amount = Amount::from_units(r.i64("output amount")?)?;
            let output_lock = r.u32("output lock")?;
            outputs.push(TxOutput {
                program_hash,
                amount,
                output_lock,
            });
        }

        let lock_time = r.u32("lock time")?;

        let mut tx = Transaction {
            inputs,
            outputs,
            lock_time,
            programs: Vec::new(),
        };
        let digest = tx.signing_digest();

        let program_count = r.length("program count")?;
        for _ in 0..program_count {
            let code = r.var_bytes("program code")?.to_vec();
            let parameter = r.var_bytes("program parameter")?;
            tx.programs
                .push(Program::with_parameter(code, parameter, &digest)?);
        }

        if !r.is_empty() {
            return Err(TransactionError::Malformed(format!(
                "{} trailing bytes",
                bytes.len() - r.position()
            )));
        }

        tx.validate()?;
        Ok(tx)
    }

    /// Structural checks shared by the builder and the decoder
    pub fn validate(&self) -> Result<(), TransactionError> {
        if self.inputs.is_empty() {
            return Err(TransactionError::Malformed("no inputs".to_string()));
        }
        if self.outputs.is_empty() {
            return Err(TransactionError::Malformed("no outputs".to_string()));
        }

        let mut seen = HashSet::new();
        for input in &self.inputs {
            if !seen.insert(input.outpoint) {
                return Err(TransactionError::Malformed(format!(
                    "outpoint {} spent twice",
                    input.outpoint
                )));
            }
        }

        let mut program_hashes = HashSet::new();
        for program in &self.programs {
            let hash = program.program_hash();
            if !program_hashes.insert(hash) {
                return Err(TransactionError::Malformed(format!(
                    "duplicate program for {}",
                    hash
                )));
            }
            if !self.inputs.iter().any(|i| i.program_hash == hash) {
                return Err(TransactionError::Malformed(format!(
                    "program {} spends no input",
                    hash
                )));
            }
        }
        for input in &self.inputs {
            if !program_hashes.contains(&input.program_hash) {
                return Err(TransactionError::Malformed(format!(
                    "no program for input {} owned by {}",
                    input.outpoint, input.program_hash
                )));
            }
        }

        let inputs = self.total_input()?;
        let outputs = self.total_output()?;
        if inputs < outputs {
            return Err(TransactionError::ValueNotConserved { inputs, outputs });
        }
        Ok(())
    }

    pub fn total_input(&self) -> Result<Amount, AmountError> {
        Amount::sum(self.inputs.iter().map(|i| i.amount))
    }

    pub fn total_output(&self) -> Result<Amount, AmountError> {
        Amount::sum(self.outputs.iter().map(|o| o.amount))
    }

    /// Inputs minus outputs
    pub fn fee(&self) -> Result<Amount, TransactionError> {
        let inputs = self.total_input()?;
        let outputs = self.total_output()?;
        inputs
            .checked_sub(outputs)
            .ok_or(TransactionError::ValueNotConserved { inputs, outputs })
    }

    pub fn program_for(&self, program_hash: &ProgramHash) -> Option<&Program> {
        self.programs
            .iter()
            .find(|p| &p.program_hash() == program_hash)
    }

    pub fn program_for_mut(&mut self, program_hash: &ProgramHash) -> Option<&mut Program> {
        self.programs
            .iter_mut()
            .find(|p| &p.program_hash() == program_hash)
    }

    /// Indexes of inputs whose program lacks enough signatures
    pub fn unsatisfied_inputs(&self) -> Vec<usize> {
        self.inputs
            .iter()
            .enumerate()
            .filter(|(_, input)| {
                self.program_for(&input.program_hash)
                    .map_or(true, |p| !p.is_complete())
            })
            .map(|(i, _)| i)
            .collect()
    }

    pub fn is_complete(&self) -> bool {
        self.unsatisfied_inputs().is_empty()
    }

    /// Check every attached signature against the current signable bytes
    pub fn verify_signatures(&self) -> bool {
        let digest = self.signing_digest();
        self.programs
            .iter()
            .all(|p| p.signatures().iter().all(|s| s.verify(&digest)))
    }

    /// Per-program (have, need) signature counts
    pub fn signature_status(&self) -> Vec<(ProgramHash, usize, usize)> {
        self.programs
            .iter()
            .map(|p| (p.program_hash(), p.signatures().len(), p.required()))
            .collect()
    }
}

/// A transaction whose every input has met its signature threshold
#[derive(Debug, Clone)]
pub struct SignedTransaction(Transaction);

impl SignedTransaction {
    /// Returns the unsatisfied input indexes when the set is incomplete
    pub fn try_from_transaction(tx: Transaction) -> Result<Self, (Transaction, Vec<usize>)> {
        let missing = tx.unsatisfied_inputs();
        if missing.is_empty() {
            Ok(Self(tx))
        } else {
            Err((tx, missing))
        }
    }

    pub fn transaction(&self) -> &Transaction {
        &self.0
    }

    pub fn into_inner(self) -> Transaction {
        self.0
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        self.0.to_bytes()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::program::{multisig_code, standard_code, PREFIX_MULTISIG, PREFIX_STANDARD};
    use crate::crypto::{sort_public_keys, KeyPair};

    fn outpoint(n: u8) -> OutPoint {
        OutPoint {
            tx_id: TransactionId([n; 32]),
            index: n as u16,
        }
    }

    fn single_key_tx(key: &KeyPair, input: i64, output: i64) -> Transaction {
        let code = standard_code(key.public_key());
        let owner = ProgramHash::from_code(PREFIX_STANDARD, &code);
        let recipient = ProgramHash::from_code(PREFIX_STANDARD, &standard_code(KeyPair::generate().public_key()));
        Transaction {
            inputs: vec![TxInput {
                outpoint: outpoint(1),
                sequence: SEQUENCE_FINAL,
                program_hash: owner,
                amount: Amount::from_units(input).unwrap(),
            }],
            outputs: vec![TxOutput {
                program_hash: recipient,
                amount: Amount::from_units(output).unwrap(),
                output_lock: 0,
            }],
            lock_time: 0,
            programs: vec![Program::new(code).unwrap()],
        }
    }

    fn sign_with(tx: &mut Transaction, key: &KeyPair) -> bool {
        let digest = tx.signing_digest();
        let owner = tx.inputs[0].program_hash;
        let signature = Signature {
            public_key: *key.public_key(),
            bytes: key.sign(&digest).unwrap(),
        };
        tx.program_for_mut(&owner)
            .unwrap()
            .insert_signature(signature, &digest)
            .unwrap()
    }

    #[test]
    fn test_fee_is_surplus() {
        let key = KeyPair::generate();
        let tx = single_key_tx(&key, 100, 90);
        assert_eq!(tx.fee().unwrap(), Amount::from_units(10).unwrap());
        assert!(tx.validate().is_ok());
    }

    #[test]
    fn test_value_not_conserved_rejected() {
        let key = KeyPair::generate();
        let tx = single_key_tx(&key, 50, 90);
        assert!(matches!(
            tx.validate(),
            Err(TransactionError::ValueNotConserved { .. })
        ));
    }

    #[test]
    fn test_signing_does_not_change_signable_bytes() {
        let key = KeyPair::generate();
        let mut tx = single_key_tx(&key, 100, 90);
        let before = tx.signable_bytes();
        let id = tx.tx_id();

        assert!(sign_with(&mut tx, &key));
        assert_eq!(tx.signable_bytes(), before);
        assert_eq!(tx.tx_id(), id);
        assert!(tx.is_complete());
    }

    #[test]
    fn test_duplicate_signature_is_ignored() {
        let key = KeyPair::generate();
        let mut tx = single_key_tx(&key, 100, 90);
        assert!(sign_with(&mut tx, &key));
        assert!(!sign_with(&mut tx, &key));
        assert_eq!(tx.programs[0].signatures().len(), 1);
    }

    #[test]
    fn test_unauthorized_signer_rejected() {
        let key = KeyPair::generate();
        let stranger = KeyPair::generate();
        let mut tx = single_key_tx(&key, 100, 90);
        let digest = tx.signing_digest();

        let result = tx.programs[0].insert_signature(
            Signature {
                public_key: *stranger.public_key(),
                bytes: stranger.sign(&digest).unwrap(),
            },
            &digest,
        );
        assert!(matches!(
            result,
            Err(TransactionError::UnauthorizedSigner { .. })
        ));
    }

    #[test]
    fn test_encoding_round_trip_with_signatures() {
        let key = KeyPair::generate();
        let mut tx = single_key_tx(&key, 100, 90);
        sign_with(&mut tx, &key);

        let decoded = Transaction::from_hex(&tx.to_hex()).unwrap();
        assert_eq!(decoded, tx);
        assert!(decoded.verify_signatures());
    }

    #[test]
    fn test_decode_rejects_trailing_and_truncated_data() {
        let key = KeyPair::generate();
        let tx = single_key_tx(&key, 100, 90);
        let mut bytes = tx.to_bytes();

        assert!(Transaction::from_bytes(&bytes[..bytes.len() - 1]).is_err());
        bytes.push(0);
        assert!(Transaction::from_bytes(&bytes).is_err());
        assert!(Transaction::from_hex("zz").is_err());
    }

    #[test]
    fn test_decode_rejects_forged_signature() {
        let key = KeyPair::generate();
        let mut tx = single_key_tx(&key, 100, 90);
        sign_with(&mut tx, &key);

        let mut bytes = tx.to_bytes();
        let last = bytes.len() - 1;
        bytes[last] ^= 0xFF;
        assert!(Transaction::from_bytes(&bytes).is_err());
    }

    #[test]
    fn test_multisig_signatures_commute() {
        let keys: Vec<KeyPair> = (0..3).map(|_| KeyPair::generate()).collect();
        let mut pubkeys: Vec<PublicKey> = keys.iter().map(|k| *k.public_key()).collect();
        sort_public_keys(&mut pubkeys);
        let code = multisig_code(2, &pubkeys).unwrap();
        let owner = ProgramHash::from_code(PREFIX_MULTISIG, &code);

        let mut base = single_key_tx(&keys[0], 100, 90);
        base.inputs[0].program_hash = owner;
        base.programs = vec![Program::new(code).unwrap()];

        let mut ab = base.clone();
        sign_with(&mut ab, &keys[0]);
        assert!(!ab.is_complete());
        assert_eq!(ab.unsatisfied_inputs(), vec![0]);
        sign_with(&mut ab, &keys[1]);

        let mut ba = base.clone();
        sign_with(&mut ba, &keys[1]);
        sign_with(&mut ba, &keys[0]);

        assert!(ab.is_complete());
        assert_eq!(ab.to_bytes(), ba.to_bytes());
        assert_eq!(Transaction::from_bytes(&ab.to_bytes()).unwrap(), ab);
    }

    #[test]
    fn test_signed_transaction_requires_completeness() {
        let key = KeyPair::generate();
        let tx = single_key_tx(&key, 100, 90);
        let (tx, missing) = SignedTransaction::try_from_transaction(tx).unwrap_err();
        assert_eq!(missing, vec![0]);

        let mut tx = tx;
        sign_with(&mut tx, &key);
        assert!(SignedTransaction::try_from_transaction(tx).is_ok());
    }

    #[test]
    fn test_transaction_id_text_round_trip() {
        let key = KeyPair::generate();
        let id = single_key_tx(&key, 100, 90).tx_id();
        assert_eq!(id.to_string().parse::<TransactionId>().unwrap(), id);
    }
}
