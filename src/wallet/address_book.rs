//! Address book of spend accounts
//!
//! Records every address the wallet can spend from together with its
//! redeem script. The keystore's own standard account is always first.

use super::WalletError;
use crate::core::{standard_code, ProgramHash, PREFIX_STANDARD};
use crate::multisig::MultisigConfig;
use crate::storage::{load_json, save_json, StorageError};
use chrono::{DateTime, Utc};
use secp256k1::PublicKey;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

mod hex_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(deserializer)?;
        hex::decode(s).map_err(serde::de::Error::custom)
    }
}

/// Spend condition of an account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AccountKind {
    Standard {
        public_key: String,
    },
    MultiSig {
        required: usize,
        total: usize,
        public_keys: Vec<String>,
    },
}

/// One address the wallet can spend from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountRecord {
    pub program_hash: ProgramHash,
    #[serde(with = "hex_bytes")]
    pub code: Vec<u8>,
    pub kind: AccountKind,
    pub created_at: DateTime<Utc>,
}

impl AccountRecord {
    pub fn address(&self) -> String {
        self.program_hash.to_address()
    }

    pub fn is_multisig(&self) -> bool {
        matches!(self.kind, AccountKind::MultiSig { .. })
    }

    /// "standard" or "2-of-3"
    pub fn description(&self) -> String {
        match &self.kind {
            AccountKind::Standard { .. } => "standard".to_string(),
            AccountKind::MultiSig {
                required, total, ..
            } => format!("{}-of-{}", required, total),
        }
    }
}

/// Persisted list of spend accounts
#[derive(Debug)]
pub struct AddressBook {
    path: PathBuf,
    records: Vec<AccountRecord>,
}

impl AddressBook {
    /// Load the book at `path`, creating it if missing, with the standard
    /// account of `main_key` in first position
    pub fn open(path: &Path, main_key: &PublicKey) -> Result<Self, WalletError> {
        let records: Vec<AccountRecord> = match load_json(path) {
            Ok(records) => records,
            Err(StorageError::NotFound(_)) => Vec::new(),
            Err(StorageError::SerializationError(e)) => {
                return Err(WalletError::Corrupt(format!("unreadable address book: {}", e)))
            }
            Err(e) => return Err(e.into()),
        };

        let mut book = Self {
            path: path.to_path_buf(),
            records,
        };

        let main = Self::standard_record(main_key);
        match book.position(&main.program_hash) {
            Some(0) => {}
            Some(i) => {
                let record = book.records.remove(i);
                book.records.insert(0, record);
                book.save()?;
            }
            None => {
                book.records.insert(0, main);
                book.save()?;
            }
        }
        Ok(book)
    }

    fn standard_record(public_key: &PublicKey) -> AccountRecord {
        let code = standard_code(public_key);
        AccountRecord {
            program_hash: ProgramHash::from_code(PREFIX_STANDARD, &code),
            code,
            kind: AccountKind::Standard {
                public_key: hex::encode(public_key.serialize()),
            },
            created_at: Utc::now(),
        }
    }

    fn position(&self, program_hash: &ProgramHash) -> Option<usize> {
        self.records
            .iter()
            .position(|r| &r.program_hash == program_hash)
    }

    fn save(&self) -> Result<(), WalletError> {
        save_json(&self.path, &self.records)?;
        Ok(())
    }

    fn insert(&mut self, record: AccountRecord) -> Result<ProgramHash, WalletError> {
        let program_hash = record.program_hash;
        if self.contains(&program_hash) {
            log::debug!("Account {} already recorded", program_hash);
            return Ok(program_hash);
        }
        self.records.push(record);
        self.save()?;
        log::info!("Added account {}", program_hash);
        Ok(program_hash)
    }

    /// Record the standard account of `public_key`
    pub fn add_standard(&mut self, public_key: &PublicKey) -> Result<ProgramHash, WalletError> {
        self.insert(Self::standard_record(public_key))
    }

    /// Record a multi-signature account; `required` defaults to a majority
    pub fn add_multisig(
        &mut self,
        public_keys: Vec<PublicKey>,
        required: Option<usize>,
    ) -> Result<ProgramHash, WalletError> {
        let config = MultisigConfig::new(required, public_keys)?;
        let code = config.redeem_script()?;
        let record = AccountRecord {
            program_hash: config.program_hash()?,
            code,
            kind: AccountKind::MultiSig {
                required: config.threshold(),
                total: config.signer_count(),
                public_keys: config
                    .signers()
                    .iter()
                    .map(|k| hex::encode(k.serialize()))
                    .collect(),
            },
            created_at: Utc::now(),
        };
        self.insert(record)
    }

    /// Decode an address
    pub fn resolve(&self, address: &str) -> Result<ProgramHash, WalletError> {
        Ok(ProgramHash::from_address(address.trim())?)
    }

    /// Decode an address that must belong to this wallet
    pub fn resolve_own(&self, address: &str) -> Result<ProgramHash, WalletError> {
        let program_hash = self.resolve(address)?;
        if !self.contains(&program_hash) {
            return Err(WalletError::InvalidAddress(format!(
                "{} is not an address of this wallet",
                address.trim()
            )));
        }
        Ok(program_hash)
    }

    pub fn get(&self, program_hash: &ProgramHash) -> Option<&AccountRecord> {
        self.records.iter().find(|r| &r.program_hash == program_hash)
    }

    pub fn contains(&self, program_hash: &ProgramHash) -> bool {
        self.position(program_hash).is_some()
    }

    /// Redeem script of a recorded account
    pub fn program_code(&self, program_hash: &ProgramHash) -> Option<&[u8]> {
        self.get(program_hash).map(|r| r.code.as_slice())
    }

    /// Accounts in insertion order, main account first
    pub fn accounts(&self) -> &[AccountRecord] {
        &self.records
    }

    pub fn main_account(&self) -> Option<&AccountRecord> {
        self.records.first()
    }

    pub fn program_hashes(&self) -> Vec<ProgramHash> {
        self.records.iter().map(|r| r.program_hash).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::KeyPair;

    fn keys(n: usize) -> Vec<PublicKey> {
        (0..n).map(|_| *KeyPair::generate().public_key()).collect()
    }

    #[test]
    fn test_main_account_first() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("addresses.json");
        let main = keys(1)[0];

        let mut book = AddressBook::open(&path, &main).unwrap();
        book.add_standard(&keys(1)[0]).unwrap();
        book.add_multisig(keys(3), None).unwrap();

        let reopened = AddressBook::open(&path, &main).unwrap();
        assert_eq!(reopened.accounts().len(), 3);
        assert_eq!(
            reopened.main_account().unwrap().program_hash,
            ProgramHash::from_code(PREFIX_STANDARD, &standard_code(&main))
        );
        assert!(reopened.accounts()[2].is_multisig());
        assert_eq!(reopened.accounts()[2].description(), "2-of-3");
    }

    #[test]
    fn test_standard_account_is_deterministic() {
        let temp_dir = tempfile::tempdir().unwrap();
        let key = keys(1)[0];
        let mut book = AddressBook::open(&temp_dir.path().join("a.json"), &keys(1)[0]).unwrap();

        let first = book.add_standard(&key).unwrap();
        let second = book.add_standard(&key).unwrap();
        assert_eq!(first, second);
        assert_eq!(book.accounts().len(), 2);
        assert!(first.to_address().starts_with('E'));
    }

    #[test]
    fn test_multisig_order_independent() {
        let temp_dir = tempfile::tempdir().unwrap();
        let mut book = AddressBook::open(&temp_dir.path().join("a.json"), &keys(1)[0]).unwrap();

        let signers = keys(3);
        let mut shuffled = signers.clone();
        shuffled.rotate_left(1);

        let a = book.add_multisig(signers.clone(), Some(2)).unwrap();
        let b = book.add_multisig(shuffled, Some(2)).unwrap();
        assert_eq!(a, b);
        assert!(a.to_address().starts_with('8'));

        // Differs from every member's standard hash
        for key in &signers {
            assert_ne!(a, ProgramHash::from_code(PREFIX_STANDARD, &standard_code(key)));
        }
    }

    #[test]
    fn test_multisig_key_errors() {
        let temp_dir = tempfile::tempdir().unwrap();
        let mut book = AddressBook::open(&temp_dir.path().join("a.json"), &keys(1)[0]).unwrap();

        assert!(matches!(
            book.add_multisig(keys(2), None),
            Err(WalletError::InsufficientKeys { have: 2 })
        ));
        assert!(matches!(
            book.add_multisig(keys(3), Some(4)),
            Err(WalletError::InvalidKeys(_))
        ));

        let mut duplicated = keys(2);
        duplicated.push(duplicated[0]);
        assert!(matches!(
            book.add_multisig(duplicated, None),
            Err(WalletError::InvalidKeys(_))
        ));
        assert_eq!(book.accounts().len(), 1);
    }

    #[test]
    fn test_resolve() {
        let temp_dir = tempfile::tempdir().unwrap();
        let main = keys(1)[0];
        let book = AddressBook::open(&temp_dir.path().join("a.json"), &main).unwrap();
        let own = book.main_account().unwrap().address();

        assert!(book.resolve_own(&own).is_ok());

        let stranger = ProgramHash::from_code(PREFIX_STANDARD, &standard_code(&keys(1)[0]));
        assert!(book.resolve(&stranger.to_address()).is_ok());
        assert!(matches!(
            book.resolve_own(&stranger.to_address()),
            Err(WalletError::InvalidAddress(_))
        ));

        let mut corrupted = own.clone();
        let last = corrupted.pop().unwrap();
        corrupted.push(if last == 'a' { 'b' } else { 'a' });
        assert!(matches!(
            book.resolve(&corrupted),
            Err(WalletError::InvalidAddress(_))
        ));
    }
}
