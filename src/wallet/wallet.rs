//! Wallet facade
//!
//! [`Wallet::create`] and [`Wallet::open`] return a [`WalletHandle`] that
//! owns the keystore, address book and ledger cache for one session. The
//! create, sign and send steps each take the portable transaction produced
//! by the previous one, so signers may run on different machines.

use super::address_book::{AccountRecord, AddressBook};
use super::builder::{OutputSpec, TransactionBuilder};
use super::config::WalletConfig;
use super::keystore::KeyStore;
use super::password::PasswordGuard;
use super::{signer, submitter, WalletError};
use crate::core::{Amount, ProgramHash, Transaction, TransactionId, UnsignedTransaction};
use crate::crypto::public_key_from_hex;
use crate::network::{Broadcaster, ChainSource};
use crate::storage::{remove_if_exists, LedgerView};
use std::cell::Cell;
use std::fmt;

/// What an open wallet is doing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Building,
    Signing,
    Submitting,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Idle => "idle",
            SessionState::Building => "building",
            SessionState::Signing => "signing",
            SessionState::Submitting => "submitting",
        };
        write!(f, "{}", name)
    }
}

/// Resets the session to idle when a pipeline step ends
struct SessionGuard<'a>(&'a Cell<SessionState>);

impl<'a> SessionGuard<'a> {
    fn enter(cell: &'a Cell<SessionState>, state: SessionState) -> Self {
        log::debug!("Session {} -> {}", cell.get(), state);
        cell.set(state);
        Self(cell)
    }
}

impl Drop for SessionGuard<'_> {
    fn drop(&mut self) {
        self.0.set(SessionState::Idle);
    }
}

/// Main account details
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountInfo {
    pub address: String,
    pub public_key: String,
    /// Program hash as byte-reversed hex
    pub program_hash: String,
}

/// Balance line of one account
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BalanceEntry {
    pub address: String,
    pub program_hash: String,
    pub kind: String,
    pub balance: Amount,
    pub locked: Amount,
}

/// Entry points for obtaining a [`WalletHandle`]
pub struct Wallet;

impl Wallet {
    pub fn exists(config: &WalletConfig) -> bool {
        KeyStore::exists(&config.keystore_path())
    }

    /// Create a keystore with a fresh key pair and an address book holding
    /// its standard account
    pub fn create(config: WalletConfig, password: &mut [u8]) -> Result<WalletHandle, WalletError> {
        let (keystore, _key_pair) = KeyStore::create(&config.keystore_path(), password, config.kdf)?;
        WalletHandle::new(config, keystore)
    }

    /// Open an existing wallet; the password is checked before anything
    /// else is loaded
    pub fn open(config: WalletConfig, password: &mut [u8]) -> Result<WalletHandle, WalletError> {
        let mut password = PasswordGuard::new(password);
        let keystore = KeyStore::load(&config.keystore_path())?;
        keystore.verify_password(password.as_mut_bytes())?;
        WalletHandle::new(config, keystore)
    }
}

/// An open wallet session
pub struct WalletHandle {
    config: WalletConfig,
    keystore: KeyStore,
    book: AddressBook,
    ledger: LedgerView,
    state: Cell<SessionState>,
}

impl WalletHandle {
    fn new(config: WalletConfig, keystore: KeyStore) -> Result<Self, WalletError> {
        let book = AddressBook::open(&config.address_book_path(), keystore.public_key())?;
        log::info!(
            "Opened wallet {} with {} account(s)",
            keystore.program_hash(),
            book.accounts().len()
        );
        Ok(Self {
            config,
            keystore,
            book,
            ledger: LedgerView::new(),
            state: Cell::new(SessionState::Idle),
        })
    }

    pub fn config(&self) -> &WalletConfig {
        &self.config
    }

    pub fn session_state(&self) -> SessionState {
        self.state.get()
    }

    pub fn accounts(&self) -> &[AccountRecord] {
        self.book.accounts()
    }

    pub fn ledger(&self) -> &LedgerView {
        &self.ledger
    }

    /// Main account details, shown after the password checks out
    pub fn account_info(&self, password: &mut [u8]) -> Result<AccountInfo, WalletError> {
        self.keystore.verify_password(password)?;
        let program_hash = self.keystore.program_hash();
        Ok(AccountInfo {
            address: program_hash.to_address(),
            public_key: hex::encode(self.keystore.public_key().serialize()),
            program_hash: program_hash.to_reversed_hex(),
        })
    }

    /// Add a standard account from one hex public key, or a multi-signature
    /// account from comma-separated keys. The new address is then synced.
    pub fn add_account(
        &mut self,
        content: &str,
        required: Option<usize>,
        source: &dyn ChainSource,
    ) -> Result<ProgramHash, WalletError> {
        let keys = content
            .split(',')
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .map(public_key_from_hex)
            .collect::<Result<Vec<_>, _>>()?;

        let program_hash = if content.contains(',') {
            self.book.add_multisig(keys, required)?
        } else {
            match keys.as_slice() {
                [key] => self.book.add_standard(key)?,
                _ => return Err(WalletError::InvalidKeys("expected one public key".to_string())),
            }
        };

        if let Err(e) = self.ledger.refresh(source, &[program_hash]) {
            log::warn!("Could not sync new account {}: {}", program_hash, e);
        }
        Ok(program_hash)
    }

    pub fn change_password(&mut self, old: &mut [u8], new: &mut [u8]) -> Result<(), WalletError> {
        self.keystore.change_password(old, new)
    }

    /// Sync every account and report its balance
    pub fn list_balances(&self, source: &dyn ChainSource) -> Result<Vec<BalanceEntry>, WalletError> {
        self.ledger.refresh(source, &self.book.program_hashes())?;

        let mut entries = Vec::with_capacity(self.book.accounts().len());
        for account in self.book.accounts() {
            entries.push(BalanceEntry {
                address: account.address(),
                program_hash: account.program_hash.to_reversed_hex(),
                kind: account.description(),
                balance: self.ledger.balance_of(&account.program_hash)?,
                locked: self.ledger.locked_balance_of(&account.program_hash)?,
            });
        }
        let stats = self.ledger.stats();
        log::debug!(
            "Ledger: {} refresh(es), hit rate {:.2}",
            stats.refreshes,
            stats.hit_rate()
        );
        Ok(entries)
    }

    /// Sync, then build an unsigned transaction
    pub fn create_transaction(
        &self,
        source: &dyn ChainSource,
        from: &[String],
        outputs: &[OutputSpec],
        fee: Amount,
        lock_time: Option<u32>,
    ) -> Result<UnsignedTransaction, WalletError> {
        let _session = SessionGuard::enter(&self.state, SessionState::Building);
        let builder =
            TransactionBuilder::new(&self.book, &self.ledger).with_policy(self.config.change_policy);
        builder.validate_outputs(outputs, fee, lock_time.unwrap_or(0))?;

        self.ledger.refresh(source, &self.book.program_hashes())?;
        builder.build(from, outputs, fee, lock_time)
    }

    /// Add this wallet's signatures
    pub fn sign_transaction(
        &self,
        mut tx: Transaction,
        password: &mut [u8],
    ) -> Result<Transaction, WalletError> {
        let _session = SessionGuard::enter(&self.state, SessionState::Signing);
        signer::sign_transaction(&mut tx, &self.keystore, password)?;
        Ok(tx)
    }

    pub fn send_transaction(
        &self,
        tx: Transaction,
        broadcaster: &dyn Broadcaster,
    ) -> Result<TransactionId, WalletError> {
        let _session = SessionGuard::enter(&self.state, SessionState::Submitting);
        submitter::send_transaction(tx, broadcaster)
    }

    /// Drop every added account and the cached outputs. The keystore and
    /// its main account are kept.
    pub fn reset(&mut self) -> Result<(), WalletError> {
        let path = self.config.address_book_path();
        remove_if_exists(&path)?;
        self.book = AddressBook::open(&path, self.keystore.public_key())?;
        self.ledger.clear();
        log::info!("Wallet data store reset");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{OutPoint, TransactionId, Utxo};
    use crate::crypto::KeyPair;
    use crate::network::NetworkError;
    use crate::wallet::KdfParams;

    struct Chain(Vec<Utxo>);

    impl ChainSource for Chain {
        fn fetch_utxos(&self, program_hash: &ProgramHash) -> Result<Vec<Utxo>, NetworkError> {
            Ok(self
                .0
                .iter()
                .filter(|u| &u.program_hash == program_hash)
                .cloned()
                .collect())
        }

        fn current_height(&self) -> Result<u32, NetworkError> {
            Ok(1)
        }
    }

    struct Offline;

    impl ChainSource for Offline {
        fn fetch_utxos(&self, _: &ProgramHash) -> Result<Vec<Utxo>, NetworkError> {
            Err(NetworkError::SourceUnavailable("offline".to_string()))
        }

        fn current_height(&self) -> Result<u32, NetworkError> {
            Err(NetworkError::SourceUnavailable("offline".to_string()))
        }
    }

    fn config(dir: &std::path::Path) -> WalletConfig {
        WalletConfig {
            data_dir: dir.to_path_buf(),
            kdf: KdfParams::low_cost(),
            ..Default::default()
        }
    }

    fn create(dir: &std::path::Path, password: &str) -> WalletHandle {
        let mut buffer = password.as_bytes().to_vec();
        Wallet::create(config(dir), &mut buffer).unwrap()
    }

    fn key_hex() -> String {
        KeyPair::generate().public_key_hex()
    }

    #[test]
    fn test_create_shows_account() {
        let temp_dir = tempfile::tempdir().unwrap();
        let mut password = b"Abc123!".to_vec();
        let handle = Wallet::create(config(temp_dir.path()), &mut password).unwrap();
        assert!(password.iter().all(|&b| b == 0));

        let mut password = b"Abc123!".to_vec();
        let info = handle.account_info(&mut password).unwrap();
        assert!(ProgramHash::from_address(&info.address).is_ok());
        assert!(info.address.starts_with('E'));
        assert_eq!(hex::decode(&info.public_key).unwrap().len(), 33);
        assert_eq!(info.program_hash.len(), 42);
        assert_eq!(handle.session_state(), SessionState::Idle);
    }

    #[test]
    fn test_open_requires_password() {
        let temp_dir = tempfile::tempdir().unwrap();
        drop(create(temp_dir.path(), "pw"));

        let mut wrong = b"nope".to_vec();
        assert!(matches!(
            Wallet::open(config(temp_dir.path()), &mut wrong),
            Err(WalletError::WrongPassword)
        ));
        let mut right = b"pw".to_vec();
        assert!(Wallet::open(config(temp_dir.path()), &mut right).is_ok());

        let empty = tempfile::tempdir().unwrap();
        let mut password = b"pw".to_vec();
        assert!(matches!(
            Wallet::open(config(empty.path()), &mut password),
            Err(WalletError::NotFound(_))
        ));
    }

    #[test]
    fn test_add_accounts_and_balances() {
        let temp_dir = tempfile::tempdir().unwrap();
        let mut handle = create(temp_dir.path(), "pw");

        let standard = handle.add_account(&key_hex(), None, &Offline).unwrap();
        let content = format!("{}, {},{}", key_hex(), key_hex(), key_hex());
        let multisig = handle.add_account(&content, Some(2), &Offline).unwrap();
        assert!(!standard.is_multisig());
        assert!(multisig.is_multisig());

        let chain = Chain(vec![Utxo {
            outpoint: OutPoint {
                tx_id: TransactionId::from_bytes([1; 32]),
                index: 0,
            },
            program_hash: multisig,
            amount: "12.5".parse().unwrap(),
            lock_height: 0,
        }]);
        let balances = handle.list_balances(&chain).unwrap();
        assert_eq!(balances.len(), 3);
        assert_eq!(balances[2].kind, "2-of-3");
        assert_eq!(balances[2].balance, "12.5".parse().unwrap());
        assert!(balances[0].balance.is_zero());

        assert!(matches!(
            handle.list_balances(&Offline),
            Err(WalletError::SourceUnavailable(_))
        ));
    }

    #[test]
    fn test_add_account_rejects_bad_keys() {
        let temp_dir = tempfile::tempdir().unwrap();
        let mut handle = create(temp_dir.path(), "pw");

        let two = format!("{},{}", key_hex(), key_hex());
        assert!(matches!(
            handle.add_account(&two, None, &Offline),
            Err(WalletError::InsufficientKeys { have: 2 })
        ));
        assert!(matches!(
            handle.add_account("abcd", None, &Offline),
            Err(WalletError::InvalidKeys(_))
        ));
        assert_eq!(handle.accounts().len(), 1);
    }

    #[test]
    fn test_change_password_then_reopen() {
        let temp_dir = tempfile::tempdir().unwrap();
        let mut handle = create(temp_dir.path(), "old");

        let mut old = b"old".to_vec();
        let mut new = b"new".to_vec();
        handle.change_password(&mut old, &mut new).unwrap();
        drop(handle);

        let mut password = b"new".to_vec();
        assert!(Wallet::open(config(temp_dir.path()), &mut password).is_ok());
    }

    #[test]
    fn test_reset_keeps_main_account() {
        let temp_dir = tempfile::tempdir().unwrap();
        let mut handle = create(temp_dir.path(), "pw");
        let main = handle.accounts()[0].program_hash;
        handle.add_account(&key_hex(), None, &Offline).unwrap();

        handle.reset().unwrap();
        assert_eq!(handle.accounts().len(), 1);
        assert_eq!(handle.accounts()[0].program_hash, main);
        assert!(Wallet::exists(handle.config()));
    }

    #[test]
    fn test_session_returns_to_idle_after_failure() {
        let temp_dir = tempfile::tempdir().unwrap();
        let handle = create(temp_dir.path(), "pw");
        let result = handle.create_transaction(&Offline, &[], &[], Amount::ZERO, None);
        assert!(result.is_err());
        assert_eq!(handle.session_state(), SessionState::Idle);
    }

    #[test]
    fn test_invalid_output_rejected_before_sync() {
        let temp_dir = tempfile::tempdir().unwrap();
        let handle = create(temp_dir.path(), "pw");
        let outputs = [OutputSpec::new("not-an-address", "1".parse().unwrap())];

        let result = handle.create_transaction(&Offline, &[], &outputs, "0.1".parse().unwrap(), None);
        assert!(matches!(result, Err(WalletError::InvalidOutput(_))));
        assert_eq!(handle.ledger().stats().refreshes, 0);
        assert_eq!(handle.ledger().stats().failed_refreshes, 0);
    }
}
