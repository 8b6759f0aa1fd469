//! Encrypted key storage
//!
//! The private key is encrypted with ChaCha20-Poly1305 under a key derived
//! from the password with Argon2id. The file also keeps SHA-256 of the
//! derived key, which tells a wrong password apart from a damaged file,
//! and the public key and address in clear for display.

use super::password::PasswordGuard;
use super::WalletError;
use crate::core::{standard_code, ProgramHash, PREFIX_STANDARD};
use crate::crypto::{public_key_from_hex, sha256, KeyPair};
use crate::storage::{load_json, remove_if_exists, save_json};
use argon2::{Algorithm, Argon2, Params, Version};
use chacha20poly1305::aead::{Aead, KeyInit};
use chacha20poly1305::{ChaCha20Poly1305, Key, Nonce};
use chrono::{DateTime, Utc};
use rand::rngs::OsRng;
use rand::RngCore;
use secp256k1::PublicKey;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use zeroize::Zeroizing;

/// Current keystore file format version
pub const KEYSTORE_VERSION: u32 = 1;

const SALT_LENGTH: usize = 16;
const NONCE_LENGTH: usize = 12;
const DERIVED_KEY_LENGTH: usize = 32;

/// Argon2id cost parameters, stored alongside the ciphertext
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KdfParams {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl Default for KdfParams {
    fn default() -> Self {
        Self {
            memory_kib: 64 * 1024,
            iterations: 3,
            parallelism: 4,
        }
    }
}

impl KdfParams {
    /// Minimal cost; only suitable for tests
    pub fn low_cost() -> Self {
        Self {
            memory_kib: 64,
            iterations: 1,
            parallelism: 1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct KdfSection {
    algorithm: String,
    #[serde(flatten)]
    params: KdfParams,
    salt: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CipherSection {
    algorithm: String,
    nonce: String,
    ciphertext: String,
}

/// On-disk keystore layout
#[derive(Debug, Clone, Serialize, Deserialize)]
struct KeyStoreFile {
    version: u32,
    kdf: KdfSection,
    cipher: CipherSection,
    password_hash: String,
    public_key: String,
    program_hash: ProgramHash,
    created_at: DateTime<Utc>,
}

/// Password-protected private key file
#[derive(Debug)]
pub struct KeyStore {
    path: PathBuf,
    file: KeyStoreFile,
    public_key: PublicKey,
}

fn derive_key(
    password: &[u8],
    salt: &[u8],
    params: &KdfParams,
) -> Result<Zeroizing<[u8; DERIVED_KEY_LENGTH]>, WalletError> {
    let params = Params::new(
        params.memory_kib,
        params.iterations,
        params.parallelism,
        Some(DERIVED_KEY_LENGTH),
    )
    .map_err(|e| WalletError::Corrupt(format!("invalid KDF parameters: {}", e)))?;

    let mut key = Zeroizing::new([0u8; DERIVED_KEY_LENGTH]);
    Argon2::new(Algorithm::Argon2id, Version::V0x13, params)
        .hash_password_into(password, salt, key.as_mut())
        .map_err(|e| WalletError::Corrupt(format!("key derivation failed: {}", e)))?;
    Ok(key)
}

fn decode_hex(field: &str, value: &str) -> Result<Vec<u8>, WalletError> {
    hex::decode(value).map_err(|_| WalletError::Corrupt(format!("{} is not hex", field)))
}

fn random_bytes<const N: usize>() -> [u8; N] {
    let mut bytes = [0u8; N];
    OsRng.fill_bytes(&mut bytes);
    bytes
}

fn seal(
    secret: &[u8],
    password: &[u8],
    params: KdfParams,
) -> Result<(KdfSection, CipherSection, String), WalletError> {
    let salt: [u8; SALT_LENGTH] = random_bytes();
    let nonce: [u8; NONCE_LENGTH] = random_bytes();
    let key = derive_key(password, &salt, &params)?;

    let cipher = ChaCha20Poly1305::new(Key::from_slice(key.as_ref()));
    let ciphertext = cipher
        .encrypt(Nonce::from_slice(&nonce), secret)
        .map_err(|_| WalletError::Corrupt("encryption failed".to_string()))?;

    Ok((
        KdfSection {
            algorithm: "argon2id".to_string(),
            params,
            salt: hex::encode(salt),
        },
        CipherSection {
            algorithm: "chacha20poly1305".to_string(),
            nonce: hex::encode(nonce),
            ciphertext: hex::encode(ciphertext),
        },
        hex::encode(sha256(key.as_ref())),
    ))
}

impl KeyStore {
    pub fn exists(path: &Path) -> bool {
        path.is_file()
    }

    /// Generate a key pair and write it encrypted under `password`.
    /// Fails if a keystore already exists at `path`.
    pub fn create(
        path: &Path,
        password: &mut [u8],
        params: KdfParams,
    ) -> Result<(Self, KeyPair), WalletError> {
        let password = PasswordGuard::new(password);
        if Self::exists(path) {
            return Err(WalletError::AlreadyExists(path.to_path_buf()));
        }

        let key_pair = KeyPair::generate();
        let secret = Zeroizing::new(key_pair.secret_bytes());
        let (kdf, cipher, password_hash) = seal(secret.as_ref(), password.as_bytes(), params)?;

        let public_key = *key_pair.public_key();
        let program_hash = ProgramHash::from_code(PREFIX_STANDARD, &standard_code(&public_key));
        let file = KeyStoreFile {
            version: KEYSTORE_VERSION,
            kdf,
            cipher,
            password_hash,
            public_key: key_pair.public_key_hex(),
            program_hash,
            created_at: Utc::now(),
        };
        save_json(path, &file)?;
        log::info!("Created keystore for {} at {:?}", program_hash, path);

        Ok((
            Self {
                path: path.to_path_buf(),
                file,
                public_key,
            },
            key_pair,
        ))
    }

    /// Read the keystore file without decrypting anything
    pub fn load(path: &Path) -> Result<Self, WalletError> {
        let file: KeyStoreFile = load_json(path).map_err(|e| match e {
            crate::storage::StorageError::SerializationError(e) => {
                WalletError::Corrupt(format!("unreadable keystore: {}", e))
            }
            other => other.into(),
        })?;
        if file.version != KEYSTORE_VERSION {
            return Err(WalletError::Corrupt(format!(
                "unsupported keystore version {}",
                file.version
            )));
        }

        let public_key = public_key_from_hex(&file.public_key)
            .map_err(|e| WalletError::Corrupt(format!("bad public key: {}", e)))?;
        let expected = ProgramHash::from_code(PREFIX_STANDARD, &standard_code(&public_key));
        if expected != file.program_hash {
            return Err(WalletError::Corrupt(
                "program hash does not match public key".to_string(),
            ));
        }

        Ok(Self {
            path: path.to_path_buf(),
            file,
            public_key,
        })
    }

    /// Load and decrypt in one step
    pub fn open(path: &Path, password: &mut [u8]) -> Result<(Self, KeyPair), WalletError> {
        let password = PasswordGuard::new(password);
        let keystore = Self::load(path)?;
        let key_pair = keystore.decrypt(password.as_bytes())?;
        Ok((keystore, key_pair))
    }

    fn derive(&self, password: &[u8]) -> Result<Zeroizing<[u8; DERIVED_KEY_LENGTH]>, WalletError> {
        let salt = decode_hex("salt", &self.file.kdf.salt)?;
        let key = derive_key(password, &salt, &self.file.kdf.params)?;
        if hex::encode(sha256(key.as_ref())) != self.file.password_hash {
            return Err(WalletError::WrongPassword);
        }
        Ok(key)
    }

    fn decrypt(&self, password: &[u8]) -> Result<KeyPair, WalletError> {
        let key = self.derive(password)?;
        let nonce = decode_hex("nonce", &self.file.cipher.nonce)?;
        if nonce.len() != NONCE_LENGTH {
            return Err(WalletError::Corrupt("bad nonce length".to_string()));
        }
        let ciphertext = decode_hex("ciphertext", &self.file.cipher.ciphertext)?;

        let cipher = ChaCha20Poly1305::new(Key::from_slice(key.as_ref()));
        let secret = Zeroizing::new(
            cipher
                .decrypt(Nonce::from_slice(&nonce), ciphertext.as_slice())
                .map_err(|_| WalletError::Corrupt("ciphertext failed authentication".to_string()))?,
        );

        let key_pair = KeyPair::from_secret_bytes(&secret)
            .map_err(|_| WalletError::Corrupt("decrypted key is invalid".to_string()))?;
        if key_pair.public_key() != &self.public_key {
            return Err(WalletError::Corrupt(
                "decrypted key does not match stored public key".to_string(),
            ));
        }
        Ok(key_pair)
    }

    /// Decrypt the key pair
    pub fn unlock(&self, password: &mut [u8]) -> Result<KeyPair, WalletError> {
        let password = PasswordGuard::new(password);
        self.decrypt(password.as_bytes())
    }

    pub fn verify_password(&self, password: &mut [u8]) -> Result<(), WalletError> {
        let password = PasswordGuard::new(password);
        self.derive(password.as_bytes()).map(|_| ())
    }

    /// Re-encrypt under `new` with fresh salt and nonce. The old file stays
    /// in place until the new one is fully written.
    pub fn change_password(&mut self, old: &mut [u8], new: &mut [u8]) -> Result<(), WalletError> {
        let old = PasswordGuard::new(old);
        let new = PasswordGuard::new(new);

        let key_pair = self.decrypt(old.as_bytes())?;
        let secret = Zeroizing::new(key_pair.secret_bytes());
        let (kdf, cipher, password_hash) =
            seal(secret.as_ref(), new.as_bytes(), self.file.kdf.params)?;

        let mut file = self.file.clone();
        file.kdf = kdf;
        file.cipher = cipher;
        file.password_hash = password_hash;
        save_json(&self.path, &file)?;
        self.file = file;

        log::info!("Keystore password changed");
        Ok(())
    }

    /// Remove the keystore file
    pub fn delete(self) -> Result<(), WalletError> {
        remove_if_exists(&self.path)?;
        log::info!("Deleted keystore at {:?}", self.path);
        Ok(())
    }

    pub fn public_key(&self) -> &PublicKey {
        &self.public_key
    }

    pub fn program_hash(&self) -> ProgramHash {
        self.file.program_hash
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.file.created_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn zeroed(bytes: &[u8]) -> bool {
        bytes.iter().all(|&b| b == 0)
    }

    fn create(dir: &Path, password: &str) -> (KeyStore, KeyPair) {
        let mut buffer = password.as_bytes().to_vec();
        KeyStore::create(&dir.join("keystore.json"), &mut buffer, KdfParams::low_cost()).unwrap()
    }

    #[test]
    fn test_create_and_open() {
        let temp_dir = tempfile::tempdir().unwrap();
        let (keystore, key_pair) = create(temp_dir.path(), "Abc123!");

        let mut password = b"Abc123!".to_vec();
        let (reopened, unlocked) = KeyStore::open(keystore.path(), &mut password).unwrap();
        assert_eq!(unlocked.public_key(), key_pair.public_key());
        assert_eq!(reopened.program_hash(), keystore.program_hash());
        assert!(reopened.program_hash().to_address().starts_with('E'));
        assert_eq!(reopened.public_key().serialize().len(), 33);
    }

    #[test]
    fn test_wrong_password() {
        let temp_dir = tempfile::tempdir().unwrap();
        let (keystore, _) = create(temp_dir.path(), "right");

        let mut password = b"wrong".to_vec();
        assert!(matches!(
            keystore.unlock(&mut password),
            Err(WalletError::WrongPassword)
        ));
        let mut password = b"wrong".to_vec();
        assert!(matches!(
            keystore.verify_password(&mut password),
            Err(WalletError::WrongPassword)
        ));
    }

    #[test]
    fn test_password_wiped_after_success_and_failure() {
        let temp_dir = tempfile::tempdir().unwrap();
        let (mut keystore, _) = create(temp_dir.path(), "pw");

        let mut good = b"pw".to_vec();
        keystore.unlock(&mut good).unwrap();
        assert!(zeroed(&good));

        let mut bad = b"nope".to_vec();
        assert!(keystore.verify_password(&mut bad).is_err());
        assert!(zeroed(&bad));

        let mut old = b"pw".to_vec();
        let mut new = b"pw2".to_vec();
        keystore.change_password(&mut old, &mut new).unwrap();
        assert!(zeroed(&old) && zeroed(&new));

        let mut missing = b"pw".to_vec();
        assert!(KeyStore::open(&temp_dir.path().join("absent.json"), &mut missing).is_err());
        assert!(zeroed(&missing));
    }

    #[test]
    fn test_change_password() {
        let temp_dir = tempfile::tempdir().unwrap();
        let (mut keystore, key_pair) = create(temp_dir.path(), "old");

        let mut old = b"old".to_vec();
        let mut new = b"new".to_vec();
        keystore.change_password(&mut old, &mut new).unwrap();

        let mut password = b"old".to_vec();
        assert!(matches!(
            KeyStore::open(keystore.path(), &mut password),
            Err(WalletError::WrongPassword)
        ));
        let mut password = b"new".to_vec();
        let (_, unlocked) = KeyStore::open(keystore.path(), &mut password).unwrap();
        assert_eq!(unlocked.public_key(), key_pair.public_key());
    }

    #[test]
    fn test_change_password_rejects_wrong_old() {
        let temp_dir = tempfile::tempdir().unwrap();
        let (mut keystore, _) = create(temp_dir.path(), "old");

        let mut old = b"guess".to_vec();
        let mut new = b"new".to_vec();
        assert!(matches!(
            keystore.change_password(&mut old, &mut new),
            Err(WalletError::WrongPassword)
        ));

        let mut password = b"old".to_vec();
        assert!(KeyStore::open(keystore.path(), &mut password).is_ok());
    }

    #[test]
    fn test_tampered_ciphertext_is_corrupt() {
        let temp_dir = tempfile::tempdir().unwrap();
        let (keystore, _) = create(temp_dir.path(), "pw");

        let mut json: serde_json::Value =
            serde_json::from_slice(&std::fs::read(keystore.path()).unwrap()).unwrap();
        let ciphertext = json["cipher"]["ciphertext"].as_str().unwrap().to_string();
        let flipped = if ciphertext.starts_with('0') { "1" } else { "0" };
        json["cipher"]["ciphertext"] =
            serde_json::Value::String(format!("{}{}", flipped, &ciphertext[1..]));
        std::fs::write(keystore.path(), serde_json::to_vec(&json).unwrap()).unwrap();

        let mut password = b"pw".to_vec();
        assert!(matches!(
            KeyStore::open(keystore.path(), &mut password),
            Err(WalletError::Corrupt(_))
        ));
    }

    #[test]
    fn test_missing_and_existing() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("keystore.json");
        assert!(matches!(KeyStore::load(&path), Err(WalletError::NotFound(_))));

        let (keystore, _) = create(temp_dir.path(), "pw");
        let mut again = b"pw".to_vec();
        assert!(matches!(
            KeyStore::create(&path, &mut again, KdfParams::low_cost()),
            Err(WalletError::AlreadyExists(_))
        ));

        keystore.delete().unwrap();
        assert!(!KeyStore::exists(&path));
    }
}
