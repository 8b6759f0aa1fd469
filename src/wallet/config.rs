//! Wallet configuration
//!
//! Defaults can be overridden by `config.toml` in the data directory,
//! and the binary's flags override both.

use super::builder::ChangePolicy;
use super::keystore::KdfParams;
use super::WalletError;
use crate::network::RpcConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Default data directory
pub const DEFAULT_DATA_DIR: &str = ".ela_wallet";

pub const CONFIG_FILE: &str = "config.toml";
pub const KEYSTORE_FILE: &str = "keystore.json";
pub const ADDRESS_BOOK_FILE: &str = "addresses.json";

/// Wallet configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WalletConfig {
    /// Directory holding the keystore and address book
    pub data_dir: PathBuf,
    /// Node endpoint for chain data and broadcast
    pub rpc: RpcConfig,
    /// Cost parameters for newly written keystores
    pub kdf: KdfParams,
    pub change_policy: ChangePolicy,
}

impl Default for WalletConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            rpc: RpcConfig::default(),
            kdf: KdfParams::default(),
            change_policy: ChangePolicy::default(),
        }
    }
}

impl WalletConfig {
    /// Defaults for `data_dir`, with `config.toml` applied if present
    pub fn load(data_dir: &Path) -> Result<Self, WalletError> {
        let path = data_dir.join(CONFIG_FILE);
        let mut config = match fs::read_to_string(&path) {
            Ok(text) => toml::from_str::<WalletConfig>(&text)
                .map_err(|e| WalletError::Config(format!("{:?}: {}", path, e)))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => WalletConfig::default(),
            Err(e) => return Err(e.into()),
        };
        config.data_dir = data_dir.to_path_buf();
        log::debug!("Loaded config for {:?}", data_dir);
        Ok(config)
    }

    pub fn keystore_path(&self) -> PathBuf {
        self.data_dir.join(KEYSTORE_FILE)
    }

    pub fn address_book_path(&self) -> PathBuf {
        self.data_dir.join(ADDRESS_BOOK_FILE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_without_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let config = WalletConfig::load(temp_dir.path()).unwrap();

        assert_eq!(config.data_dir, temp_dir.path());
        assert_eq!(config.rpc.url, "http://127.0.0.1:20336");
        assert_eq!(config.rpc.timeout_secs, 30);
        assert_eq!(config.kdf, KdfParams::default());
        assert_eq!(config.change_policy, ChangePolicy::ReturnToSender);
        assert_eq!(config.keystore_path(), temp_dir.path().join("keystore.json"));
    }

    #[test]
    fn test_partial_file_overrides() {
        let temp_dir = tempfile::tempdir().unwrap();
        fs::write(
            temp_dir.path().join(CONFIG_FILE),
            "change_policy = \"implicit_fee\"\n\n[rpc]\nurl = \"http://node:20336\"\n",
        )
        .unwrap();

        let config = WalletConfig::load(temp_dir.path()).unwrap();
        assert_eq!(config.rpc.url, "http://node:20336");
        assert_eq!(config.rpc.timeout_secs, 30);
        assert_eq!(config.change_policy, ChangePolicy::ImplicitFee);
    }

    #[test]
    fn test_invalid_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        fs::write(temp_dir.path().join(CONFIG_FILE), "rpc = 5").unwrap();
        assert!(matches!(
            WalletConfig::load(temp_dir.path()),
            Err(WalletError::Config(_))
        ));
    }
}
