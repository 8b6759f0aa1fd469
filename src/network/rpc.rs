//! JSON-RPC client for chain data and broadcast
//!
//! Talks to a node's HTTP JSON-RPC endpoint with a bounded timeout:
//! - `listunspent` for the outputs of an address
//! - `getblockcount` for the chain height
//! - `sendrawtransaction` to broadcast hex-encoded bytes

use super::{Broadcaster, ChainSource, NetworkError};
use crate::core::{Amount, OutPoint, ProgramHash, TransactionId, Utxo};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;

/// Default JSON-RPC endpoint of a local node
pub const DEFAULT_RPC_URL: &str = "http://127.0.0.1:20336";

/// Default request timeout in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// RPC client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RpcConfig {
    pub url: String,
    pub timeout_secs: u64,
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_RPC_URL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Value,
    #[serde(default)]
    error: Option<RpcErrorBody>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorBody {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    message: String,
}

/// One entry of a `listunspent` result
#[derive(Debug, Deserialize)]
struct UnspentEntry {
    txid: String,
    vout: u16,
    address: String,
    amount: String,
    #[serde(default, rename = "outputlock")]
    output_lock: u32,
}

/// Blocking JSON-RPC client
pub struct RpcClient {
    config: RpcConfig,
    client: reqwest::blocking::Client,
}

impl RpcClient {
    pub fn new(config: RpcConfig) -> Result<Self, NetworkError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| {
                NetworkError::SourceUnavailable(format!("Failed to create HTTP client: {}", e))
            })?;
        Ok(Self { config, client })
    }

    pub fn url(&self) -> &str {
        &self.config.url
    }

    /// Issue one call. Transport failures and RPC-level errors are both
    /// returned as text for the caller to classify.
    fn call(&self, method: &str, params: Value) -> Result<Value, String> {
        log::debug!("RPC {} -> {}", method, self.config.url);

        let body = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": method,
            "params": params,
        });

        let response = self
            .client
            .post(&self.config.url)
            .json(&body)
            .send()
            .map_err(|e| format!("{} request failed: {}", method, e))?;

        let status = response.status();
        if !status.is_success() {
            let text = response
                .text()
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(format!("{} failed with status {}: {}", method, status, text));
        }

        let response: RpcResponse = response
            .json()
            .map_err(|e| format!("{} returned invalid JSON: {}", method, e))?;
        if let Some(error) = response.error {
            return Err(format!("{} error {}: {}", method, error.code, error.message));
        }
        Ok(response.result)
    }
}

/// Convert a `listunspent` result into UTXOs owned by `owner`
fn parse_unspent(result: Value, owner: &ProgramHash) -> Result<Vec<Utxo>, String> {
    if result.is_null() {
        return Ok(Vec::new());
    }
    let entries: Vec<UnspentEntry> =
        serde_json::from_value(result).map_err(|e| format!("bad listunspent result: {}", e))?;

    let mut utxos = Vec::with_capacity(entries.len());
    for entry in entries {
        let program_hash = ProgramHash::from_address(&entry.address).map_err(|e| e.to_string())?;
        if &program_hash != owner {
            log::warn!(
                "Ignoring output {}:{} for {} in result for {}",
                entry.txid,
                entry.vout,
                entry.address,
                owner
            );
            continue;
        }
        let tx_id: TransactionId = entry.txid.parse().map_err(|e| format!("{}", e))?;
        let amount: Amount = entry.amount.parse().map_err(|e| format!("{}", e))?;
        utxos.push(Utxo {
            outpoint: OutPoint {
                tx_id,
                index: entry.vout,
            },
            program_hash,
            amount,
            lock_height: entry.output_lock,
        });
    }
    Ok(utxos)
}

impl ChainSource for RpcClient {
    fn fetch_utxos(&self, program_hash: &ProgramHash) -> Result<Vec<Utxo>, NetworkError> {
        let result = self
            .call(
                "listunspent",
                json!({ "addresses": [program_hash.to_address()] }),
            )
            .map_err(NetworkError::SourceUnavailable)?;
        parse_unspent(result, program_hash).map_err(NetworkError::SourceUnavailable)
    }

    fn current_height(&self) -> Result<u32, NetworkError> {
        let result = self
            .call("getblockcount", json!({}))
            .map_err(NetworkError::SourceUnavailable)?;
        let count = result
            .as_u64()
            .ok_or_else(|| NetworkError::SourceUnavailable(format!("bad block count {}", result)))?;
        Ok(count.saturating_sub(1).min(u32::MAX as u64) as u32)
    }
}

impl Broadcaster for RpcClient {
    fn submit(&self, bytes: &[u8]) -> Result<TransactionId, NetworkError> {
        let result = self
            .call("sendrawtransaction", json!({ "data": hex::encode(bytes) }))
            .map_err(NetworkError::RejectedByNetwork)?;
        let text = result.as_str().ok_or_else(|| {
            NetworkError::RejectedByNetwork(format!("unexpected response {}", result))
        })?;
        text.parse()
            .map_err(|e| NetworkError::RejectedByNetwork(format!("{}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{standard_code, PREFIX_STANDARD};
    use crate::crypto::KeyPair;

    fn owner() -> ProgramHash {
        ProgramHash::from_code(PREFIX_STANDARD, &standard_code(KeyPair::generate().public_key()))
    }

    #[test]
    fn test_parse_unspent() {
        let owner = owner();
        let other = self::owner();
        let txid = "11".repeat(32);
        let result = json!([
            { "txid": txid, "vout": 1, "address": owner.to_address(), "amount": "1.5" },
            { "txid": txid, "vout": 2, "address": other.to_address(), "amount": "2" },
            { "txid": txid, "vout": 3, "address": owner.to_address(), "amount": "0.25", "outputlock": 900 },
        ]);

        let utxos = parse_unspent(result, &owner).unwrap();
        assert_eq!(utxos.len(), 2);
        assert_eq!(utxos[0].amount.units(), 150_000_000);
        assert_eq!(utxos[0].outpoint.index, 1);
        assert_eq!(utxos[1].lock_height, 900);
    }

    #[test]
    fn test_parse_unspent_null_is_empty() {
        assert!(parse_unspent(Value::Null, &owner()).unwrap().is_empty());
    }

    #[test]
    fn test_parse_unspent_rejects_bad_amount() {
        let owner = owner();
        let result = json!([
            { "txid": "11".repeat(32), "vout": 0, "address": owner.to_address(), "amount": "-3" },
        ]);
        assert!(parse_unspent(result, &owner).is_err());
    }

    #[test]
    fn test_unreachable_node_is_source_unavailable() {
        let client = RpcClient::new(RpcConfig {
            url: "http://127.0.0.1:1".to_string(),
            timeout_secs: 2,
        })
        .unwrap();

        assert!(matches!(
            client.current_height(),
            Err(NetworkError::SourceUnavailable(_))
        ));
        assert!(matches!(
            client.submit(&[0x02]),
            Err(NetworkError::RejectedByNetwork(_))
        ));
    }
}
