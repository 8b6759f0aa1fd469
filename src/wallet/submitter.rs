//! Transaction submission

use super::signer::ensure_complete;
use super::WalletError;
use crate::core::{Transaction, TransactionId};
use crate::network::Broadcaster;

/// Check a transaction is well formed and fully signed, then hand its bytes
/// to `broadcaster` once
pub fn send_transaction(
    tx: Transaction,
    broadcaster: &dyn Broadcaster,
) -> Result<TransactionId, WalletError> {
    tx.validate()?;
    if !tx.verify_signatures() {
        return Err(WalletError::Malformed(
            "transaction carries invalid signatures".to_string(),
        ));
    }
    let signed = ensure_complete(tx)?;

    let local_id = signed.transaction().tx_id();
    log::info!("Submitting transaction {}", local_id);
    let tx_id = broadcaster.submit(&signed.to_bytes())?;
    if tx_id != local_id {
        log::warn!("Network reported id {} for transaction {}", tx_id, local_id);
    }
    Ok(tx_id)
}

/// Decode hex text and send
pub fn send_raw_transaction(
    hex_text: &str,
    broadcaster: &dyn Broadcaster,
) -> Result<TransactionId, WalletError> {
    let tx = Transaction::from_hex(hex_text.trim())?;
    send_transaction(tx, broadcaster)
}
