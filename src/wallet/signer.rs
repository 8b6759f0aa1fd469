//! Transaction signing
//!
//! Signing is accumulative: each signer adds signatures to the programs
//! whose redeem script names its key, and passes the transaction on.
//! Completeness is only enforced when sending.

use super::keystore::KeyStore;
use super::WalletError;
use crate::core::{Signature, SignedTransaction, Transaction};
use crate::crypto::KeyPair;

/// Sign every program of `tx` that `key_pair` can sign.
/// Returns the number of signatures added; zero when all were already present.
pub fn sign_with_key(tx: &mut Transaction, key_pair: &KeyPair) -> Result<usize, WalletError> {
    tx.validate()?;
    if !tx.verify_signatures() {
        return Err(WalletError::Malformed(
            "transaction carries invalid signatures".to_string(),
        ));
    }

    let public_key = *key_pair.public_key();
    let digest = tx.signing_digest();

    let mut eligible = 0;
    let mut added = 0;
    for program in tx.programs.iter_mut().filter(|p| p.is_signer(&public_key)) {
        eligible += 1;
        if program.has_signed(&public_key) {
            continue;
        }
        let bytes = key_pair.sign(&digest)?;
        if program.insert_signature(Signature { public_key, bytes }, &digest)? {
            added += 1;
        }
    }

    if eligible == 0 {
        return Err(WalletError::NothingToSign);
    }

    for (program_hash, have, need) in tx.signature_status() {
        log::debug!("{}: {}/{} signatures", program_hash, have, need);
    }
    log::info!(
        "Added {} signature(s) to {}; complete: {}",
        added,
        tx.tx_id(),
        tx.is_complete()
    );
    Ok(added)
}

/// Unlock the keystore with `password` and sign. The password buffer is
/// wiped before this returns.
pub fn sign_transaction(
    tx: &mut Transaction,
    keystore: &KeyStore,
    password: &mut [u8],
) -> Result<usize, WalletError> {
    let key_pair = keystore.unlock(password)?;
    sign_with_key(tx, &key_pair)
}

/// Promote to a [`SignedTransaction`] or report the inputs still missing
/// signatures
pub fn ensure_complete(tx: Transaction) -> Result<SignedTransaction, WalletError> {
    SignedTransaction::try_from_transaction(tx).map_err(|(tx, inputs)| {
        let mut addresses: Vec<String> = Vec::new();
        for &index in &inputs {
            let address = tx.inputs[index].program_hash.to_address();
            if !addresses.contains(&address) {
                addresses.push(address);
            }
        }
        WalletError::IncompleteSignatureSet { inputs, addresses }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{
        Amount, OutPoint, Program, ProgramHash, TransactionId, TxInput, TxOutput, Utxo,
        SEQUENCE_FINAL,
    };
    use crate::multisig::MultisigConfig;

    fn multisig_tx(keys: &[&KeyPair], threshold: usize) -> Transaction {
        let config = MultisigConfig::new(
            Some(threshold),
            keys.iter().map(|k| *k.public_key()).collect(),
        )
        .unwrap();
        let code = config.redeem_script().unwrap();
        let owner = config.program_hash().unwrap();

        let utxo = Utxo {
            outpoint: OutPoint {
                tx_id: TransactionId::from_bytes([7; 32]),
                index: 1,
            },
            program_hash: owner,
            amount: Amount::from_units(500).unwrap(),
            lock_height: 0,
        };
        Transaction {
            inputs: vec![TxInput::from_utxo(&utxo, SEQUENCE_FINAL)],
            outputs: vec![TxOutput {
                program_hash: ProgramHash::from_bytes([0x21; 21]),
                amount: Amount::from_units(400).unwrap(),
                output_lock: 0,
            }],
            lock_time: 0,
            programs: vec![Program::new(code).unwrap()],
        }
    }

    #[test]
    fn test_signing_is_idempotent() {
        let (a, b, c) = (KeyPair::generate(), KeyPair::generate(), KeyPair::generate());
        let mut tx = multisig_tx(&[&a, &b, &c], 2);

        assert_eq!(sign_with_key(&mut tx, &a).unwrap(), 1);
        let once = tx.clone();
        assert_eq!(sign_with_key(&mut tx, &a).unwrap(), 0);
        assert_eq!(tx, once);
        assert_eq!(tx.programs[0].signatures().len(), 1);
    }

    #[test]
    fn test_threshold_completion() {
        let (a, b, c) = (KeyPair::generate(), KeyPair::generate(), KeyPair::generate());
        let mut tx = multisig_tx(&[&a, &b, &c], 2);

        sign_with_key(&mut tx, &c).unwrap();
        match ensure_complete(tx.clone()) {
            Err(WalletError::IncompleteSignatureSet { inputs, addresses }) => {
                assert_eq!(inputs, vec![0]);
                assert_eq!(addresses.len(), 1);
                assert!(addresses[0].starts_with('8'));
            }
            other => panic!("unexpected result: {:?}", other.map(|_| ())),
        }

        sign_with_key(&mut tx, &a).unwrap();
        assert!(ensure_complete(tx).is_ok());
    }

    #[test]
    fn test_signer_order_commutes() {
        let (a, b, c) = (KeyPair::generate(), KeyPair::generate(), KeyPair::generate());
        let base = multisig_tx(&[&a, &b, &c], 3);

        let mut forward = base.clone();
        for key in [&a, &b, &c] {
            sign_with_key(&mut forward, key).unwrap();
        }
        let mut backward = base;
        for key in [&c, &b, &a] {
            sign_with_key(&mut backward, key).unwrap();
        }
        assert_eq!(forward.to_bytes(), backward.to_bytes());
    }

    #[test]
    fn test_outsider_has_nothing_to_sign() {
        let (a, b, c) = (KeyPair::generate(), KeyPair::generate(), KeyPair::generate());
        let mut tx = multisig_tx(&[&a, &b, &c], 2);
        assert!(matches!(
            sign_with_key(&mut tx, &KeyPair::generate()),
            Err(WalletError::NothingToSign)
        ));
    }
}
