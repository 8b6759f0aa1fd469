//! Transaction construction
//!
//! Everything is validated before any input is selected:
//! 1. Output addresses decode and amounts are positive
//! 2. The fee is positive and totals do not overflow
//! 3. Spend addresses belong to the wallet
//!
//! Inputs are then taken greedily from the ledger until outputs plus fee
//! are covered.

use super::address_book::AddressBook;
use super::WalletError;
use crate::core::{
    Amount, Program, ProgramHash, TxInput, TxOutput, UnsignedTransaction, SEQUENCE_FINAL,
    SEQUENCE_LOCKTIME,
};
use crate::storage::LedgerView;
use serde::{Deserialize, Serialize};

/// What happens to selected value beyond outputs plus fee
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangePolicy {
    /// Send the surplus back to the first spend address
    #[default]
    ReturnToSender,
    /// Leave the surplus to the miner
    ImplicitFee,
}

/// A requested payment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputSpec {
    pub address: String,
    pub amount: Amount,
}

impl OutputSpec {
    pub fn new(address: impl Into<String>, amount: Amount) -> Self {
        Self {
            address: address.into(),
            amount,
        }
    }
}

/// Parse multi-output content: one `address,amount` per line.
/// Blank lines and lines starting with `#` are skipped.
pub fn parse_output_content(content: &str) -> Result<Vec<OutputSpec>, WalletError> {
    let mut outputs = Vec::new();
    for (number, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let fields: Vec<&str> = line.split(',').map(str::trim).collect();
        if fields.len() != 2 {
            return Err(WalletError::InvalidOutput(format!(
                "line {}: expected address,amount",
                number + 1
            )));
        }
        let amount: Amount = fields[1].parse().map_err(|e| {
            WalletError::InvalidOutput(format!("line {}: {}", number + 1, e))
        })?;
        outputs.push(OutputSpec::new(fields[0], amount));
    }

    if outputs.is_empty() {
        return Err(WalletError::InvalidOutput("no outputs in content".to_string()));
    }
    Ok(outputs)
}

/// Builds unsigned transactions from wallet accounts and cached outputs
pub struct TransactionBuilder<'a> {
    book: &'a AddressBook,
    ledger: &'a LedgerView,
    policy: ChangePolicy,
}

impl<'a> TransactionBuilder<'a> {
    pub fn new(book: &'a AddressBook, ledger: &'a LedgerView) -> Self {
        Self {
            book,
            ledger,
            policy: ChangePolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: ChangePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Check every output row and the fee without reading the ledger.
    /// Returns the recipient outputs and the total to be funded.
    pub fn validate_outputs(
        &self,
        outputs: &[OutputSpec],
        fee: Amount,
        lock_time: u32,
    ) -> Result<(Vec<TxOutput>, Amount), WalletError> {
        if outputs.is_empty() {
            return Err(WalletError::InvalidOutput("no outputs".to_string()));
        }
        let mut recipients = Vec::with_capacity(outputs.len());
        for (row, output) in outputs.iter().enumerate() {
            let program_hash = self.book.resolve(&output.address).map_err(|_| {
                WalletError::InvalidOutput(format!(
                    "output {}: invalid address {}",
                    row + 1,
                    output.address
                ))
            })?;
            if output.amount.is_zero() {
                return Err(WalletError::InvalidOutput(format!(
                    "output {}: amount must be positive",
                    row + 1
                )));
            }
            recipients.push(TxOutput {
                program_hash,
                amount: output.amount,
                output_lock: lock_time,
            });
        }
        if fee.is_zero() {
            return Err(WalletError::InvalidOutput("fee must be positive".to_string()));
        }
        let total_output = Amount::sum(recipients.iter().map(|o| o.amount))?;
        let required = total_output.checked_add(fee)?;
        Ok((recipients, required))
    }

    /// Assemble an unsigned transaction paying `outputs` plus `fee`.
    ///
    /// `from` lists spend addresses; when empty, every wallet address with
    /// a spendable balance is a candidate. A non-zero `lock_time` locks the
    /// recipient outputs until that height.
    pub fn build(
        &self,
        from: &[String],
        outputs: &[OutputSpec],
        fee: Amount,
        lock_time: Option<u32>,
    ) -> Result<UnsignedTransaction, WalletError> {
        let lock_time = lock_time.unwrap_or(0);
        let (recipients, required) = self.validate_outputs(outputs, fee, lock_time)?;

        let candidates = self.candidates(from)?;

        // Greedy accumulation across candidate addresses
        let mut selected = Vec::new();
        let mut total = Amount::ZERO;
        for program_hash in &candidates {
            if total >= required {
                break;
            }
            let remaining = required.saturating_sub(total);
            for utxo in self.ledger.spendable_inputs(program_hash, remaining) {
                total = total.checked_add(utxo.amount)?;
                selected.push(utxo);
            }
        }

        if total < required {
            let available = Amount::sum(
                candidates
                    .iter()
                    .map(|ph| self.ledger.balance_of(ph))
                    .collect::<Result<Vec<_>, _>>()?,
            )?;
            return Err(WalletError::InsufficientFunds {
                available,
                required,
                shortfall: required.saturating_sub(available),
            });
        }

        let sequence = if lock_time > 0 {
            SEQUENCE_LOCKTIME
        } else {
            SEQUENCE_FINAL
        };
        let inputs: Vec<TxInput> = selected
            .iter()
            .map(|utxo| TxInput::from_utxo(utxo, sequence))
            .collect();

        let mut outputs = recipients;
        let surplus = total.saturating_sub(required);
        if self.policy == ChangePolicy::ReturnToSender && !surplus.is_zero() {
            outputs.push(TxOutput {
                program_hash: candidates[0],
                amount: surplus,
                output_lock: 0,
            });
        }

        let tx = UnsignedTransaction {
            programs: self.programs_for(&inputs)?,
            inputs,
            outputs,
            lock_time,
        };
        tx.validate()?;

        log::info!(
            "Built transaction {} with {} input(s), {} output(s), fee {}",
            tx.tx_id(),
            tx.inputs.len(),
            tx.outputs.len(),
            tx.fee()?
        );
        Ok(tx)
    }

    fn candidates(&self, from: &[String]) -> Result<Vec<ProgramHash>, WalletError> {
        if !from.is_empty() {
            let mut candidates = Vec::with_capacity(from.len());
            for address in from {
                let program_hash = self.book.resolve_own(address)?;
                if !candidates.contains(&program_hash) {
                    candidates.push(program_hash);
                }
            }
            return Ok(candidates);
        }

        let mut candidates = Vec::new();
        for program_hash in self.book.program_hashes() {
            if !self.ledger.balance_of(&program_hash)?.is_zero() {
                candidates.push(program_hash);
            }
        }
        if candidates.is_empty() {
            return Err(WalletError::NoSpendableAddress);
        }
        Ok(candidates)
    }

    /// One program per distinct spending address, in input order
    fn programs_for(&self, inputs: &[TxInput]) -> Result<Vec<Program>, WalletError> {
        let mut programs: Vec<Program> = Vec::new();
        for input in inputs {
            if programs
                .iter()
                .any(|p| p.program_hash() == input.program_hash)
            {
                continue;
            }
            let code = self.book.program_code(&input.program_hash).ok_or_else(|| {
                WalletError::InvalidAddress(format!(
                    "no redeem script for {}",
                    input.program_hash
                ))
            })?;
            programs.push(Program::new(code.to_vec())?);
        }
        Ok(programs)
    }
}
