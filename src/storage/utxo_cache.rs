//! Ledger view over unspent outputs
//!
//! Read-mostly cache of the UTXOs owned by wallet addresses:
//! - Keyed by program hash, replaced wholesale on refresh
//! - Shared reads, exclusive refresh
//! - Outputs locked above the recorded chain height are not spendable

use crate::core::{Amount, AmountError, ProgramHash, Utxo};
use crate::network::{ChainSource, NetworkError};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

// =============================================================================
// Cache Statistics
// =============================================================================

/// Refresh and lookup counters
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub refreshes: u64,
    pub failed_refreshes: u64,
    pub hits: u64,
    pub misses: u64,
}

impl CacheStats {
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

#[derive(Debug, Default)]
struct Counters {
    refreshes: AtomicU64,
    failed_refreshes: AtomicU64,
    hits: AtomicU64,
    misses: AtomicU64,
}

#[derive(Debug, Default)]
struct LedgerState {
    entries: HashMap<ProgramHash, Vec<Utxo>>,
    height: u32,
}

impl LedgerState {
    fn spendable<'a>(&'a self, program_hash: &ProgramHash) -> impl Iterator<Item = &'a Utxo> {
        let height = self.height;
        self.entries
            .get(program_hash)
            .into_iter()
            .flatten()
            .filter(move |u| u.lock_height <= height)
    }
}

// =============================================================================
// Ledger View
// =============================================================================

/// Cache of unspent outputs per address
#[derive(Debug, Default)]
pub struct LedgerView {
    state: RwLock<LedgerState>,
    counters: Counters,
}

impl LedgerView {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, LedgerState> {
        self.state.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, LedgerState> {
        self.state.write().unwrap_or_else(|e| e.into_inner())
    }

    fn record_lookup(&self, state: &LedgerState, program_hash: &ProgramHash) {
        let counter = if state.entries.contains_key(program_hash) {
            &self.counters.hits
        } else {
            &self.counters.misses
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Fetch the current outputs of `addresses` and replace their entries.
    ///
    /// Everything is fetched before anything is committed, so a failing
    /// source leaves the cache as it was.
    pub fn refresh(
        &self,
        source: &dyn ChainSource,
        addresses: &[ProgramHash],
    ) -> Result<(), NetworkError> {
        let fetched = match Self::fetch_all(source, addresses) {
            Ok(fetched) => fetched,
            Err(e) => {
                self.counters.failed_refreshes.fetch_add(1, Ordering::Relaxed);
                log::warn!("Ledger refresh failed: {}", e);
                return Err(e);
            }
        };

        let (height, fetched) = fetched;
        let mut state = self.write();
        state.height = height;
        for (program_hash, utxos) in fetched {
            state.entries.insert(program_hash, utxos);
        }
        drop(state);

        self.counters.refreshes.fetch_add(1, Ordering::Relaxed);
        log::info!(
            "Ledger refreshed at height {} for {} address(es)",
            height,
            addresses.len()
        );
        Ok(())
    }

    fn fetch_all(
        source: &dyn ChainSource,
        addresses: &[ProgramHash],
    ) -> Result<(u32, Vec<(ProgramHash, Vec<Utxo>)>), NetworkError> {
        let height = source.current_height()?;
        let mut fetched = Vec::with_capacity(addresses.len());
        for program_hash in addresses {
            let mut utxos = source.fetch_utxos(program_hash)?;
            utxos.retain(|u| &u.program_hash == program_hash);
            log::debug!("{} has {} unspent outputs", program_hash, utxos.len());
            fetched.push((*program_hash, utxos));
        }
        Ok((height, fetched))
    }

    /// Sum of spendable outputs owned by `program_hash`
    pub fn balance_of(&self, program_hash: &ProgramHash) -> Result<Amount, AmountError> {
        let state = self.read();
        self.record_lookup(&state, program_hash);
        Amount::sum(state.spendable(program_hash).map(|u| u.amount))
    }

    /// Sum of outputs owned by `program_hash` that are still time locked
    pub fn locked_balance_of(&self, program_hash: &ProgramHash) -> Result<Amount, AmountError> {
        let state = self.read();
        let height = state.height;
        Amount::sum(
            state
                .entries
                .get(program_hash)
                .into_iter()
                .flatten()
                .filter(|u| u.lock_height > height)
                .map(|u| u.amount),
        )
    }

    /// Spendable outputs, largest first then by outpoint, taken until their
    /// total reaches `min_amount`. A zero `min_amount` returns them all.
    pub fn spendable_inputs(&self, program_hash: &ProgramHash, min_amount: Amount) -> Vec<Utxo> {
        let state = self.read();
        self.record_lookup(&state, program_hash);

        let mut candidates: Vec<&Utxo> = state.spendable(program_hash).collect();
        candidates.sort_by(|a, b| {
            b.amount
                .cmp(&a.amount)
                .then_with(|| a.outpoint.cmp(&b.outpoint))
        });

        if min_amount.is_zero() {
            return candidates.into_iter().cloned().collect();
        }

        let mut selected = Vec::new();
        let mut total = Amount::ZERO;
        for utxo in candidates {
            if total >= min_amount {
                break;
            }
            // Saturate: once past i64::MAX the target is certainly reached
            total = total.checked_add(utxo.amount).unwrap_or(min_amount);
            selected.push(utxo.clone());
        }
        selected
    }

    /// Every cached output of `program_hash`, locked ones included
    pub fn utxos(&self, program_hash: &ProgramHash) -> Vec<Utxo> {
        self.read()
            .entries
            .get(program_hash)
            .cloned()
            .unwrap_or_default()
    }

    /// Chain height recorded by the last refresh
    pub fn height(&self) -> u32 {
        self.read().height
    }

    pub fn contains(&self, program_hash: &ProgramHash) -> bool {
        self.read().entries.contains_key(program_hash)
    }

    pub fn clear(&self) {
        let mut state = self.write();
        state.entries.clear();
        state.height = 0;
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            refreshes: self.counters.refreshes.load(Ordering::Relaxed),
            failed_refreshes: self.counters.failed_refreshes.load(Ordering::Relaxed),
            hits: self.counters.hits.load(Ordering::Relaxed),
            misses: self.counters.misses.load(Ordering::Relaxed),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
