//! Account-balance projection over transaction history (spec.md §4.4).

use std::collections::HashMap;

use ember_core::constants::GENESIS_SENDER;
use ember_core::{Block, Transaction};

/// Map of address to non-negative balance.
///
/// Absent addresses are balance zero by convention; [`BalanceState::get`]
/// never inserts on read.
#[derive(Debug, Default, Clone)]
pub struct BalanceState {
    balances: HashMap<String, f64>,
}

impl BalanceState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current balance of `address`, or 0.0 if never seen.
    pub fn get(&self, address: &str) -> f64 {
        self.balances.get(address).copied().unwrap_or(0.0)
    }

    /// Overwrite `address`'s balance directly (used by rebuild/load paths).
    pub fn set(&mut self, address: &str, amount: f64) {
        self.balances.insert(address.to_string(), amount);
    }

    /// Apply `tx`'s effect to the balance map.
    ///
    /// A coinbase/mint (`sender == "Genesis"`) unconditionally credits the
    /// receiver. Otherwise the sender must hold at least `tx.amount`;
    /// returns `false` without mutation on shortfall.
    pub fn apply(&mut self, tx: &Transaction) -> bool {
        if tx.sender == GENESIS_SENDER {
            if tx.receiver == GENESIS_SENDER {
                // Genesis-to-Genesis sentinel: no balance effect.
                return true;
            }
            let credited = self.get(&tx.receiver) + tx.amount;
            self.set(&tx.receiver, credited);
            return true;
        }

        let sender_balance = self.get(&tx.sender);
        if sender_balance < tx.amount {
            return false;
        }
        self.set(&tx.sender, sender_balance - tx.amount);
        let receiver_balance = self.get(&tx.receiver) + tx.amount;
        self.set(&tx.receiver, receiver_balance);
        true
    }

    /// Rebuild from scratch: zero all known balances, then replay every
    /// non-sentinel transaction in `blocks` order.
    ///
    /// Idempotent: calling twice on the same input yields the same state.
    pub fn project_from(&mut self, blocks: &[Block]) {
        self.balances.clear();
        for block in blocks {
            for tx in &block.transactions {
                if tx.is_genesis_sentinel() {
                    continue;
                }
                // Chain history is assumed already validated; a replay
                // shortfall here indicates a store/chain inconsistency.
                self.apply(tx);
            }
        }
    }

    /// Iterate all known (address, balance) pairs.
    pub fn get_all(&self) -> impl Iterator<Item = (&str, f64)> {
        self.balances.iter().map(|(addr, amount)| (addr.as_str(), *amount))
    }
}
