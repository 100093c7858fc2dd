//! In-memory pool of unconfirmed transactions (spec.md §3 Mempool, §4.5).
//!
//! Unlike a fee-ranked mempool, this pool has no fee market: insertion order
//! is preservation order, and the only index is dedup-by-hash.

use std::collections::HashSet;

use ember_core::Transaction;

/// Deduplicated, insertion-ordered pool of pending transactions.
#[derive(Debug, Default)]
pub struct Mempool {
    order: Vec<Transaction>,
    hashes: HashSet<String>,
}

impl Mempool {
    pub fn new() -> Self {
        Self::default()
    }

    /// True if a transaction with this hash is already pending.
    pub fn contains(&self, hash: &str) -> bool {
        self.hashes.contains(hash)
    }

    /// Insert `tx`, silently ignoring it if its hash is already present.
    ///
    /// Returns `true` if the transaction was newly added.
    pub fn insert(&mut self, tx: Transaction) -> bool {
        if self.hashes.contains(&tx.hash) {
            return false;
        }
        self.hashes.insert(tx.hash.clone());
        self.order.push(tx);
        true
    }

    /// Remove a transaction by hash, if present.
    pub fn remove(&mut self, hash: &str) -> Option<Transaction> {
        let index = self.order.iter().position(|tx| tx.hash == hash)?;
        self.hashes.remove(hash);
        Some(self.order.remove(index))
    }

    /// Iterate pending transactions in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Transaction> {
        self.order.iter()
    }

    /// Snapshot the pool contents as an owned, ordered vector.
    pub fn to_vec(&self) -> Vec<Transaction> {
        self.order.clone()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Drop every pending transaction (called after a block seals them, or
    /// after the Genesis-only special case).
    pub fn clear(&mut self) {
        self.order.clear();
        self.hashes.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tx(hash: &str) -> Transaction {
        let mut t = Transaction::new("0xa", "0xb", 1.0, 1_000);
        t.hash = hash.to_string();
        t
    }

    #[test]
    fn insert_dedups_by_hash() {
        let mut pool = Mempool::new();
        assert!(pool.insert(tx("0xsame")));
        assert!(!pool.insert(tx("0xsame")));
        assert_eq!(pool.len(), 1);
    }

    #[test]
    fn remove_drops_from_both_indices() {
        let mut pool = Mempool::new();
        pool.insert(tx("0xone"));
        assert!(pool.remove("0xone").is_some());
        assert!(!pool.contains("0xone"));
        assert!(pool.insert(tx("0xone")));
    }

    #[test]
    fn iteration_preserves_insertion_order() {
        let mut pool = Mempool::new();
        pool.insert(tx("0xa"));
        pool.insert(tx("0xb"));
        pool.insert(tx("0xc"));
        let hashes: Vec<&str> = pool.iter().map(|tx| tx.hash.as_str()).collect();
        assert_eq!(hashes, vec!["0xa", "0xb", "0xc"]);
    }

    #[test]
    fn clear_empties_pool() {
        let mut pool = Mempool::new();
        pool.insert(tx("0xa"));
        pool.clear();
        assert!(pool.is_empty());
        assert!(!pool.contains("0xa"));
    }
}
