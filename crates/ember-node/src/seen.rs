//! Bounded in-memory dedup set for gossiped message hashes (SPEC_FULL.md
//! §2 "Peer dedup on BLOCK/TRANSACTION").
//!
//! Not persisted across restart — matches `NetworkNode.cpp`'s in-memory
//! `seen` sets. Bounded the way the teacher bounds its orphan maps
//! (`rill-node/src/node.rs`'s `MAX_ORPHAN_BLOCKS`/`MAX_ORPHAN_TXS`:
//! evict the oldest entry once the set is full, keyed by insertion time),
//! since an unbounded dedup set is a memory-exhaustion vector.

use std::collections::HashMap;
use std::time::Instant;

/// A bounded set of previously-seen hashes, used to drop a message the
/// node has already processed this lifetime without re-validating or
/// re-flooding it.
pub struct SeenSet {
    capacity: usize,
    seen: HashMap<String, Instant>,
}

impl SeenSet {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity,
            seen: HashMap::new(),
        }
    }

    pub fn contains(&self, hash: &str) -> bool {
        self.seen.contains_key(hash)
    }

    /// Record `hash` as seen. Returns `true` if it was newly inserted,
    /// `false` if it was already present (the caller's cue to drop the
    /// message). Evicts the oldest entry first if the set is at capacity.
    pub fn insert(&mut self, hash: &str) -> bool {
        if self.seen.contains_key(hash) {
            return false;
        }
        if self.seen.len() >= self.capacity {
            if let Some(oldest) = self.seen.iter().min_by_key(|(_, ts)| **ts).map(|(k, _)| k.clone()) {
                self.seen.remove(&oldest);
            }
        }
        self.seen.insert(hash.to_string(), Instant::now());
        true
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_insert_is_newly_seen() {
        let mut set = SeenSet::with_capacity(10);
        assert!(set.insert("0xabc"));
        assert!(set.contains("0xabc"));
    }

    #[test]
    fn duplicate_insert_is_rejected() {
        let mut set = SeenSet::with_capacity(10);
        assert!(set.insert("0xabc"));
        assert!(!set.insert("0xabc"));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn over_capacity_evicts_the_oldest_entry() {
        let mut set = SeenSet::with_capacity(2);
        assert!(set.insert("0xone"));
        assert!(set.insert("0xtwo"));
        assert!(set.insert("0xthree"));
        assert_eq!(set.len(), 2);
        assert!(!set.contains("0xone"), "oldest entry should have been evicted");
        assert!(set.contains("0xtwo"));
        assert!(set.contains("0xthree"));
    }
}
