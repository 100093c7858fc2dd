//! Store key schema (spec.md §6 Store key schema).
//!
//! A single ordered keyspace, not per-entity column families: RocksDB's
//! default lexicographic key ordering is enough to make `block:` and
//! `tx:` prefix scans contiguous without a custom comparator.

pub fn block_key(height: u64) -> Vec<u8> {
    format!("block:{height}").into_bytes()
}

pub const BLOCK_PREFIX: &[u8] = b"block:";

pub fn tx_key(hash: &str) -> Vec<u8> {
    format!("tx:{hash}").into_bytes()
}

pub const TX_PREFIX: &[u8] = b"tx:";

pub fn balance_key(address: &str) -> Vec<u8> {
    format!("balance:{address}").into_bytes()
}

pub const BALANCE_PREFIX: &[u8] = b"balance:";

pub fn journal_key(address: &str, timestamp: u64, tx_hash: &str) -> Vec<u8> {
    format!("journal:{address}:{timestamp}:{tx_hash}").into_bytes()
}

pub fn journal_prefix_for(address: &str) -> Vec<u8> {
    format!("journal:{address}:").into_bytes()
}

pub const JOURNAL_PREFIX: &[u8] = b"journal:";

pub fn worldstate_key(block_height: u64) -> Vec<u8> {
    format!("worldstate:{block_height}").into_bytes()
}

pub const WORLDSTATE_PREFIX: &[u8] = b"worldstate:";
