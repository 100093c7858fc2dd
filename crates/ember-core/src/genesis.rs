//! The fixed genesis block (spec.md §3 Genesis, §6 Genesis constants).
//!
//! Unlike every other block, the genesis hash is a baked constant — it is
//! never recomputed from content, by spec.md's own design (§4.5
//! `replace_chain` step 2).

use std::sync::OnceLock;

use crate::block::Block;
use crate::constants::{GENESIS_HASH, GENESIS_NONCE, GENESIS_SENDER, GENESIS_TIMESTAMP};
use crate::transaction::Transaction;

static GENESIS: OnceLock<Block> = OnceLock::new();

fn build_genesis() -> Block {
    let tx = Transaction::new(GENESIS_SENDER, GENESIS_SENDER, 0.0, GENESIS_TIMESTAMP);
    Block {
        block_number: 0,
        timestamp: GENESIS_TIMESTAMP,
        previous_hash: "0x0".to_string(),
        hash: GENESIS_HASH.to_string(),
        nonce: GENESIS_NONCE,
        difficulty: 1,
        transactions: vec![tx],
    }
}

/// The genesis block (height 0). Its `hash` is `GENESIS_HASH` by
/// construction, not by recomputation.
pub fn genesis_block() -> &'static Block {
    GENESIS.get_or_init(build_genesis)
}

/// True if `block` is bit-for-bit the genesis block.
pub fn is_genesis(block: &Block) -> bool {
    block == genesis_block()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn genesis_is_deterministic() {
        assert_eq!(genesis_block(), genesis_block());
    }

    #[test]
    fn genesis_has_baked_hash() {
        assert_eq!(genesis_block().hash, GENESIS_HASH);
    }

    #[test]
    fn genesis_has_baked_nonce_and_timestamp() {
        assert_eq!(genesis_block().nonce, GENESIS_NONCE);
        assert_eq!(genesis_block().timestamp, GENESIS_TIMESTAMP);
    }

    #[test]
    fn genesis_previous_hash_is_0x0() {
        assert_eq!(genesis_block().previous_hash, "0x0");
    }

    #[test]
    fn genesis_has_single_sentinel_transaction() {
        let block = genesis_block();
        assert_eq!(block.transactions.len(), 1);
        assert!(block.transactions[0].is_genesis_sentinel());
    }

    #[test]
    fn genesis_passes_validate_transactions() {
        assert!(genesis_block().validate_transactions().is_ok());
    }

    #[test]
    fn is_genesis_false_for_mutated_copy() {
        let mut other = genesis_block().clone();
        other.nonce += 1;
        assert!(!is_genesis(&other));
    }
}
