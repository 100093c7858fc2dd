//! Block model: header + transaction list, PoW mining, and validation
//! (spec.md §3, §4.3).

use ember_crypto::{sha256, Hash256};
use tracing::debug;

use crate::constants::{clamp_difficulty, GENESIS_SENDER};
use crate::error::BlockError;
use crate::fmt_util::{fmt_amount, fmt_u64};
use crate::transaction::Transaction;

/// A block: header fields plus an ordered transaction list.
#[derive(Clone, Debug, PartialEq)]
pub struct Block {
    pub block_number: u64,
    pub timestamp: u64,
    pub previous_hash: String,
    pub hash: String,
    pub nonce: u64,
    pub difficulty: u8,
    pub transactions: Vec<Transaction>,
}

impl Block {
    /// Construct a candidate block, ready for [`Block::mine`].
    ///
    /// `hash` starts empty and `nonce` at 0; both are set by mining.
    pub fn new_candidate(
        block_number: u64,
        timestamp: u64,
        previous_hash: impl Into<String>,
        difficulty: u8,
        transactions: Vec<Transaction>,
    ) -> Self {
        Self {
            block_number,
            timestamp,
            previous_hash: previous_hash.into(),
            hash: String::new(),
            nonce: 0,
            difficulty: clamp_difficulty(difficulty),
            transactions,
        }
    }

    /// Build the literal canonical hash-input concatenation (spec.md §6):
    /// `fmt(blockNumber) || fmt(timestamp) || previousHash || fmt(nonce)`
    /// followed by `sender || receiver || fmt(amount)` for every transaction
    /// in order.
    fn canonical_input(&self) -> String {
        let mut s = format!(
            "{}{}{}{}",
            fmt_u64(self.block_number),
            fmt_u64(self.timestamp),
            self.previous_hash,
            fmt_u64(self.nonce)
        );
        for tx in &self.transactions {
            s.push_str(&tx.sender);
            s.push_str(&tx.receiver);
            s.push_str(&fmt_amount(tx.amount));
        }
        s
    }

    /// Recompute the SHA-256 hash over the current canonical form.
    pub fn compute_hash(&self) -> Hash256 {
        sha256(self.canonical_input().as_bytes())
    }

    /// Mine this block in place: increment `nonce` from 0 until the
    /// resulting hash's hex rendering (without `0x`) has at least
    /// `self.difficulty` leading zero characters.
    ///
    /// The only loop exit is success — there is no time bound beyond the
    /// operator-set difficulty ceiling (spec.md §4.3).
    pub fn mine(&mut self) {
        self.nonce = 0;
        loop {
            let digest = self.compute_hash();
            if digest.leading_hex_zeros() >= self.difficulty as usize {
                self.hash = digest.to_string();
                debug!(
                    block_number = self.block_number,
                    nonce = self.nonce,
                    difficulty = self.difficulty,
                    "block mined"
                );
                return;
            }
            self.nonce += 1;
        }
    }

    /// Verify the proof-of-work target is met against the currently stored
    /// `hash` (does not recompute it — callers check hash integrity
    /// separately via [`Block::compute_hash`]).
    pub fn meets_difficulty(&self) -> Result<(), BlockError> {
        let Ok(digest) = Hash256::from_hex(&self.hash) else {
            return Err(BlockError::HashMismatch);
        };
        let got = digest.leading_hex_zeros();
        if got < self.difficulty as usize {
            return Err(BlockError::DifficultyUnmet {
                needed: self.difficulty,
                got,
            });
        }
        Ok(())
    }

    /// The coinbase transaction, if any (the last transaction of a
    /// non-genesis block).
    pub fn coinbase(&self) -> Option<&Transaction> {
        self.transactions.last().filter(|tx| tx.is_coinbase())
    }

    /// Validate the transaction list per spec.md §4.3.
    pub fn validate_transactions(&self) -> Result<(), BlockError> {
        if self.block_number == 0 {
            let valid_genesis = self.transactions.len() == 1
                && self.transactions[0].sender == GENESIS_SENDER
                && self.transactions[0].receiver == GENESIS_SENDER
                && self.transactions[0].amount == 0.0;
            return if valid_genesis {
                Ok(())
            } else {
                Err(BlockError::InvalidGenesisTransactions)
            };
        }

        let coinbase_count = self.transactions.iter().filter(|tx| tx.is_coinbase()).count();
        let last_is_coinbase = self.transactions.last().is_some_and(|tx| tx.is_coinbase());
        if coinbase_count != 1 || !last_is_coinbase {
            return Err(BlockError::MissingOrMisplacedCoinbase);
        }

        for (index, tx) in self.transactions.iter().enumerate() {
            tx.validate()
                .map_err(|source| BlockError::InvalidTransaction { index, source })?;
        }

        Ok(())
    }

    /// Encode the BLOCK wire payload (spec.md §4.6): header fields, then
    /// `txCount`, then each transaction's 7 `|`-joined fields, all
    /// `|`-joined in turn.
    pub fn encode_fields(&self) -> String {
        let mut parts = vec![
            fmt_u64(self.block_number),
            fmt_u64(self.timestamp),
            self.previous_hash.clone(),
            self.hash.clone(),
            fmt_u64(self.nonce),
            self.difficulty.to_string(),
            self.transactions.len().to_string(),
        ];
        for tx in &self.transactions {
            parts.push(tx.encode_fields());
        }
        parts.join("|")
    }

    /// Parse a block from its `|`-separated wire fields (the inverse of
    /// [`Block::encode_fields`]).
    pub fn decode_fields(fields: &[&str]) -> Result<Self, BlockError> {
        if fields.len() < 7 {
            return Err(BlockError::MalformedWire(format!(
                "expected at least 7 block header fields, got {}",
                fields.len()
            )));
        }
        let block_number: u64 = fields[0]
            .parse()
            .map_err(|_| BlockError::MalformedWire(format!("bad block_number: {}", fields[0])))?;
        let timestamp: u64 = fields[1]
            .parse()
            .map_err(|_| BlockError::MalformedWire(format!("bad timestamp: {}", fields[1])))?;
        let previous_hash = fields[2].to_string();
        let hash = fields[3].to_string();
        let nonce: u64 = fields[4]
            .parse()
            .map_err(|_| BlockError::MalformedWire(format!("bad nonce: {}", fields[4])))?;
        let difficulty: u8 = fields[5]
            .parse()
            .map_err(|_| BlockError::MalformedWire(format!("bad difficulty: {}", fields[5])))?;
        let tx_count: usize = fields[6]
            .parse()
            .map_err(|_| BlockError::MalformedWire(format!("bad tx_count: {}", fields[6])))?;

        // Each encoded transaction contributes exactly 7 fields.
        let rest = &fields[7..];
        if rest.len() != tx_count * 7 {
            return Err(BlockError::MalformedWire(format!(
                "tx_count {} implies {} fields, got {}",
                tx_count,
                tx_count * 7,
                rest.len()
            )));
        }
        let mut transactions = Vec::with_capacity(tx_count);
        for chunk in rest.chunks_exact(7) {
            let tx = Transaction::decode_fields(chunk)
                .map_err(|e| BlockError::MalformedWire(e.to_string()))?;
            transactions.push(tx);
        }

        Ok(Self {
            block_number,
            timestamp,
            previous_hash,
            hash,
            nonce,
            difficulty: clamp_difficulty(difficulty),
            transactions,
        })
    }

    /// Full block-level validity: PoW target, hash integrity, and
    /// transaction validity.
    pub fn validate(&self) -> Result<(), BlockError> {
        if !(crate::constants::DIFFICULTY_MIN..=crate::constants::DIFFICULTY_MAX)
            .contains(&self.difficulty)
        {
            return Err(BlockError::DifficultyOutOfRange(self.difficulty));
        }
        let recomputed = self.compute_hash().to_string();
        if self.block_number != 0 && recomputed != self.hash {
            return Err(BlockError::HashMismatch);
        }
        if self.block_number != 0 {
            self.meets_difficulty()?;
        }
        self.validate_transactions()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coinbase_only(block_number: u64, difficulty: u8) -> Block {
        let tx = Transaction::coinbase("0xminer", 50.0, 1_000);
        Block::new_candidate(block_number, 1_000, "0xprev", difficulty, vec![tx])
    }

    #[test]
    fn mined_block_meets_difficulty() {
        let mut block = coinbase_only(1, 1);
        block.mine();
        assert!(block.meets_difficulty().is_ok());
        assert_eq!(
            Hash256::from_hex(&block.hash).unwrap().leading_hex_zeros() >= 1,
            true
        );
    }

    #[test]
    fn mined_block_hash_matches_recompute() {
        let mut block = coinbase_only(1, 1);
        block.mine();
        assert_eq!(block.hash, block.compute_hash().to_string());
    }

    #[test]
    fn changing_nonce_changes_hash() {
        let block = coinbase_only(1, 1);
        let h0 = block.compute_hash();
        let mut block2 = block.clone();
        block2.nonce = 1;
        assert_ne!(h0, block2.compute_hash());
    }

    #[test]
    fn validate_transactions_accepts_well_formed_block() {
        let mut block = coinbase_only(1, 1);
        block.mine();
        assert!(block.validate_transactions().is_ok());
    }

    #[test]
    fn validate_transactions_rejects_coinbase_not_last() {
        let tx_coinbase = Transaction::coinbase("0xminer", 50.0, 1_000);
        let mut kp_tx = Transaction::new("0xsender", "0xreceiver", 1.0, 999);
        kp_tx.hash = kp_tx.compute_hash().to_string();
        let block = Block::new_candidate(1, 1_000, "0xprev", 1, vec![tx_coinbase, kp_tx]);
        assert!(matches!(
            block.validate_transactions(),
            Err(BlockError::MissingOrMisplacedCoinbase)
        ));
    }

    #[test]
    fn validate_transactions_rejects_multiple_coinbase() {
        let a = Transaction::coinbase("0xminer", 50.0, 1_000);
        let b = Transaction::coinbase("0xother", 50.0, 1_000);
        let block = Block::new_candidate(1, 1_000, "0xprev", 1, vec![a, b]);
        assert!(matches!(
            block.validate_transactions(),
            Err(BlockError::MissingOrMisplacedCoinbase)
        ));
    }

    #[test]
    fn genesis_block_requires_sentinel_transaction() {
        let tx = Transaction::new(GENESIS_SENDER, GENESIS_SENDER, 0.0, 1_000);
        let block = Block::new_candidate(0, 1_000, "0x0", 1, vec![tx]);
        assert!(block.validate_transactions().is_ok());
    }

    #[test]
    fn genesis_block_rejects_non_sentinel() {
        let tx = Transaction::coinbase("0xminer", 50.0, 1_000);
        let block = Block::new_candidate(0, 1_000, "0x0", 1, vec![tx]);
        assert!(matches!(
            block.validate_transactions(),
            Err(BlockError::InvalidGenesisTransactions)
        ));
    }

    #[test]
    fn coinbase_accessor_returns_last_coinbase() {
        let mut block = coinbase_only(1, 1);
        block.mine();
        assert!(block.coinbase().unwrap().is_coinbase());
    }

    #[test]
    fn wire_fields_round_trip() {
        let mut block = coinbase_only(3, 1);
        block.mine();
        let encoded = block.encode_fields();
        let fields: Vec<&str> = encoded.split('|').collect();
        let decoded = Block::decode_fields(&fields).unwrap();
        assert_eq!(decoded, block);
    }

    #[test]
    fn new_candidate_clamps_difficulty() {
        let block = Block::new_candidate(1, 1_000, "0xprev", 255, vec![]);
        assert_eq!(block.difficulty, crate::constants::DIFFICULTY_MAX);
    }
}
