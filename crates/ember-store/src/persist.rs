//! Block/balance persistence helpers composing atomic batch writes
//! (spec.md §5: block-save and balance-updates land as one batch).

use ember_core::constants::GENESIS_SENDER;
use ember_core::{Block, Transaction};

use crate::batch::WriteBatch;
use crate::keys::{balance_key, block_key, journal_key, tx_key, worldstate_key};

/// A single journal entry: one transaction's effect on one address.
pub struct JournalEntry<'a> {
    pub address: &'a str,
    pub tx_hash: &'a str,
    pub amount: f64,
    pub is_credit: bool,
    pub block_height: u64,
    pub timestamp: u64,
}

impl JournalEntry<'_> {
    fn encode(&self) -> String {
        format!(
            "{}|{}|{}|{}|{}|{}",
            self.address, self.tx_hash, self.amount, self.is_credit, self.block_height, self.timestamp
        )
    }
}

/// Stage a mined or accepted block plus its balance effects into a single
/// atomic batch: the block itself, each of its transactions, a journal
/// entry per non-sentinel transfer, and the updated balance rows.
///
/// `post_balances` must carry the already-updated balance for every
/// address touched by `block`'s transactions.
pub fn stage_block(batch: &mut WriteBatch, block: &Block, post_balances: &[(&str, f64)]) {
    batch.put(block_key(block.block_number), block.encode_fields().into_bytes());

    for tx in &block.transactions {
        batch.put(tx_key(&tx.hash), tx.encode_fields().into_bytes());
        stage_journal_for_tx(batch, tx, block.block_number);
    }

    for (address, amount) in post_balances {
        batch.put(balance_key(address), amount.to_string().into_bytes());
    }
}

fn stage_journal_for_tx(batch: &mut WriteBatch, tx: &Transaction, block_height: u64) {
    if tx.is_genesis_sentinel() {
        return;
    }
    if tx.sender != GENESIS_SENDER {
        let debit = JournalEntry {
            address: &tx.sender,
            tx_hash: &tx.hash,
            amount: tx.amount,
            is_credit: false,
            block_height,
            timestamp: tx.timestamp,
        };
        batch.put(
            journal_key(&tx.sender, tx.timestamp, &tx.hash),
            debit.encode().into_bytes(),
        );
    }
    let credit = JournalEntry {
        address: &tx.receiver,
        tx_hash: &tx.hash,
        amount: tx.amount,
        is_credit: true,
        block_height,
        timestamp: tx.timestamp,
    };
    batch.put(
        journal_key(&tx.receiver, tx.timestamp, &tx.hash),
        credit.encode().into_bytes(),
    );
}

/// Render a full-balance snapshot as the `worldstate:<height>` newline-terminated
/// `address:balance` payload.
pub fn encode_worldstate(balances: &[(&str, f64)]) -> Vec<u8> {
    let mut out = String::new();
    for (address, amount) in balances {
        out.push_str(address);
        out.push(':');
        out.push_str(&amount.to_string());
        out.push('\n');
    }
    out.into_bytes()
}

pub fn stage_worldstate(batch: &mut WriteBatch, block_height: u64, balances: &[(&str, f64)]) {
    batch.put(worldstate_key(block_height), encode_worldstate(balances));
}
