//! Store-backed chain bootstrap and block persistence, composing
//! `ember-chain`'s pure types with `ember-store`'s key schema
//! (spec.md §4.5 `load`, §5 atomic block+balance writes, §7 quarantine
//! policy for corrupt store entries).

use std::collections::HashSet;

use ember_chain::Chain;
use ember_core::genesis::genesis_block;
use ember_core::{Block, NodeKind, Transaction};
use ember_store::keys::{block_key, tx_key, TX_PREFIX};
use ember_store::persist::{stage_block, stage_worldstate};
use ember_store::{Store, WriteBatch};
use tracing::{error, warn};

use crate::error::NodeError;

fn decode_utf8(key: &str, bytes: Vec<u8>) -> Result<String, NodeError> {
    String::from_utf8(bytes).map_err(|e| NodeError::Corrupt {
        key: key.to_string(),
        reason: e.to_string(),
    })
}

/// Scan `block:0, block:1, …` until the first gap, decoding each as a
/// [`Block`]. If the store holds no blocks at all, writes and returns a
/// fresh Genesis. A decode failure partway through quarantines that entry
/// and every block after it by treating the scan as ended at the last
/// good height — the node continues running on its truncated view rather
/// than failing to start (spec.md §7 `Store` policy).
fn load_blocks(store: &dyn Store) -> Result<Vec<Block>, NodeError> {
    let mut blocks = Vec::new();
    let mut height = 0u64;
    loop {
        let key = block_key(height);
        match store.get(&key)? {
            None => break,
            Some(bytes) => {
                let key_str = format!("block:{height}");
                let text = decode_utf8(&key_str, bytes)?;
                let fields: Vec<&str> = text.split('|').collect();
                match Block::decode_fields(&fields) {
                    Ok(block) => {
                        blocks.push(block);
                        height += 1;
                    }
                    Err(e) => {
                        error!(height, error = %e, "quarantining corrupt block, truncating load at this height");
                        break;
                    }
                }
            }
        }
    }

    if blocks.is_empty() {
        let genesis = genesis_block().clone();
        let mut batch = WriteBatch::new();
        stage_block(&mut batch, &genesis, &[]);
        stage_worldstate(&mut batch, 0, &[]);
        store.write_batch(batch)?;
        blocks.push(genesis);
    }

    Ok(blocks)
}

/// Re-admit every stored pending transaction whose hash does not appear in
/// any loaded block. Individual corrupt `tx:` entries are skipped (logged),
/// not fatal to the load.
fn load_pending(store: &dyn Store, chain: &mut Chain, blocks: &[Block]) -> Result<(), NodeError> {
    let confirmed: HashSet<&str> = blocks
        .iter()
        .flat_map(|b| b.transactions.iter().map(|t| t.hash.as_str()))
        .collect();

    for (key, value) in store.scan_prefix(TX_PREFIX)? {
        let key_str = String::from_utf8_lossy(&key).to_string();
        let text = match decode_utf8(&key_str, value) {
            Ok(t) => t,
            Err(e) => {
                warn!(key = %key_str, error = %e, "quarantining corrupt tx entry");
                continue;
            }
        };
        let fields: Vec<&str> = text.split('|').collect();
        let tx = match Transaction::decode_fields(&fields) {
            Ok(tx) => tx,
            Err(e) => {
                warn!(key = %key_str, error = %e, "quarantining corrupt tx entry");
                continue;
            }
        };
        if !confirmed.contains(tx.hash.as_str()) {
            chain.restore_pending(tx);
        }
    }
    Ok(())
}

/// Rebuild a [`Chain`] from whatever the store holds, writing Genesis if
/// the store is empty (spec.md §4.5 `load`).
pub fn load_chain(store: &dyn Store, node_kind: NodeKind) -> Result<Chain, NodeError> {
    let blocks = load_blocks(store)?;
    let mut chain = Chain::from_blocks(blocks.clone(), node_kind);
    load_pending(store, &mut chain, &blocks)?;
    Ok(chain)
}

/// Persist a newly-appended block and the balances its transactions
/// touched as one atomic batch (spec.md §5: block-save and balance-updates
/// must land together).
pub fn persist_block(store: &dyn Store, block: &Block, touched_balances: &[(&str, f64)]) -> Result<(), NodeError> {
    let mut batch = WriteBatch::new();
    stage_block(&mut batch, block, touched_balances);
    stage_worldstate(&mut batch, block.block_number, touched_balances);
    store.write_batch(batch)?;
    Ok(())
}

/// Persist a single transaction newly admitted to the mempool, so it
/// survives a restart before it is ever mined into a block.
pub fn persist_pending_tx(store: &dyn Store, tx: &Transaction) -> Result<(), NodeError> {
    store.put(&tx_key(&tx.hash), tx.encode_fields().as_bytes())?;
    Ok(())
}

/// Rewrite every block of an adopted replacement chain plus its final
/// balance snapshot as one atomic batch (spec.md §4.4 `replace_chain`: once
/// a longer-work chain wins, it must become durable in full).
pub fn persist_full_chain(store: &dyn Store, chain: &Chain) -> Result<(), NodeError> {
    let mut batch = WriteBatch::new();
    for block in chain.blocks() {
        batch.put(block_key(block.block_number), block.encode_fields().into_bytes());
        for tx in &block.transactions {
            batch.put(tx_key(&tx.hash), tx.encode_fields().into_bytes());
        }
    }
    let balances: Vec<(&str, f64)> = chain.balances().get_all().collect();
    stage_worldstate(&mut batch, chain.height(), &balances);
    store.write_batch(batch)?;
    Ok(())
}
