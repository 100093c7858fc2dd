//! The chain engine: append, mining, best-chain replacement (spec.md §4.5).

use ember_core::constants::EMPTY_BLOCK_LIMIT;
use ember_core::genesis::genesis_block;
use ember_core::{Block, ChainError, NodeKind, Transaction};
use tracing::{info, warn};

use crate::balance::BalanceState;
use crate::mempool::Mempool;
use crate::reward::current_reward;

/// Total accumulated proof-of-work, `Σ 2^block.difficulty`.
pub fn work(blocks: &[Block]) -> u128 {
    blocks.iter().map(|b| 1u128 << b.difficulty).sum()
}

/// The chain engine: an owned, append-only block sequence plus its mempool
/// and balance projection, mutated only as a single aggregate.
pub struct Chain {
    blocks: Vec<Block>,
    mempool: Mempool,
    balances: BalanceState,
    node_kind: NodeKind,
    mining_difficulty: Option<u8>,
}

impl Chain {
    /// A fresh chain containing only Genesis.
    pub fn new(node_kind: NodeKind) -> Self {
        let blocks = vec![genesis_block().clone()];
        let mut balances = BalanceState::new();
        balances.project_from(&blocks);
        Self {
            blocks,
            mempool: Mempool::new(),
            balances,
            node_kind,
            mining_difficulty: None,
        }
    }

    /// Build a chain from an already-loaded block sequence (used by
    /// storage `load`). `blocks[0]` must be Genesis; callers are
    /// responsible for that invariant (checked by [`Chain::is_valid`]).
    pub fn from_blocks(blocks: Vec<Block>, node_kind: NodeKind) -> Self {
        let mut balances = BalanceState::new();
        balances.project_from(&blocks);
        Self {
            blocks,
            mempool: Mempool::new(),
            balances,
            node_kind,
            mining_difficulty: None,
        }
    }

    /// Fix the difficulty this node seals its own newly-mined blocks at,
    /// overriding the default of inheriting the tip's difficulty. Difficulty
    /// is operator-set, not retargeted (spec.md §6): once set, every
    /// subsequent `mine` call uses this clamped value until changed again.
    pub fn set_difficulty(&mut self, difficulty: u8) {
        self.mining_difficulty = Some(ember_core::constants::clamp_difficulty(difficulty));
    }

    pub fn height(&self) -> u64 {
        self.blocks.last().map(|b| b.block_number).unwrap_or(0)
    }

    pub fn tip(&self) -> &Block {
        self.blocks.last().expect("chain always contains at least Genesis")
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn mempool(&self) -> &Mempool {
        &self.mempool
    }

    pub fn node_kind(&self) -> NodeKind {
        self.node_kind
    }

    /// Re-admit a transaction that was already accepted in a prior process
    /// lifetime (loaded back from the store's `tx:` keyspace). Bypasses the
    /// balance/signature re-check `add_local_transaction` performs, since
    /// the transaction was already validated before it was persisted.
    pub fn restore_pending(&mut self, tx: Transaction) -> bool {
        self.mempool.insert(tx)
    }

    pub fn balances(&self) -> &BalanceState {
        &self.balances
    }

    pub fn work(&self) -> u128 {
        work(&self.blocks)
    }

    fn empty_block_count(&self) -> usize {
        self.blocks.iter().filter(|b| b.transactions.len() <= 1).count()
    }

    /// Validate a transaction and admit it into the mempool.
    ///
    /// Returns `Ok(true)` if newly added, `Ok(false)` if it was already
    /// present (silent no-op per spec.md).
    pub fn add_local_transaction(&mut self, tx: Transaction) -> Result<bool, ChainError> {
        tx.validate()?;

        if tx.sender != ember_core::constants::GENESIS_SENDER {
            let have = self.balances.get(&tx.sender);
            if have < tx.amount {
                return Err(ChainError::InsufficientBalance {
                    have,
                    need: tx.amount,
                });
            }
        }

        if self.mempool.contains(&tx.hash) {
            return Ok(false);
        }

        Ok(self.mempool.insert(tx))
    }

    /// Mine a new block crediting `miner_address`, sealing every pending
    /// mempool transaction plus a coinbase as the final element.
    pub fn mine(&mut self, miner_address: &str, now: u64) -> Result<Block, ChainError> {
        if self.node_kind == NodeKind::WalletNode {
            return Err(ChainError::MiningForbidden);
        }

        let empty_count = self.empty_block_count();
        if self.mempool.is_empty() && empty_count >= EMPTY_BLOCK_LIMIT {
            return Err(ChainError::EmptyBlockQuotaExhausted);
        }

        // Re-verify every pending tx against current balances; a stale
        // mempool entry (spent elsewhere since admission) must not be sealed.
        let pending = self.mempool.to_vec();
        let mut scratch = self.balances.clone();
        for tx in &pending {
            if !scratch.apply(tx) {
                return Err(ChainError::InsufficientBalance {
                    have: scratch.get(&tx.sender),
                    need: tx.amount,
                });
            }
        }

        let reward = current_reward(now);
        let coinbase = Transaction::coinbase(miner_address, reward, now);

        let mut block_txs = pending;
        block_txs.push(coinbase);

        let difficulty = self.mining_difficulty.unwrap_or(self.tip().difficulty);
        let mut candidate = Block::new_candidate(
            self.height() + 1,
            now,
            self.tip().hash.clone(),
            difficulty,
            block_txs,
        );
        candidate.mine();
        candidate.validate_transactions()?;

        self.blocks.push(candidate.clone());
        for tx in &candidate.transactions {
            if !tx.is_genesis_sentinel() {
                self.balances.apply(tx);
            }
        }
        self.mempool.clear();

        info!(
            block_number = candidate.block_number,
            tx_count = candidate.transactions.len(),
            "mined block"
        );
        Ok(candidate)
    }

    /// Admit a block received from a peer.
    pub fn add_foreign_block(&mut self, block: Block) -> Result<(), ChainError> {
        let tip = self.tip();
        if block.block_number == tip.block_number {
            if block.hash == tip.hash {
                return Ok(());
            }
            return Err(ChainError::SameHeightDivergence {
                height: block.block_number,
            });
        }
        if block.previous_hash != tip.hash {
            return Err(ChainError::Disconnected);
        }
        block.validate_transactions()?;

        for tx in &block.transactions {
            if !tx.is_genesis_sentinel() {
                self.balances.apply(tx);
            }
        }
        self.blocks.push(block);
        self.mempool.clear();
        Ok(())
    }

    /// Replace the retained chain with `candidate` if it carries strictly
    /// more accumulated work. Transactions from replaced blocks that are
    /// absent from the adopted chain are pushed back into the mempool.
    pub fn replace_chain(&mut self, candidate: Vec<Block>) -> Result<bool, ChainError> {
        let Some(candidate_genesis) = candidate.first() else {
            return Err(ChainError::GenesisMismatch);
        };
        if candidate_genesis.hash != genesis_block().hash {
            return Err(ChainError::GenesisMismatch);
        }

        for window in candidate.windows(2) {
            let (prev, cur) = (&window[0], &window[1]);
            if cur.previous_hash != prev.hash {
                return Err(ChainError::Disconnected);
            }
            let recomputed = cur.compute_hash().to_string();
            if recomputed != cur.hash {
                return Err(ChainError::Block(ember_core::BlockError::HashMismatch));
            }
            cur.meets_difficulty()
                .map_err(ChainError::Block)?;
            cur.validate_transactions()?;
        }

        let candidate_work = work(&candidate);
        let our_work = self.work();
        if candidate_work <= our_work {
            return Ok(false);
        }

        let candidate_hashes: std::collections::HashSet<&str> =
            candidate.iter().map(|b| b.hash.as_str()).collect();

        let mut orphaned_txs = Vec::new();
        for block in &self.blocks {
            if !candidate_hashes.contains(block.hash.as_str()) {
                for tx in &block.transactions {
                    if !tx.is_genesis_sentinel() && !tx.is_coinbase() {
                        orphaned_txs.push(tx.clone());
                    }
                }
            }
        }

        self.blocks = candidate;
        self.balances.project_from(&self.blocks);

        for tx in orphaned_txs {
            // Orphaned transactions may now conflict with the adopted
            // chain's balances; silently drop ones that no longer validate.
            if self.mempool.contains(&tx.hash) {
                continue;
            }
            if self.balances.get(&tx.sender) >= tx.amount {
                self.mempool.insert(tx);
            }
        }

        warn!(new_height = self.height(), "adopted longer candidate chain");
        Ok(true)
    }

    /// Full-chain structural validity (spec.md §4.5 `is_valid`).
    pub fn is_valid(&self) -> bool {
        for window in self.blocks.windows(2) {
            let (prev, cur) = (&window[0], &window[1]);
            if cur.previous_hash != prev.hash {
                return false;
            }
            if cur.compute_hash().to_string() != cur.hash {
                return false;
            }
            if cur.validate_transactions().is_err() {
                return false;
            }
        }
        true
    }
}
