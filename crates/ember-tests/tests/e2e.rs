//! End-to-end lifecycle tests: a single node's boot, mining, transaction
//! handling, and crash recovery against real RocksDB storage.

use ember_chain::Chain;
use ember_core::constants::{EMPTY_BLOCK_LIMIT, GENESIS_HASH};
use ember_core::{ChainError, NodeKind};
use ember_tests::helpers::{start_test_node, test_config};
use ember_wallet::Wallet;

#[tokio::test]
async fn genesis_boot_has_height_zero() {
    let (node, _dir) = start_test_node().await;
    assert_eq!(node.height(), 0);
    assert_eq!(node.tip_hash(), GENESIS_HASH);
}

#[tokio::test]
async fn mine_empty_block_credits_miner() {
    let (node, _dir) = start_test_node().await;
    let block = node.mine("0xminer".to_string()).await.unwrap();
    assert_eq!(block.block_number, 1);
    assert!(node.balance("0xminer") > 0.0);
    assert_eq!(node.height(), 1);
}

#[tokio::test]
async fn send_then_mine_updates_both_balances() {
    let (node, _dir) = start_test_node().await;
    let sender = Wallet::generate();

    // Credit the sender with a coinbase so it has funds to spend.
    node.mine(sender.address().to_string()).await.unwrap();
    let starting_balance = node.balance(sender.address());
    assert!(starting_balance > 0.0);

    let tx = sender.send("0xreceiver", 1.0).unwrap();
    assert!(node.submit_transaction(tx).await.unwrap());

    node.mine("0xsecond-miner".to_string()).await.unwrap();
    assert_eq!(node.balance("0xreceiver"), 1.0);
    assert_eq!(node.balance(sender.address()), starting_balance - 1.0);
}

#[tokio::test]
async fn insufficient_balance_is_rejected() {
    let (node, _dir) = start_test_node().await;
    let sender = Wallet::generate();
    let tx = sender.send("0xreceiver", 100.0).unwrap();

    let err = node.submit_transaction(tx).await.unwrap_err();
    assert!(matches!(
        err,
        ember_node::NodeError::Chain(ChainError::InsufficientBalance { .. })
    ));
}

#[tokio::test]
async fn empty_block_quota_is_enforced() {
    let (node, _dir) = start_test_node().await;
    // Genesis itself counts as one empty block, so only
    // `EMPTY_BLOCK_LIMIT - 1` more empty mines succeed before the quota trips.
    for _ in 0..(EMPTY_BLOCK_LIMIT - 1) {
        node.mine("0xminer".to_string()).await.unwrap();
    }
    let err = node.mine("0xminer".to_string()).await.unwrap_err();
    assert!(matches!(
        err,
        ember_node::NodeError::Chain(ChainError::EmptyBlockQuotaExhausted)
    ));
}

#[tokio::test]
async fn crash_recovery_reloads_mined_chain() {
    let dir = tempfile::tempdir().unwrap();
    let port = ember_tests::helpers::next_port();

    let config = test_config(dir.path().to_path_buf(), port);
    let node = ember_node::Node::start(config.clone()).await.unwrap();
    node.mine("0xminer".to_string()).await.unwrap();
    let balance_before = node.balance("0xminer");
    node.shutdown().await;
    // Drop the last handle so RocksDB releases its exclusive lock on
    // the data directory before we reopen it.
    drop(node);

    let reopened = ember_node::Node::start(config).await.unwrap();
    assert_eq!(reopened.height(), 1);
    assert_eq!(reopened.balance("0xminer"), balance_before);
}

#[test]
fn fork_resolution_adopts_the_chain_with_more_work() {
    let mut chain_a = Chain::new(NodeKind::FullNode);
    let mut chain_b = Chain::new(NodeKind::FullNode);

    let now = ember_core::constants::GENESIS_TIMESTAMP + 100;
    chain_a.mine("0xa", now).unwrap();

    chain_b.set_difficulty(2);
    chain_b.mine("0xb", now).unwrap();
    chain_b.mine("0xb", now + 1).unwrap();

    assert!(chain_b.work() > chain_a.work());
    let adopted = chain_a.replace_chain(chain_b.blocks().to_vec()).unwrap();
    assert!(adopted);
    assert_eq!(chain_a.height(), chain_b.height());
    assert_eq!(chain_a.tip().hash, chain_b.tip().hash);
}

#[test]
fn replace_chain_rejects_foreign_genesis() {
    let mut chain = Chain::new(NodeKind::FullNode);
    let mut bogus_genesis = ember_core::genesis::genesis_block().clone();
    bogus_genesis.nonce += 1;
    let result = chain.replace_chain(vec![bogus_genesis]);
    assert!(matches!(result, Err(ChainError::GenesisMismatch)));
}
