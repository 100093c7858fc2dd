//! Multi-node gossip tests: real TCP-connected nodes converging over the
//! handshake/transaction/block wire protocol.

use std::sync::atomic::Ordering;

use ember_tests::helpers::{start_test_node, wait_until};
use ember_wallet::Wallet;

#[tokio::test]
async fn connecting_peers_populates_peer_table() {
    let (node_a, _dir_a) = start_test_node().await;
    let (node_b, _dir_b) = start_test_node().await;

    node_a
        .connect_to(&node_b.config().host, node_b.config().port)
        .await
        .unwrap();

    let converged = wait_until(|| node_a.peer_count() >= 1 && node_b.peer_count() >= 1, 40).await;
    assert!(converged, "both sides should learn about each other via handshake");
}

#[tokio::test]
async fn transaction_floods_from_one_node_to_its_peer() {
    let (node_a, _dir_a) = start_test_node().await;
    let (node_b, _dir_b) = start_test_node().await;

    node_a
        .connect_to(&node_b.config().host, node_b.config().port)
        .await
        .unwrap();
    wait_until(|| node_a.peer_count() >= 1, 40).await;

    let sender = Wallet::generate();
    // The coinbase mint itself floods as a BLOCK, crediting the sender on
    // both sides; wait for that to settle before isolating the TRANSACTION
    // flood this test actually cares about.
    node_a.mine(sender.address().to_string()).await.unwrap();
    wait_until(|| node_b.height() == node_a.height(), 40).await;

    let tx = sender.send("0xreceiver", 1.0).unwrap();
    node_a.submit_transaction(tx).await.unwrap();

    let converged = wait_until(|| node_b.metrics().txs_relayed.load(Ordering::Relaxed) >= 1, 40).await;
    assert!(converged, "node_b should admit the transaction flooded from node_a");
}

#[tokio::test]
async fn mined_block_propagates_and_heights_converge() {
    let (node_a, _dir_a) = start_test_node().await;
    let (node_b, _dir_b) = start_test_node().await;

    node_a
        .connect_to(&node_b.config().host, node_b.config().port)
        .await
        .unwrap();
    wait_until(|| node_a.peer_count() >= 1, 40).await;

    node_a.mine("0xminer".to_string()).await.unwrap();

    let converged = wait_until(|| node_b.height() == node_a.height(), 40).await;
    assert!(converged, "node_b should adopt the block node_a gossiped");
    assert_eq!(node_b.tip_hash(), node_a.tip_hash());
}

#[tokio::test]
async fn node_refuses_to_connect_to_itself() {
    let (node_a, _dir_a) = start_test_node().await;

    let host = node_a.config().host.clone();
    let port = node_a.config().port;
    // The connection is accepted at the TCP layer but the handshake must
    // be rejected as a self-connection, leaving the peer table empty.
    let _ = node_a.connect_to(&host, port).await;

    wait_until(|| true, 2).await;
    assert_eq!(node_a.peer_count(), 0);
}
