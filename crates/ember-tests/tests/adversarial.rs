//! Adversarial inputs: tampered transactions, disconnected/divergent
//! blocks, and malformed wire frames.

use ember_chain::Chain;
use ember_core::{BlockError, ChainError, NodeKind, Transaction, TransactionError};
use ember_network::{Envelope, MessageType, WireError};
use ember_wallet::Wallet;

#[test]
fn tampered_amount_invalidates_the_signature_hash() {
    let wallet = Wallet::generate();
    let mut tx = wallet.send_at("0xreceiver", 5.0, 1_000).unwrap();
    assert!(tx.is_valid());

    // Mutate post-signing without recomputing the hash: the signature now
    // covers a different canonical form than the one actually transmitted.
    tx.amount = 500.0;
    let err = tx.validate().unwrap_err();
    assert!(matches!(err, TransactionError::HashMismatch { .. }));
}

#[test]
fn forged_signature_over_correct_hash_is_rejected() {
    let wallet = Wallet::generate();
    let mut tx = wallet.send_at("0xreceiver", 5.0, 1_000).unwrap();

    // Swap in a syntactically valid signature from an unrelated keypair.
    let other = ember_crypto::KeyPair::generate();
    tx.signature = other.sign(&tx.compute_hash());

    let err = tx.validate().unwrap_err();
    assert!(matches!(err, TransactionError::SignatureInvalid));
}

#[test]
fn transaction_with_mismatched_sender_address_is_rejected() {
    let wallet = Wallet::generate();
    let mut tx = wallet.send_at("0xreceiver", 5.0, 1_000).unwrap();
    tx.sender = "0xnotthesender".to_string();
    tx.hash = tx.compute_hash().to_string();

    let err = tx.validate().unwrap_err();
    assert!(matches!(err, TransactionError::AddressMismatch { .. }));
}

#[test]
fn non_positive_amount_transaction_is_rejected() {
    let tx = Transaction::new("0xsender", "0xreceiver", 0.0, 1_000);
    assert!(matches!(tx.validate(), Err(TransactionError::NonPositiveAmount(_))));
}

#[test]
fn foreign_block_not_connected_to_tip_is_rejected() {
    let mut chain = Chain::new(NodeKind::FullNode);
    let now = ember_core::constants::GENESIS_TIMESTAMP + 50;

    let mut detached = Chain::new(NodeKind::FullNode);
    detached.mine("0xorphan", now).unwrap();
    detached.mine("0xorphan", now + 1).unwrap();
    let second_orphan = detached.blocks()[2].clone();

    // second_orphan's previous_hash points at the first orphan, not genesis.
    let err = chain.add_foreign_block(second_orphan).unwrap_err();
    assert!(matches!(err, ChainError::Disconnected));
}

#[test]
fn foreign_block_at_same_height_but_different_hash_is_divergence() {
    let mut local = Chain::new(NodeKind::FullNode);
    let now = ember_core::constants::GENESIS_TIMESTAMP + 50;
    let mut rival = Chain::new(NodeKind::FullNode);
    rival.mine("0xrival", now).unwrap();
    local.mine("0xlocal", now).unwrap();

    let rival_block = rival.blocks()[1].clone();
    let err = local.add_foreign_block(rival_block).unwrap_err();
    assert!(matches!(err, ChainError::SameHeightDivergence { height: 1 }));
}

#[test]
fn block_with_tampered_nonce_is_rejected_on_replace() {
    let mut chain = Chain::new(NodeKind::FullNode);
    let now = ember_core::constants::GENESIS_TIMESTAMP + 50;
    let mut candidate_chain = Chain::new(NodeKind::FullNode);
    let mut forged = candidate_chain.mine("0xforger", now).unwrap();

    // Tamper with the nonce after mining so the stored hash no longer
    // satisfies its own difficulty, without touching the (now stale) hash.
    forged.nonce = forged.nonce.wrapping_add(1);
    let err = chain.replace_chain(vec![ember_core::genesis::genesis_block().clone(), forged]).unwrap_err();
    assert!(matches!(err, ChainError::Block(BlockError::HashMismatch)));
}

#[test]
fn unknown_wire_message_type_is_rejected() {
    let err = "BOGUS".parse::<MessageType>().unwrap_err();
    assert!(matches!(err, WireError::UnknownMessageType(_)));
}

#[test]
fn envelope_decode_rejects_unknown_type_in_a_full_frame() {
    let err = Envelope::decode("BOGUS|node-1|payload").unwrap_err();
    assert!(matches!(err, WireError::UnknownMessageType(_)));
}

#[test]
fn envelope_decode_rejects_empty_frame() {
    let err = Envelope::decode("").unwrap_err();
    assert!(matches!(err, WireError::EmptyFrame));
}
