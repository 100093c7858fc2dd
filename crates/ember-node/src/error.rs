//! Node-level error taxonomy, composing the lower crates' errors
//! (spec.md §7).

use thiserror::Error;

#[derive(Error, Debug)]
pub enum NodeError {
    #[error(transparent)]
    Chain(#[from] ember_core::ChainError),
    #[error(transparent)]
    Store(#[from] ember_store::StoreError),
    #[error(transparent)]
    Wire(#[from] ember_network::WireError),
    #[error(transparent)]
    PeerIo(#[from] ember_network::PeerIoError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("store entry at key {key} is corrupt: {reason}")]
    Corrupt { key: String, reason: String },
    #[error("refusing self-connection to our own (listen_host, listen_port)")]
    SelfConnection,
}
