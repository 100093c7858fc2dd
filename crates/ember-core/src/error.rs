//! Error taxonomy for the chain engine (spec.md §7).
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransactionError {
    #[error("sender or receiver is empty")]
    EmptyParty,
    #[error("amount must be positive, got {0}")]
    NonPositiveAmount(f64),
    #[error("hash mismatch: stored {stored}, recomputed {recomputed}")]
    HashMismatch { stored: String, recomputed: String },
    #[error("address derived from public key ({derived}) does not match sender ({sender})")]
    AddressMismatch { sender: String, derived: String },
    #[error("signature verification failed")]
    SignatureInvalid,
    #[error("malformed public key or signature: {0}")]
    MalformedCrypto(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BlockError {
    #[error("proof-of-work target unmet: need {needed} leading zeros, hash has {got}")]
    DifficultyUnmet { needed: u8, got: usize },
    #[error("previous hash mismatch: expected {expected}, got {got}")]
    PreviousHashMismatch { expected: String, got: String },
    #[error("hash does not match recomputed content hash")]
    HashMismatch,
    #[error("genesis block must contain exactly one Genesis-to-Genesis transaction")]
    InvalidGenesisTransactions,
    #[error("non-genesis block must contain exactly one coinbase transaction as its final entry")]
    MissingOrMisplacedCoinbase,
    #[error("transaction at index {index} is invalid: {source}")]
    InvalidTransaction {
        index: usize,
        #[source]
        source: TransactionError,
    },
    #[error("difficulty {0} out of range [1, 8]")]
    DifficultyOutOfRange(u8),
    #[error("malformed wire encoding: {0}")]
    MalformedWire(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChainError {
    #[error(transparent)]
    Transaction(#[from] TransactionError),
    #[error(transparent)]
    Block(#[from] BlockError),
    #[error("insufficient balance: have {have}, need {need}")]
    InsufficientBalance { have: f64, need: f64 },
    #[error("same-height chain divergence at height {height}")]
    SameHeightDivergence { height: u64 },
    #[error("block does not connect to the current tip")]
    Disconnected,
    #[error("candidate chain's genesis does not match our own")]
    GenesisMismatch,
    #[error("wallet nodes cannot mine")]
    MiningForbidden,
    #[error("empty-block quota exhausted, refusing to mine an empty block")]
    EmptyBlockQuotaExhausted,
    #[error("storage error: {0}")]
    Storage(String),
}
