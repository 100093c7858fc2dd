//! Wallet error taxonomy.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WalletError {
    #[error("invalid secret key material: {0}")]
    InvalidKey(String),
    #[error("amount must be positive, got {0}")]
    NonPositiveAmount(f64),
}
