//! Keypair management and signed-transaction construction for EmberChain
//! wallets (spec.md §4.1, §4.2).

pub mod error;
pub mod wallet;

pub use error::WalletError;
pub use wallet::Wallet;
