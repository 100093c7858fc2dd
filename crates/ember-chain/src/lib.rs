//! Chain engine: mempool, balance projection, mining, and best-chain
//! replacement for EmberChain (spec.md §4.4, §4.5).

pub mod balance;
pub mod chain;
pub mod mempool;
pub mod reward;

pub use balance::BalanceState;
pub use chain::{work, Chain};
pub use mempool::Mempool;
pub use reward::current_reward;
