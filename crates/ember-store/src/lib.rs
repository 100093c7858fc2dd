//! Durable ordered key-value store with prefix scan and atomic batch
//! writes for EmberChain (spec.md §2 Store, §6 Store key schema).

pub mod batch;
pub mod error;
pub mod keys;
pub mod persist;
pub mod rocks;
pub mod store;

pub use batch::WriteBatch;
pub use error::StoreError;
pub use rocks::RocksStore;
pub use store::Store;
