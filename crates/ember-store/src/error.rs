//! Store error taxonomy (spec.md §7).

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("rocksdb I/O failure: {0}")]
    Io(#[from] rocksdb::Error),
    #[error("corrupt value at key {key}: {reason}")]
    Corrupt { key: String, reason: String },
}
