//! The `Store` contract: durable ordered KV with prefix scan and atomic
//! batch writes (spec.md §2 Store, §4.1 note on persistence boundary).

use crate::batch::WriteBatch;
use crate::error::StoreError;

pub trait Store: Send + Sync {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError>;

    fn put(&self, key: &[u8], value: &[u8]) -> Result<(), StoreError>;

    fn delete(&self, key: &[u8]) -> Result<(), StoreError>;

    /// Every `(key, value)` pair whose key starts with `prefix`, in the
    /// store's native (lexicographic) key order.
    fn scan_prefix(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>, StoreError>;

    /// Apply every operation in `batch` as a single atomic write.
    fn write_batch(&self, batch: WriteBatch) -> Result<(), StoreError>;

    /// Flush in-memory buffers to stable storage.
    fn flush(&self) -> Result<(), StoreError>;
}
