//! RocksDB-backed implementation of [`Store`] over a single ordered
//! keyspace (no column families — the key schema's `block:`/`tx:`/etc.
//! prefixes carry the separation a multi-CF layout would otherwise give).

use std::path::Path;

use rocksdb::{IteratorMode, Options, WriteBatch as RocksWriteBatch, DB};
use tracing::debug;

use crate::batch::{BatchOp, WriteBatch};
use crate::error::StoreError;
use crate::store::Store;

pub struct RocksStore {
    db: DB,
}

impl RocksStore {
    /// Open or create a RocksDB database at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        let db = DB::open(&opts, path.as_ref())?;
        debug!(path = %path.as_ref().display(), "opened store");
        Ok(Self { db })
    }

    /// Discard all on-disk state at `path` before opening fresh (the
    /// `clean` operator flag).
    pub fn open_clean(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let _ = DB::destroy(&Options::default(), path.as_ref());
        Self::open(path)
    }
}

impl Store for RocksStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.db.get(key)?)
    }

    fn put(&self, key: &[u8], value: &[u8]) -> Result<(), StoreError> {
        self.db.put(key, value)?;
        Ok(())
    }

    fn delete(&self, key: &[u8]) -> Result<(), StoreError> {
        self.db.delete(key)?;
        Ok(())
    }

    fn scan_prefix(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>, StoreError> {
        let mut out = Vec::new();
        let iter = self.db.iterator(IteratorMode::From(prefix, rocksdb::Direction::Forward));
        for item in iter {
            let (key, value) = item?;
            if !key.starts_with(prefix) {
                break;
            }
            out.push((key.to_vec(), value.to_vec()));
        }
        Ok(out)
    }

    fn write_batch(&self, batch: WriteBatch) -> Result<(), StoreError> {
        let mut rocks_batch = RocksWriteBatch::default();
        for op in batch.ops {
            match op {
                BatchOp::Put(key, value) => rocks_batch.put(key, value),
                BatchOp::Delete(key) => rocks_batch.delete(key),
            }
        }
        self.db.write(rocks_batch)?;
        Ok(())
    }

    fn flush(&self) -> Result<(), StoreError> {
        Ok(self.db.flush()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn temp_store() -> (RocksStore, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let store = RocksStore::open(dir.path().join("chaindata")).unwrap();
        (store, dir)
    }

    #[test]
    fn put_then_get_round_trips() {
        let (store, _dir) = temp_store();
        store.put(b"block:0", b"genesis-bytes").unwrap();
        assert_eq!(store.get(b"block:0").unwrap(), Some(b"genesis-bytes".to_vec()));
    }

    #[test]
    fn get_missing_key_is_none() {
        let (store, _dir) = temp_store();
        assert_eq!(store.get(b"nope").unwrap(), None);
    }

    #[test]
    fn delete_removes_key() {
        let (store, _dir) = temp_store();
        store.put(b"k", b"v").unwrap();
        store.delete(b"k").unwrap();
        assert_eq!(store.get(b"k").unwrap(), None);
    }

    #[test]
    fn scan_prefix_returns_only_matching_keys() {
        let (store, _dir) = temp_store();
        store.put(b"block:0", b"a").unwrap();
        store.put(b"block:1", b"b").unwrap();
        store.put(b"tx:0xdead", b"c").unwrap();
        let scanned = store.scan_prefix(b"block:").unwrap();
        assert_eq!(scanned.len(), 2);
        assert!(scanned.iter().all(|(k, _)| k.starts_with(b"block:")));
    }

    #[test]
    fn write_batch_is_atomic_in_effect() {
        let (store, _dir) = temp_store();
        let mut batch = WriteBatch::new();
        batch.put(b"balance:0xa".to_vec(), b"10".to_vec());
        batch.put(b"balance:0xb".to_vec(), b"20".to_vec());
        store.write_batch(batch).unwrap();
        assert_eq!(store.get(b"balance:0xa").unwrap(), Some(b"10".to_vec()));
        assert_eq!(store.get(b"balance:0xb").unwrap(), Some(b"20".to_vec()));
    }
}
