//! In-memory block store

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::{Mutex, RwLock};

use crate::error::Result;

use super::{check_cap, BlockStore, BlockStoreFactory};

/// HashMap-based block store
///
/// Values are held as `Bytes`, so reads hand out cheap clones.
pub struct MemoryBlockStore {
    records: RwLock<HashMap<Vec<u8>, Bytes>>,
    value_cap: usize,
}

impl MemoryBlockStore {
    /// Create an empty store accepting values up to `value_cap` bytes
    pub fn new(value_cap: usize) -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
            value_cap,
        }
    }

    /// Number of keys ever written (no key is ever removed)
    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    /// Returns `true` if nothing was written yet
    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }

    /// Total bytes across all stored values
    pub fn total_bytes(&self) -> usize {
        self.records.read().values().map(Bytes::len).sum()
    }
}

#[async_trait]
impl BlockStore for MemoryBlockStore {
    async fn write(&self, key: &[u8], value: Bytes) -> Result<()> {
        check_cap(value.len(), self.value_cap)?;
        self.records.write().insert(key.to_vec(), value);
        Ok(())
    }

    async fn read(&self, key: &[u8]) -> Result<Option<Bytes>> {
        Ok(self.records.read().get(key).cloned())
    }

    fn value_cap(&self) -> usize {
        self.value_cap
    }
}

impl std::fmt::Debug for MemoryBlockStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryBlockStore")
            .field("record_count", &self.len())
            .field("value_cap", &self.value_cap)
            .finish()
    }
}

/// Hands out one shared [`MemoryBlockStore`] per name
pub struct MemoryStoreFactory {
    stores: Mutex<HashMap<Vec<u8>, Arc<MemoryBlockStore>>>,
    value_cap: usize,
}

impl MemoryStoreFactory {
    /// Create a factory whose stores accept values up to `value_cap` bytes
    pub fn new(value_cap: usize) -> Self {
        Self {
            stores: Mutex::new(HashMap::new()),
            value_cap,
        }
    }

    /// Number of distinct stores opened so far
    pub fn store_count(&self) -> usize {
        self.stores.lock().len()
    }
}

#[async_trait]
impl BlockStoreFactory for MemoryStoreFactory {
    async fn open(&self, name: &[u8]) -> Result<Arc<dyn BlockStore>> {
        let mut stores = self.stores.lock();
        let store = stores
            .entry(name.to_vec())
            .or_insert_with(|| Arc::new(MemoryBlockStore::new(self.value_cap)));
        Ok(Arc::clone(store) as Arc<dyn BlockStore>)
    }
}
