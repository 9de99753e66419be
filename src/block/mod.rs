//! Block Store Module
//!
//! The fixed-size key-value primitive the engine is built on.
//!
//! ## Contract
//! - `open(name)` on a factory yields a handle; opening the same name twice
//!   yields handles over the same data
//! - `write(key, value)` stores an opaque value, rejecting values above the
//!   store's cap with [`ChunkError::ValueTooLarge`]
//! - `read(key)` returns the last value written, or `None`
//! - There is no delete
//!
//! ## Implementations
//! - [`MemoryBlockStore`] -- `HashMap` behind a `RwLock`, for tests and embedding
//! - [`FileBlockStore`] -- in-memory index made durable by an append-only record log

mod memory;
mod file;

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::{ChunkError, Result};

pub use file::{FileBlockStore, FileStoreFactory};
pub use memory::{MemoryBlockStore, MemoryStoreFactory};

/// A named store of opaque byte values under opaque byte keys
#[async_trait]
pub trait BlockStore: Send + Sync {
    /// Store `value` under `key`, replacing any previous value
    async fn write(&self, key: &[u8], value: Bytes) -> Result<()>;

    /// Read the value under `key`
    ///
    /// Returns `Ok(None)` if nothing was ever written there.
    async fn read(&self, key: &[u8]) -> Result<Option<Bytes>>;

    /// Largest value a single write accepts, in bytes
    fn value_cap(&self) -> usize;
}

/// Opens block stores by name
#[async_trait]
pub trait BlockStoreFactory: Send + Sync {
    /// Open (or create) the store called `name`
    async fn open(&self, name: &[u8]) -> Result<Arc<dyn BlockStore>>;
}

/// Reject values a store with `cap` cannot hold
pub(crate) fn check_cap(len: usize, cap: usize) -> Result<()> {
    if len > cap {
        return Err(ChunkError::ValueTooLarge { len, cap });
    }
    Ok(())
}
