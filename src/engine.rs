//! Engine Module
//!
//! The storage engine that stores strings of any length over a block store.
//!
//! ## Responsibilities
//! - Split values into blocks no larger than the configured block size
//! - Keep the size record and the block set of each key consistent
//! - Reassemble blocks on read and detect inconsistent layouts
//! - Verify every write by reading it back
//!
//! ## Layout per logical key
//! ```text
//! size key  ──▶ "3"             (decimal block count)
//! block 0   ──▶ bytes[0..B]
//! block 1   ──▶ bytes[B..2B]
//! block 2   ──▶ bytes[2B..len]
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;

use crate::block::{BlockStore, BlockStoreFactory};
use crate::chunk;
use crate::command::{Command, Reply};
use crate::config::Config;
use crate::error::{ChunkError, Result};
use crate::keys;
use crate::storage::Storage;

/// Upper bound on blocks reserved up front by a read
///
/// The size record is untrusted until its blocks have been found.
const MAX_PREALLOCATED_BLOCKS: u64 = 1024;

/// The string storage engine
///
/// ## Concurrency Model
///
/// The engine holds no mutable state of its own, only the block store
/// handle opened at construction. Operations on different keys may run
/// concurrently. Operations on the same key are not isolated from each
/// other: callers keep a single writer per key.
///
/// ## Space
///
/// Shrinking a value, or deleting it, only lowers the size record. Blocks
/// past the new count stay in the block store, unreachable from here, and
/// are overwritten the next time the key grows past them.
pub struct Engine {
    /// Engine configuration
    config: Config,

    /// Block store opened once and reused for every operation
    store: Arc<dyn BlockStore>,
}

impl Engine {
    /// Open the store named in `config` through `factory`
    pub async fn open(factory: &dyn BlockStoreFactory, config: Config) -> Result<Self> {
        config.validate()?;
        let store = factory.open(config.store_name.as_bytes()).await?;
        tracing::info!(
            "Engine opened store {:?} with block size {}",
            config.store_name,
            config.block_size
        );
        Self::with_store(store, config)
    }

    /// Build an engine over an already opened store
    pub fn with_store(store: Arc<dyn BlockStore>, config: Config) -> Result<Self> {
        config.validate()?;
        if config.block_size > store.value_cap() {
            return Err(ChunkError::Config(format!(
                "block_size {} exceeds the block store cap of {}",
                config.block_size,
                store.value_cap()
            )));
        }

        Ok(Self { config, store })
    }

    /// Execute a command
    ///
    /// Routes commands to appropriate handlers
    pub async fn execute(&self, command: Command) -> Result<Reply> {
        match command {
            Command::Write { key, value } => {
                self.write(&key, &value).await?;
                Ok(Reply::Done)
            }
            Command::Read { key } => Ok(Reply::Value(self.read(&key).await?)),
            Command::Delete { key } => {
                self.delete(&key).await?;
                Ok(Reply::Done)
            }
            Command::Exists { key } => Ok(Reply::Exists(self.key_exists(&key).await?)),
            Command::Blocks { key } => Ok(Reply::Blocks(self.block_count(&key).await?)),
        }
    }

    /// Write `value` under `key`
    ///
    /// Steps:
    /// 1. Split the value into blocks
    /// 2. Write every block
    /// 3. Write the block count as the size record
    /// 4. Read the key back and compare
    ///
    /// The new value becomes visible at step 3. Until then readers see the
    /// previous size record.
    pub async fn write(&self, key: &str, value: &str) -> Result<()> {
        // Step 1: Split
        let payload = Bytes::copy_from_slice(value.as_bytes());
        let blocks = chunk::split(&payload, self.config.block_size);
        let count = blocks.len() as u64;

        tracing::debug!("Write {:?}: {} bytes in {} blocks", key, payload.len(), count);

        // Step 2: Blocks
        for (index, block) in blocks.into_iter().enumerate() {
            tracing::trace!("Write {:?} block {} ({} bytes)", key, index, block.len());
            self.store
                .write(&keys::block_key(key, index as u64), block)
                .await?;
        }

        // Step 3: Size record
        self.store
            .write(&keys::size_key(key), Bytes::from(count.to_string()))
            .await?;

        // Step 4: Verify
        self.verify_write(key, value, count).await
    }

    /// Read the value under `key`
    ///
    /// Returns:
    /// - `Ok(Some(value))` -- key holds a value
    /// - `Ok(None)` -- key was never written, or was deleted
    /// - `Err(_)` with [`ChunkError::is_consistency_failure`] -- the size
    ///   record and blocks disagree
    pub async fn read(&self, key: &str) -> Result<Option<String>> {
        let count = match self.size_record(key).await? {
            Some(count) if count > 0 => count,
            _ => {
                tracing::debug!("Read {:?}: absent", key);
                return Ok(None);
            }
        };

        let blocks = self.read_blocks(key, count).await?;
        let bytes = chunk::join(&blocks);

        tracing::debug!("Read {:?}: {} bytes from {} blocks", key, bytes.len(), count);

        String::from_utf8(bytes)
            .map(Some)
            .map_err(|e| ChunkError::CorruptValue {
                key: key.to_string(),
                reason: e.to_string(),
            })
    }

    /// Delete `key`
    ///
    /// Writes the empty value, so the size record drops to zero. Deleting an
    /// absent key leaves it absent.
    pub async fn delete(&self, key: &str) -> Result<()> {
        tracing::debug!("Delete {:?}", key);
        self.write(key, "").await
    }

    /// Whether `key` holds a non-empty value
    pub async fn key_exists(&self, key: &str) -> Result<bool> {
        Ok(self.size_record(key).await?.unwrap_or(0) > 0)
    }

    /// Number of blocks `key` currently owns (0 when absent)
    pub async fn block_count(&self, key: &str) -> Result<u64> {
        Ok(self.size_record(key).await?.unwrap_or(0))
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Get the block size in bytes
    pub fn block_size(&self) -> usize {
        self.config.block_size
    }

    /// Get the underlying block store
    pub fn store(&self) -> &Arc<dyn BlockStore> {
        &self.store
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    /// Parse the size record; `None` when it was never written
    async fn size_record(&self, key: &str) -> Result<Option<u64>> {
        let raw = match self.store.read(&keys::size_key(key)).await? {
            Some(raw) => raw,
            None => return Ok(None),
        };

        std::str::from_utf8(&raw)
            .ok()
            .and_then(|text| text.parse::<u64>().ok())
            .map(Some)
            .ok_or_else(|| {
                let err = ChunkError::CorruptSizeRecord {
                    key: key.to_string(),
                    raw: String::from_utf8_lossy(&raw).into_owned(),
                };
                tracing::warn!("{}", err);
                err
            })
    }

    /// Read blocks `0..count`, checking each has the size the layout implies
    async fn read_blocks(&self, key: &str, count: u64) -> Result<Vec<Bytes>> {
        let block_size = self.config.block_size;
        let mut blocks = Vec::with_capacity(count.min(MAX_PREALLOCATED_BLOCKS) as usize);

        for index in 0..count {
            let block = match self.store.read(&keys::block_key(key, index)).await? {
                Some(block) => block,
                None => {
                    let err = ChunkError::MissingBlock {
                        key: key.to_string(),
                        index,
                        expected: count,
                    };
                    tracing::warn!("{}", err);
                    return Err(err);
                }
            };

            let is_last = index + 1 == count;
            let well_formed = if is_last {
                !block.is_empty() && block.len() <= block_size
            } else {
                block.len() == block_size
            };
            if !well_formed {
                let err = ChunkError::CorruptValue {
                    key: key.to_string(),
                    reason: format!(
                        "block {} of {} holds {} bytes with block size {}",
                        index,
                        count,
                        block.len(),
                        block_size
                    ),
                };
                tracing::warn!("{}", err);
                return Err(err);
            }

            blocks.push(block);
        }

        Ok(blocks)
    }

    /// Read back what `write` just stored and compare
    async fn verify_write(&self, key: &str, value: &str, count: u64) -> Result<()> {
        let recorded = self.size_record(key).await?;
        if recorded != Some(count) {
            return Err(ChunkError::WriteVerification {
                key: key.to_string(),
                reason: format!("size record is {:?}, wrote {} blocks", recorded, count),
            });
        }

        let expected = if value.is_empty() { None } else { Some(value) };
        let read_back = self.read(key).await?;
        if read_back.as_deref() != expected {
            return Err(ChunkError::WriteVerification {
                key: key.to_string(),
                reason: "value read back differs from value written".to_string(),
            });
        }

        Ok(())
    }
}

#[async_trait]
impl Storage for Engine {
    async fn write(&self, key: &str, value: &str) -> Result<()> {
        Engine::write(self, key, value).await
    }

    async fn read(&self, key: &str) -> Result<Option<String>> {
        Engine::read(self, key).await
    }

    async fn delete(&self, key: &str) -> Result<()> {
        Engine::delete(self, key).await
    }

    async fn key_exists(&self, key: &str) -> Result<bool> {
        Engine::key_exists(self, key).await
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("store_name", &self.config.store_name)
            .field("block_size", &self.config.block_size)
            .finish()
    }
}
