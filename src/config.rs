//! Configuration for ChunkKV
//!
//! Centralized configuration with sensible defaults.

use std::path::PathBuf;

use crate::error::{ChunkError, Result};

/// Main configuration for a ChunkKV instance
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Storage Configuration
    // -------------------------------------------------------------------------
    /// Root directory for file-backed block stores
    /// Internal structure:
    ///   {data_dir}/
    ///     └── store_{hex(store name)}.log   (one record log per store)
    pub data_dir: PathBuf,

    /// Name of the block store the engine opens
    pub store_name: String,

    // -------------------------------------------------------------------------
    // Block Configuration
    // -------------------------------------------------------------------------
    /// Chunk boundary in bytes. Fixed for the lifetime of the data: values
    /// written under one block size cannot be read back under another.
    pub block_size: usize,

    /// Per-write value cap enforced by the built-in block stores
    pub value_cap: usize,

    // -------------------------------------------------------------------------
    // Log Configuration
    // -------------------------------------------------------------------------
    /// Sync strategy: how often to fsync the record log
    pub sync_strategy: SyncStrategy,
}

/// Record log sync strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStrategy {
    /// fsync after every write (safest, slowest)
    EveryWrite,

    /// fsync after N unsynced entries (balanced durability/performance)
    EveryNEntries { count: usize },
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./chunkkv_data"),
            store_name: "chunkkv".to_string(),
            block_size: 100,
            value_cap: 4096,
            sync_strategy: SyncStrategy::EveryNEntries { count: 100 },
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Check the config for values the engine cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.block_size == 0 {
            return Err(ChunkError::Config("block_size must be positive".to_string()));
        }
        if self.value_cap == 0 {
            return Err(ChunkError::Config("value_cap must be positive".to_string()));
        }
        if self.block_size > self.value_cap {
            return Err(ChunkError::Config(format!(
                "block_size {} exceeds value_cap {}",
                self.block_size, self.value_cap
            )));
        }
        if let SyncStrategy::EveryNEntries { count: 0 } = self.sync_strategy {
            return Err(ChunkError::Config(
                "EveryNEntries sync count must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the data directory (root for file-backed stores)
    pub fn data_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.data_dir = path.into();
        self
    }

    /// Set the name of the block store to open
    pub fn store_name(mut self, name: impl Into<String>) -> Self {
        self.config.store_name = name.into();
        self
    }

    /// Set the block size (in bytes)
    pub fn block_size(mut self, size: usize) -> Self {
        self.config.block_size = size;
        self
    }

    /// Set the per-write value cap of the built-in block stores (in bytes)
    pub fn value_cap(mut self, cap: usize) -> Self {
        self.config.value_cap = cap;
        self
    }

    /// Set the record log sync strategy
    pub fn sync_strategy(mut self, strategy: SyncStrategy) -> Self {
        self.config.sync_strategy = strategy;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
