//! File-backed block store
//!
//! Every write is appended to a record log first, then applied to an
//! in-memory index that serves reads. Opening a store replays its log.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::{Mutex, RwLock};

use crate::config::{Config, SyncStrategy};
use crate::error::Result;
use crate::wal::{LogRecovery, LogWriter, Record};

use super::{check_cap, BlockStore, BlockStoreFactory};

/// Block store persisted in a single log file
///
/// ## Concurrency:
/// - `log`: Mutex, one append at a time; held while the index is updated so
///   index order always matches log order
/// - `index`: RwLock, many concurrent readers
///
/// Log appends and fsyncs run on tokio's blocking pool.
pub struct FileBlockStore {
    path: PathBuf,
    index: Arc<RwLock<HashMap<Vec<u8>, Bytes>>>,
    log: Arc<Mutex<LogWriter>>,
    value_cap: usize,
}

impl FileBlockStore {
    /// Open or create the store backed by the log at `path`
    pub fn open(path: &Path, sync_strategy: SyncStrategy, value_cap: usize) -> Result<Self> {
        let mut index = HashMap::new();

        let last_lsn = if path.exists() {
            let (entries, result) = LogRecovery::recover(path)?;
            if result.entries_recovered > 0 || result.entries_corrupted > 0 {
                tracing::info!(
                    "Log recovery for {}: {} entries recovered, {} corrupted, last_lsn={}",
                    path.display(),
                    result.entries_recovered,
                    result.entries_corrupted,
                    result.last_lsn
                );
            }

            // Later entries overwrite earlier ones: last write wins
            for entry in entries {
                index.insert(entry.record.key, Bytes::from(entry.record.value));
            }
            result.last_lsn
        } else {
            0
        };

        let log = LogWriter::open_after(path, sync_strategy, last_lsn)?;

        Ok(Self {
            path: path.to_path_buf(),
            index: Arc::new(RwLock::new(index)),
            log: Arc::new(Mutex::new(log)),
            value_cap,
        })
    }

    /// Path of the backing log
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of distinct keys in the store
    pub fn len(&self) -> usize {
        self.index.read().len()
    }

    /// Returns `true` if nothing was written yet
    pub fn is_empty(&self) -> bool {
        self.index.read().is_empty()
    }

    /// Force the log to disk
    pub fn sync(&self) -> Result<()> {
        self.log.lock().sync()
    }
}

#[async_trait]
impl BlockStore for FileBlockStore {
    async fn write(&self, key: &[u8], value: Bytes) -> Result<()> {
        check_cap(value.len(), self.value_cap)?;

        let log = Arc::clone(&self.log);
        let index = Arc::clone(&self.index);
        let key = key.to_vec();

        let lsn = tokio::task::spawn_blocking(move || -> Result<u64> {
            let mut log = log.lock();
            let lsn = log.append(Record {
                key: key.clone(),
                value: value.to_vec(),
            })?;
            index.write().insert(key, value);
            Ok(lsn)
        })
        .await??;

        tracing::trace!("Logged block write at LSN {}", lsn);
        Ok(())
    }

    async fn read(&self, key: &[u8]) -> Result<Option<Bytes>> {
        Ok(self.index.read().get(key).cloned())
    }

    fn value_cap(&self) -> usize {
        self.value_cap
    }
}

/// Opens [`FileBlockStore`]s under a data directory, one per name
///
/// Opened stores are cached so every open of a name shares one handle.
pub struct FileStoreFactory {
    data_dir: PathBuf,
    sync_strategy: SyncStrategy,
    value_cap: usize,
    /// Held across the blocking open so one name is never recovered twice
    stores: tokio::sync::Mutex<HashMap<Vec<u8>, Arc<FileBlockStore>>>,
}

impl FileStoreFactory {
    pub fn new(data_dir: impl Into<PathBuf>, sync_strategy: SyncStrategy, value_cap: usize) -> Self {
        Self {
            data_dir: data_dir.into(),
            sync_strategy,
            value_cap,
            stores: tokio::sync::Mutex::new(HashMap::new()),
        }
    }

    /// Build a factory from the storage and log settings of `config`
    pub fn from_config(config: &Config) -> Self {
        Self::new(&config.data_dir, config.sync_strategy, config.value_cap)
    }

    /// Get the data directory path
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Log file path for the store called `name`
    ///
    /// Names are arbitrary bytes, so they are hex-encoded into the file name.
    pub fn store_path(&self, name: &[u8]) -> PathBuf {
        self.data_dir.join(format!("store_{}.log", hex::encode(name)))
    }
}

#[async_trait]
impl BlockStoreFactory for FileStoreFactory {
    async fn open(&self, name: &[u8]) -> Result<Arc<dyn BlockStore>> {
        let mut stores = self.stores.lock().await;
        if let Some(store) = stores.get(name) {
            return Ok(Arc::clone(store) as Arc<dyn BlockStore>);
        }

        let data_dir = self.data_dir.clone();
        let path = self.store_path(name);
        let (sync_strategy, value_cap) = (self.sync_strategy, self.value_cap);

        // Replaying the log reads the whole file
        let store = tokio::task::spawn_blocking(move || -> Result<FileBlockStore> {
            fs::create_dir_all(&data_dir)?;
            FileBlockStore::open(&path, sync_strategy, value_cap)
        })
        .await??;
        let store = Arc::new(store);
        tracing::info!("Opened block store at {}", store.path().display());

        stores.insert(name.to_vec(), Arc::clone(&store));
        Ok(store as Arc<dyn BlockStore>)
    }
}
