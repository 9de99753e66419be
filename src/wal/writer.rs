//! Log Writer
//!
//! Handles appending entries to the log file.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;

use crate::config::SyncStrategy;
use crate::error::{ChunkError, Result};

use super::entry::{LogEntry, Record};
use super::recovery::LogRecovery;

/// Appends entries to the log file
///
/// A failed append is cut back off the file so later frames never land
/// behind a torn one. If that cut (or an fsync) fails, the writer is
/// poisoned and refuses every further append.
pub struct LogWriter {
    file: File,

    /// File length covering only complete frames
    len: u64,

    /// Set once the on-disk tail can no longer be trusted
    poisoned: bool,

    /// LSN the next append receives
    next_lsn: u64,

    sync_strategy: SyncStrategy,

    /// Entries written since the last fsync
    unsynced: usize,
}

impl LogWriter {
    /// Open or create a log file, continuing after its last valid LSN
    ///
    /// Scans the existing file without modifying it. Callers that already
    /// ran recovery should use [`LogWriter::open_after`] instead.
    pub fn open(path: &Path, sync_strategy: SyncStrategy) -> Result<Self> {
        let last_lsn = if path.exists() {
            LogRecovery::verify(path)?.last_lsn
        } else {
            0
        };
        Self::open_after(path, sync_strategy, last_lsn)
    }

    /// Open or create a log file whose last valid LSN is already known
    pub fn open_after(path: &Path, sync_strategy: SyncStrategy, last_lsn: u64) -> Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        let len = file.metadata()?.len();

        Ok(Self {
            file,
            len,
            poisoned: false,
            next_lsn: last_lsn + 1,
            sync_strategy,
            unsynced: 0,
        })
    }

    /// Append a record, returning its LSN
    pub fn append(&mut self, record: Record) -> Result<u64> {
        self.check_poisoned()?;

        let lsn = self.next_lsn;
        let frame = LogEntry::new(lsn, record).serialize()?;

        if let Err(e) = self.file.write_all(&frame) {
            self.rollback();
            return Err(e.into());
        }
        self.len += frame.len() as u64;
        self.next_lsn += 1;
        self.unsynced += 1;

        match self.sync_strategy {
            SyncStrategy::EveryWrite => self.sync()?,
            SyncStrategy::EveryNEntries { count } => {
                if self.unsynced >= count {
                    self.sync()?;
                }
            }
        }

        Ok(lsn)
    }

    /// Force sync to disk
    pub fn sync(&mut self) -> Result<()> {
        self.check_poisoned()?;

        if let Err(e) = self.file.sync_data() {
            // Dirty pages may already be dropped; nothing written since the
            // last good sync can be vouched for
            tracing::error!("Log fsync failed, refusing further appends: {}", e);
            self.poisoned = true;
            return Err(e.into());
        }
        self.unsynced = 0;
        Ok(())
    }

    /// Whether a failed append or fsync has disabled this writer
    pub fn is_poisoned(&self) -> bool {
        self.poisoned
    }

    /// LSN the next append will receive
    pub fn current_lsn(&self) -> u64 {
        self.next_lsn
    }

    /// Cut a partially written frame back off the file
    fn rollback(&mut self) {
        match self.file.set_len(self.len) {
            Ok(()) => tracing::warn!("Rolled log back to {} bytes after failed append", self.len),
            Err(e) => {
                tracing::error!("Log rollback failed, refusing further appends: {}", e);
                self.poisoned = true;
            }
        }
    }

    fn check_poisoned(&self) -> Result<()> {
        if self.poisoned {
            return Err(ChunkError::Io(io::Error::other(
                "record log writer is poisoned by an earlier failed write",
            )));
        }
        Ok(())
    }
}

impl Drop for LogWriter {
    fn drop(&mut self) {
        if self.unsynced > 0 && !self.poisoned {
            if let Err(e) = self.file.sync_data() {
                tracing::warn!("Failed to sync log on close: {}", e);
            }
        }
    }
}
