//! Log Recovery
//!
//! Handles crash recovery by replaying the log.

use std::fs::{self, OpenOptions};
use std::path::Path;

use crate::error::{ChunkError, Result};

use super::entry::LogEntry;
use super::reader::LogReader;

/// Handles log recovery after crash
pub struct LogRecovery;

/// Result of a recovery operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecoveryResult {
    /// Number of entries successfully recovered
    pub entries_recovered: u64,

    /// Number of corrupted entries found (scanning stops at the first)
    pub entries_corrupted: u64,

    /// Last valid LSN (0 if none)
    pub last_lsn: u64,

    /// Whether bytes past the last valid entry were (or would be) removed
    pub was_truncated: bool,
}

impl LogRecovery {
    /// Recover entries from a log file
    ///
    /// This will:
    /// 1. Read all valid entries
    /// 2. Stop at the first corrupted entry
    /// 3. Truncate everything after the last valid entry
    /// 4. Return all valid entries in order
    pub fn recover(path: &Path) -> Result<(Vec<LogEntry>, RecoveryResult)> {
        let (entries, result, valid_len) = Self::scan(path)?;

        if result.was_truncated {
            tracing::warn!(
                "Truncating log {} to {} bytes ({} corrupted entries)",
                path.display(),
                valid_len,
                result.entries_corrupted
            );
            let file = OpenOptions::new().write(true).open(path)?;
            file.set_len(valid_len)?;
            file.sync_all()?;
        }

        Ok((entries, result))
    }

    /// Verify integrity of a log file without modifying it
    pub fn verify(path: &Path) -> Result<RecoveryResult> {
        let (_, result, _) = Self::scan(path)?;
        Ok(result)
    }

    /// Read valid entries; returns them with stats and the valid byte length
    fn scan(path: &Path) -> Result<(Vec<LogEntry>, RecoveryResult, u64)> {
        let file_len = fs::metadata(path)?.len();
        let mut reader = LogReader::open(path)?;
        let mut entries = Vec::new();
        let mut entries_corrupted = 0;

        loop {
            match reader.next_entry() {
                Ok(Some(entry)) => entries.push(entry),
                Ok(None) => break,
                Err(ChunkError::LogCorruption(reason)) => {
                    tracing::warn!("Corrupted log entry in {}: {}", path.display(), reason);
                    entries_corrupted += 1;
                    break;
                }
                Err(ChunkError::Serialization(reason)) => {
                    tracing::warn!("Undecodable log entry in {}: {}", path.display(), reason);
                    entries_corrupted += 1;
                    break;
                }
                Err(e) => return Err(e),
            }
        }

        let valid_len = reader.position();
        let result = RecoveryResult {
            entries_recovered: entries.len() as u64,
            entries_corrupted,
            last_lsn: entries.last().map(|e| e.lsn).unwrap_or(0),
            was_truncated: valid_len < file_len,
        };

        Ok((entries, result, valid_len))
    }
}
