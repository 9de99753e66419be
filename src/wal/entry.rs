//! Log Entry definitions
//!
//! Defines the structure and framing of individual log entries.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::error::{ChunkError, Result};

/// Frame header size: LSN (8) + CRC (4) + Len (4)
pub const HEADER_SIZE: usize = 16;

/// Largest data section a frame may declare (64 MB)
///
/// A length above this is treated as corruption rather than allocated.
pub const MAX_ENTRY_SIZE: u32 = 64 * 1024 * 1024;

/// A single entry in the log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Log Sequence Number - monotonically increasing, starting at 1
    pub lsn: u64,

    /// The block store write being logged
    pub record: Record,

    /// Timestamp (unix millis) when entry was created
    pub timestamp: u64,
}

/// One block store write
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub key: Vec<u8>,
    pub value: Vec<u8>,
}

impl LogEntry {
    /// Create an entry stamped with the current time
    pub fn new(lsn: u64, record: Record) -> Self {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);

        Self {
            lsn,
            record,
            timestamp,
        }
    }

    /// Encode as a complete frame (header + data)
    pub fn serialize(&self) -> Result<Vec<u8>> {
        let data = bincode::serialize(self)?;
        if data.len() > MAX_ENTRY_SIZE as usize {
            return Err(ChunkError::Serialization(format!(
                "log entry of {} bytes exceeds frame limit",
                data.len()
            )));
        }

        let mut frame = Vec::with_capacity(HEADER_SIZE + data.len());
        frame.extend_from_slice(&self.lsn.to_be_bytes());
        frame.extend_from_slice(&Self::compute_crc(&data).to_be_bytes());
        frame.extend_from_slice(&(data.len() as u32).to_be_bytes());
        frame.extend_from_slice(&data);
        Ok(frame)
    }

    /// Decode a complete frame
    pub fn deserialize(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < HEADER_SIZE {
            return Err(ChunkError::LogCorruption(format!(
                "frame of {} bytes is shorter than header",
                bytes.len()
            )));
        }

        let mut header = [0u8; HEADER_SIZE];
        header.copy_from_slice(&bytes[..HEADER_SIZE]);
        let (lsn, crc, len) = Self::decode_header(&header);

        let data = &bytes[HEADER_SIZE..];
        if data.len() != len as usize {
            return Err(ChunkError::LogCorruption(format!(
                "frame declares {} data bytes, found {}",
                len,
                data.len()
            )));
        }

        Self::decode_data(lsn, crc, data)
    }

    /// CRC32 over a frame's data section
    pub fn compute_crc(data: &[u8]) -> u32 {
        crc32fast::hash(data)
    }

    /// Split a header into (lsn, crc, len)
    pub(crate) fn decode_header(header: &[u8; HEADER_SIZE]) -> (u64, u32, u32) {
        let mut lsn = [0u8; 8];
        let mut crc = [0u8; 4];
        let mut len = [0u8; 4];
        lsn.copy_from_slice(&header[0..8]);
        crc.copy_from_slice(&header[8..12]);
        len.copy_from_slice(&header[12..16]);
        (
            u64::from_be_bytes(lsn),
            u32::from_be_bytes(crc),
            u32::from_be_bytes(len),
        )
    }

    /// Check a data section against its header and decode it
    pub(crate) fn decode_data(lsn: u64, crc: u32, data: &[u8]) -> Result<Self> {
        let computed = Self::compute_crc(data);
        if computed != crc {
            return Err(ChunkError::LogCorruption(format!(
                "CRC mismatch for LSN {}: expected {:08x}, computed {:08x}",
                lsn, crc, computed
            )));
        }

        let entry: LogEntry = bincode::deserialize(data)?;
        if entry.lsn != lsn {
            return Err(ChunkError::LogCorruption(format!(
                "header LSN {} does not match entry LSN {}",
                lsn, entry.lsn
            )));
        }

        Ok(entry)
    }
}
