//! Log Reader
//!
//! Handles reading entries from the log file.

use std::fs::File;
use std::io::{BufReader, ErrorKind, Read};
use std::path::Path;

use crate::error::{ChunkError, Result};

use super::entry::{LogEntry, HEADER_SIZE, MAX_ENTRY_SIZE};

/// Reads entries from the log file
///
/// A torn frame at the end of the file (partial header or partial data)
/// reads as end-of-log. A complete frame with a bad CRC is an error.
pub struct LogReader {
    reader: BufReader<File>,

    /// Offset just past the last complete, valid frame
    position: u64,
}

impl LogReader {
    /// Open a log file for reading
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        Ok(Self {
            reader: BufReader::new(file),
            position: 0,
        })
    }

    /// Read the next entry from the log
    pub fn next_entry(&mut self) -> Result<Option<LogEntry>> {
        let mut header = [0u8; HEADER_SIZE];
        if self.read_full(&mut header)? < HEADER_SIZE {
            return Ok(None);
        }

        let (lsn, crc, len) = LogEntry::decode_header(&header);
        if len > MAX_ENTRY_SIZE {
            return Err(ChunkError::LogCorruption(format!(
                "frame at offset {} declares {} bytes",
                self.position, len
            )));
        }

        let mut data = vec![0u8; len as usize];
        if self.read_full(&mut data)? < data.len() {
            return Ok(None);
        }

        let entry = LogEntry::decode_data(lsn, crc, &data)?;
        self.position += (HEADER_SIZE + data.len()) as u64;
        Ok(Some(entry))
    }

    /// Offset just past the last valid frame read so far
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Iterate over all valid entries
    pub fn entries(self) -> LogIterator {
        LogIterator {
            reader: self,
            done: false,
        }
    }

    /// Fill `buf` as far as the file allows; returns the bytes read
    fn read_full(&mut self, buf: &mut [u8]) -> Result<usize> {
        let mut filled = 0;
        while filled < buf.len() {
            match self.reader.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
        Ok(filled)
    }
}

/// Iterator over log entries
///
/// Stops after the first error.
pub struct LogIterator {
    reader: LogReader,
    done: bool,
}

impl Iterator for LogIterator {
    type Item = Result<LogEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        match self.reader.next_entry() {
            Ok(Some(entry)) => Some(Ok(entry)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}
