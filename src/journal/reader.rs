//! Journal Reader
//!
//! Handles reading entries from the journal file.

use std::fs::File;
use std::io::{BufReader, ErrorKind, Read};
use std::path::Path;

use crate::error::{LedgerError, Result};

use super::entry::{JournalEntry, HEADER_SIZE, MAX_ENTRY_SIZE};

/// Reads entries from the journal file
pub struct JournalReader {
    reader: BufReader<File>,

    /// Byte offset just past the last entry returned
    position: u64,
}

impl JournalReader {
    /// Open a journal file for reading
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        Ok(Self {
            reader: BufReader::new(file),
            position: 0,
        })
    }

    /// Read the next entry from the journal
    ///
    /// Returns:
    /// - `Ok(Some(entry))`: a complete, checksummed entry
    /// - `Ok(None)`: clean end of file
    /// - `Err(JournalCorruption)`: torn or damaged frame at `position()`
    pub fn next_entry(&mut self) -> Result<Option<JournalEntry>> {
        let mut header = [0u8; HEADER_SIZE];
        let read = self.read_full(&mut header)?;
        if read == 0 {
            return Ok(None);
        }
        if read < HEADER_SIZE {
            return Err(LedgerError::JournalCorruption(format!(
                "torn header at offset {}: {} of {} bytes",
                self.position, read, HEADER_SIZE
            )));
        }

        let mut seq_bytes = [0u8; 8];
        seq_bytes.copy_from_slice(&header[0..8]);
        let seq = u64::from_le_bytes(seq_bytes);
        let crc = u32::from_le_bytes([header[8], header[9], header[10], header[11]]);
        let len = u32::from_le_bytes([header[12], header[13], header[14], header[15]]);

        if len > MAX_ENTRY_SIZE {
            return Err(LedgerError::JournalCorruption(format!(
                "entry at offset {} declares {} bytes (max {})",
                self.position, len, MAX_ENTRY_SIZE
            )));
        }

        let mut body = vec![0u8; len as usize];
        let read = self.read_full(&mut body)?;
        if read < body.len() {
            return Err(LedgerError::JournalCorruption(format!(
                "torn body at offset {}: {} of {} bytes",
                self.position, read, len
            )));
        }

        let entry = JournalEntry::decode(seq, crc, &body)?;
        self.position += (HEADER_SIZE + body.len()) as u64;
        Ok(Some(entry))
    }

    /// Offset just past the last valid entry
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Iterate over entries until end of file or the first bad frame
    pub fn entries(self) -> JournalIterator {
        JournalIterator {
            reader: self,
            done: false,
        }
    }

    /// Fill `buf` as far as the file allows; returns bytes read
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

/// Iterator over journal entries
///
/// Yields at most one error, then stops.
pub struct JournalIterator {
    reader: JournalReader,
    done: bool,
}

impl Iterator for JournalIterator {
    type Item = Result<JournalEntry>;

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
