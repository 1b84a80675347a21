//! Journal Writer
//!
//! Handles appending entries to the journal file.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::config::JournalSyncStrategy;
use crate::error::{LedgerError, Result};

use super::JournalEntry;

/// Writes entries to the journal file
pub struct JournalWriter {
    /// Path of the journal file
    path: PathBuf,

    /// Buffered append handle
    writer: BufWriter<File>,

    /// When to fsync
    sync_strategy: JournalSyncStrategy,

    /// Entries appended since the last fsync
    unsynced: usize,

    /// Seq of the last appended entry (0 = none this session)
    last_seq: u64,

    /// File length covering every successful append
    len: u64,

    /// Set when a failed append could not be cut back out of the file
    poisoned: bool,

    #[cfg(test)]
    fail_next_sync: bool,
}

impl JournalWriter {
    /// Open or create a journal file; new entries go at the end
    pub fn open(path: &Path, sync_strategy: JournalSyncStrategy) -> Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        let len = file.metadata()?.len();

        Ok(Self {
            path: path.to_path_buf(),
            writer: BufWriter::new(file),
            sync_strategy,
            unsynced: 0,
            last_seq: 0,
            len,
            poisoned: false,
            #[cfg(test)]
            fail_next_sync: false,
        })
    }

    /// Append an entry to the journal
    ///
    /// The frame is flushed to the OS before returning; whether it is also
    /// fsynced depends on the sync strategy. If any step fails the frame is
    /// cut back out of the file, so a commit reported as failed never
    /// replays. When that cut fails too, the writer refuses further appends.
    pub fn append(&mut self, entry: &JournalEntry) -> Result<()> {
        if self.poisoned {
            return Err(LedgerError::StoreUnavailable(format!(
                "journal {} has an unrecoverable partial write; reopen the ledger",
                self.path.display()
            )));
        }

        let frame = entry.encode()?;
        if let Err(e) = self.write_frame(&frame) {
            self.rollback();
            return Err(e);
        }

        self.len += frame.len() as u64;
        self.last_seq = entry.seq;
        Ok(())
    }

    fn write_frame(&mut self, frame: &[u8]) -> Result<()> {
        self.writer.write_all(frame)?;
        self.writer.flush()?;

        let due = match self.sync_strategy {
            JournalSyncStrategy::EveryCommit => true,
            JournalSyncStrategy::EveryNCommits { count } => self.unsynced + 1 >= count.max(1),
        };
        if due {
            self.sync()?;
        } else {
            self.unsynced += 1;
        }
        Ok(())
    }

    /// Drop whatever the failed append left buffered or on disk
    fn rollback(&mut self) {
        let restored = OpenOptions::new()
            .append(true)
            .open(&self.path)
            .and_then(|file| {
                file.set_len(self.len)?;
                Ok(file)
            });

        match restored {
            Ok(file) => {
                // into_parts hands back the buffer without flushing it
                let stale = std::mem::replace(&mut self.writer, BufWriter::new(file));
                let (_, _unwritten) = stale.into_parts();
                tracing::warn!(
                    path = %self.path.display(),
                    len = self.len,
                    "Journal append rolled back"
                );
            }
            Err(e) => {
                self.poisoned = true;
                tracing::error!(
                    path = %self.path.display(),
                    error = %e,
                    "Journal rollback failed"
                );
            }
        }
    }

    /// Force sync to disk
    pub fn sync(&mut self) -> Result<()> {
        self.writer.flush()?;
        self.check_injected_failure()?;
        self.writer.get_ref().sync_data()?;
        self.unsynced = 0;
        Ok(())
    }

    #[cfg(test)]
    fn check_injected_failure(&mut self) -> Result<()> {
        if std::mem::take(&mut self.fail_next_sync) {
            return Err(std::io::Error::new(std::io::ErrorKind::Other, "sync_data failed").into());
        }
        Ok(())
    }

    #[cfg(not(test))]
    fn check_injected_failure(&mut self) -> Result<()> {
        Ok(())
    }

    /// Seq of the last entry appended through this writer
    pub fn last_seq(&self) -> u64 {
        self.last_seq
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
