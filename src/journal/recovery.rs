//! Journal Recovery
//!
//! Handles crash recovery by replaying the journal.

use std::fs::{self, OpenOptions};
use std::path::Path;

use crate::error::{LedgerError, Result};

use super::{JournalEntry, JournalReader};

/// Handles journal recovery after a crash
pub struct JournalRecovery;

/// Result of a recovery operation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecoveryResult {
    /// Number of entries successfully recovered
    pub entries_recovered: u64,

    /// Bytes past the last valid entry (torn or damaged tail)
    pub bytes_discarded: u64,

    /// Seq of the last valid entry (0 = none)
    pub last_seq: u64,

    /// Whether the file was cut back to its last valid entry
    pub was_truncated: bool,
}

impl JournalRecovery {
    /// Recover entries from a journal file
    ///
    /// This will:
    /// 1. Read entries in order until end of file
    /// 2. Stop at the first torn or corrupt frame (or a seq that does not
    ///    increase); nothing after it is trusted
    /// 3. Truncate the file to the last valid entry
    /// 4. Return all valid entries in order
    pub fn recover(path: &Path) -> Result<(Vec<JournalEntry>, RecoveryResult)> {
        let (entries, mut result, valid_len) = Self::scan(path)?;

        if result.bytes_discarded > 0 {
            let file = OpenOptions::new().write(true).open(path)?;
            file.set_len(valid_len)?;
            file.sync_all()?;
            result.was_truncated = true;

            tracing::warn!(
                path = %path.display(),
                discarded = result.bytes_discarded,
                last_seq = result.last_seq,
                "Truncated damaged journal tail"
            );
        }

        Ok((entries, result))
    }

    /// Verify integrity of a journal file without modifying it
    pub fn verify(path: &Path) -> Result<RecoveryResult> {
        let (_, result, _) = Self::scan(path)?;
        Ok(result)
    }

    /// Read valid entries; returns them, the stats, and the valid length
    fn scan(path: &Path) -> Result<(Vec<JournalEntry>, RecoveryResult, u64)> {
        let file_len = fs::metadata(path)?.len();
        let mut reader = JournalReader::open(path)?;
        let mut entries: Vec<JournalEntry> = Vec::new();
        let mut result = RecoveryResult::default();

        loop {
            let valid_len = reader.position();
            match reader.next_entry() {
                Ok(Some(entry)) => {
                    if entry.seq <= result.last_seq {
                        tracing::warn!(
                            seq = entry.seq,
                            previous = result.last_seq,
                            "Journal seq went backwards; stopping replay"
                        );
                        result.bytes_discarded = file_len - valid_len;
                        return Ok((entries, result, valid_len));
                    }
                    result.entries_recovered += 1;
                    result.last_seq = entry.seq;
                    entries.push(entry);
                }
                Ok(None) => return Ok((entries, result, valid_len)),
                Err(LedgerError::JournalCorruption(reason)) => {
                    tracing::warn!(offset = valid_len, %reason, "Journal damaged; stopping replay");
                    result.bytes_discarded = file_len - valid_len;
                    return Ok((entries, result, valid_len));
                }
                Err(e) => return Err(e),
            }
        }
    }
}
