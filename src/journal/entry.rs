//! Journal entry definitions
//!
//! Defines the structure of a single committed write set and its framing.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::error::{LedgerError, Result};
use crate::state::WriteOp;

/// Frame header: Seq (8) + CRC (4) + Len (4)
pub const HEADER_SIZE: usize = 16;

/// Largest body a frame may declare (64 MB)
pub const MAX_ENTRY_SIZE: u32 = 64 * 1024 * 1024;

/// One committed write set
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalEntry {
    /// Commit height; strictly increasing through the file
    pub seq: u64,

    /// Timestamp (unix millis) when the entry was written
    pub timestamp_ms: u64,

    /// Writes applied at this height, in key order
    pub writes: Vec<WriteOp>,
}

impl JournalEntry {
    pub fn new(seq: u64, writes: Vec<WriteOp>) -> Self {
        let timestamp_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or_default();

        Self {
            seq,
            timestamp_ms,
            writes,
        }
    }

    /// Encode as a complete frame (header + body)
    pub fn encode(&self) -> Result<Vec<u8>> {
        let body =
            bincode::serialize(self).map_err(|e| LedgerError::Serialization(e.to_string()))?;

        if body.len() > MAX_ENTRY_SIZE as usize {
            return Err(LedgerError::Serialization(format!(
                "Journal entry too large: {} bytes (max {})",
                body.len(),
                MAX_ENTRY_SIZE
            )));
        }

        let mut frame = Vec::with_capacity(HEADER_SIZE + body.len());
        frame.extend_from_slice(&self.seq.to_le_bytes());
        frame.extend_from_slice(&Self::compute_crc(&body).to_le_bytes());
        frame.extend_from_slice(&(body.len() as u32).to_le_bytes());
        frame.extend_from_slice(&body);

        Ok(frame)
    }

    /// Decode a frame body after checking it against its header
    pub fn decode(header_seq: u64, expected_crc: u32, body: &[u8]) -> Result<Self> {
        let actual_crc = Self::compute_crc(body);
        if actual_crc != expected_crc {
            return Err(LedgerError::JournalCorruption(format!(
                "CRC mismatch at seq {}: expected 0x{:08x}, got 0x{:08x}",
                header_seq, expected_crc, actual_crc
            )));
        }

        let entry: JournalEntry = bincode::deserialize(body)
            .map_err(|e| LedgerError::JournalCorruption(format!("undecodable body: {}", e)))?;

        if entry.seq != header_seq {
            return Err(LedgerError::JournalCorruption(format!(
                "header seq {} does not match body seq {}",
                header_seq, entry.seq
            )));
        }

        Ok(entry)
    }

    pub fn compute_crc(body: &[u8]) -> u32 {
        crc32fast::hash(body)
    }
}
