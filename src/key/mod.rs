//! Key Module
//!
//! Composite keys for the world state.
//!
//! ## Responsibilities
//! - Encode (tag, segments) into one sortable, collision-free byte key
//! - Derive prefix keys for per-device range scans
//! - Render timestamps so byte order matches numeric order
//!
//! ## Key Layout
//! ```text
//! ┌────────┬────────────────┬──────┬───────────┬──────┬────────────────┬──────┐
//! │ Marker │ esc("reading") │ 0x00 │ esc(uuid) │ 0x00 │ esc(timestamp) │ 0x00 │
//! │  0x00  │      tag       │ term │ segment 1 │ term │   segment 2    │ term │
//! └────────┴────────────────┴──────┴───────────┴──────┴────────────────┴──────┘
//!
//! esc: 0x00 → 0x01 0x01, 0x01 → 0x01 0x02, other bytes unchanged
//! ```
//!
//! Because `0x00` never appears inside an escaped segment, the first `0x00`
//! after a segment starts is always its terminator. Two keys therefore share
//! a segment boundary only if they share every segment before it, which makes
//! the device prefix `0x00 reading 0x00 uuid 0x00` match that device's keys
//! and nothing else.

mod composite;
mod timestamp;

pub use composite::{CompositeKey, DISPLAY_SEPARATOR, NAMESPACE_MARKER};
pub use timestamp::{TimestampLayout, FIXED_WIDTH_DIGITS};

use crate::error::{LedgerError, Result};

/// Domain tag for every sensor reading key
pub const READING_TAG: &str = "reading";

/// The decoded primary key of a reading
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct ReadingKey {
    pub uuid: String,
    pub timestamp: u64,
}

impl ReadingKey {
    pub fn new(uuid: impl Into<String>, timestamp: u64) -> Self {
        Self {
            uuid: uuid.into(),
            timestamp,
        }
    }

    /// Full key for one reading: `encode("reading", [uuid, ts])`
    pub fn encode(uuid: &str, timestamp: u64, layout: TimestampLayout) -> CompositeKey {
        let ts = layout.render(timestamp);
        CompositeKey::encode(READING_TAG, &[uuid, ts.as_str()])
    }

    /// Prefix of every reading key of one device: `encode("reading", [uuid])`
    pub fn device_prefix(uuid: &str) -> CompositeKey {
        CompositeKey::encode(READING_TAG, &[uuid])
    }

    /// Recover uuid and timestamp from a full reading key
    pub fn decode(key: &CompositeKey, layout: TimestampLayout) -> Result<Self> {
        let (tag, segments) = key.decode()?;
        if tag != READING_TAG {
            return Err(LedgerError::KeyDecode(format!(
                "expected tag {:?}, found {:?}",
                READING_TAG, tag
            )));
        }

        match segments.as_slice() {
            [uuid, ts] => Ok(Self {
                uuid: uuid.clone(),
                timestamp: layout.parse(ts)?,
            }),
            _ => Err(LedgerError::KeyDecode(format!(
                "reading key has {} segments, expected 2",
                segments.len()
            ))),
        }
    }

    /// Encode this key under `layout`
    pub fn to_key(&self, layout: TimestampLayout) -> CompositeKey {
        Self::encode(&self.uuid, self.timestamp, layout)
    }
}
