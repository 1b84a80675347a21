//! Journal Module
//!
//! Append-only log of committed write sets.
//!
//! ## Responsibilities
//! - Append each committed write set before it becomes visible
//! - CRC32 checksums for corruption detection
//! - Sequence numbers (commit heights) for ordering
//! - Replay on open to rebuild the world state
//!
//! ## File Format
//! ```text
//! ┌─────────────────────────────────────────┐
//! │ Entry 1                                 │
//! │ ┌─────────┬─────────┬────────┬────────┐ │
//! │ │ Seq (8) │ CRC (4) │Len (4) │ Body   │ │
//! │ └─────────┴─────────┴────────┴────────┘ │
//! ├─────────────────────────────────────────┤
//! │ Entry 2                                 │
//! │ ┌─────────┬─────────┬────────┬────────┐ │
//! │ │ Seq (8) │ CRC (4) │Len (4) │ Body   │ │
//! │ └─────────┴─────────┴────────┴────────┘ │
//! └─────────────────────────────────────────┘
//! ```
//!
//! Integers are little-endian. The body is a bincode-encoded
//! [`JournalEntry`]; the CRC covers the body only.

mod entry;
mod reader;
mod recovery;
mod writer;

pub use entry::{JournalEntry, HEADER_SIZE, MAX_ENTRY_SIZE};
pub use reader::{JournalIterator, JournalReader};
pub use recovery::{JournalRecovery, RecoveryResult};
pub use writer::JournalWriter;
