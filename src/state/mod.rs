//! World State Module
//!
//! The ordered key-value store the reading store runs against.
//!
//! ## Responsibilities
//! - Define the four primitives the ledger core needs (get, put, delete,
//!   ordered prefix scan) as the [`WorldState`] trait
//! - Provide a versioned in-memory implementation ([`VersionedState`])
//! - Simulate the runtime's unit of work ([`Transaction`]): record a read set
//!   and buffer writes, validated optimistically at commit
//!
//! ## Concurrency Model: Optimistic MVCC
//!
//! ```text
//!   begin()                 commit()
//!     │                        │
//!     ▼                        ▼
//!  ┌──────────────┐     ┌───────────────────────────┐
//!  │ Transaction  │────►│ commit_lock               │
//!  │  reads  ─────┼──┐  │  1. every read version    │
//!  │  ranges ─────┼──┤  │     still current?        │
//!  │  writes      │  └─►│  2. every range unchanged?│
//!  └──────────────┘     │  3. apply writes @ height │
//!                       └───────────────────────────┘
//! ```
//!
//! A failed check rejects the whole write set with `Conflict`; nothing is
//! applied.

mod memory;
mod transaction;

pub use memory::VersionedState;
pub use transaction::{RangeRead, ReadWriteSet, Transaction};

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Commit height at which a value was written
pub type Version = u64;

/// A key and its current value, as yielded by a scan
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyValue {
    pub key: Bytes,
    pub value: Bytes,
}

/// A single mutation in a committed write set
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum WriteOp {
    /// Insert or replace a value
    Put { key: Bytes, value: Bytes },

    /// Physically remove a key
    Delete { key: Bytes },
}

impl WriteOp {
    pub fn key(&self) -> &Bytes {
        match self {
            WriteOp::Put { key, .. } | WriteOp::Delete { key } => key,
        }
    }
}

/// The store primitives used by the ledger core.
///
/// Implementations run inside a transactional context they neither begin nor
/// commit. Transport failures surface as `StoreUnavailable` and are never
/// retried here.
pub trait WorldState {
    /// Point lookup; `None` when the key is absent
    fn get_state(&self, key: &[u8]) -> Result<Option<Bytes>>;

    /// Insert or replace a value
    fn put_state(&self, key: &[u8], value: Bytes) -> Result<()>;

    /// Remove a key
    fn del_state(&self, key: &[u8]) -> Result<()>;

    /// All entries whose key starts with `prefix`, in ascending byte order.
    ///
    /// The returned scan holds store resources until it is dropped.
    fn scan_prefix(&self, prefix: &[u8]) -> Result<StateScan<'_>>;
}

impl<T: WorldState + ?Sized> WorldState for &T {
    fn get_state(&self, key: &[u8]) -> Result<Option<Bytes>> {
        (**self).get_state(key)
    }

    fn put_state(&self, key: &[u8], value: Bytes) -> Result<()> {
        (**self).put_state(key, value)
    }

    fn del_state(&self, key: &[u8]) -> Result<()> {
        (**self).del_state(key)
    }

    fn scan_prefix(&self, prefix: &[u8]) -> Result<StateScan<'_>> {
        (**self).scan_prefix(prefix)
    }
}

// =============================================================================
// Scoped Scans
// =============================================================================

/// An open prefix scan.
///
/// Whatever the store holds for the scan (a cursor, a snapshot, a lease) is
/// released when this value is dropped: after exhaustion, on early `break`,
/// or while unwinding from an error.
pub struct StateScan<'a> {
    entries: Box<dyn Iterator<Item = Result<KeyValue>> + Send + 'a>,
    _lease: Option<ScanLease>,
}

impl<'a> StateScan<'a> {
    /// Wrap an arbitrary (possibly fallible) entry iterator
    pub fn new<I>(entries: I) -> Self
    where
        I: Iterator<Item = Result<KeyValue>> + Send + 'a,
    {
        Self {
            entries: Box::new(entries),
            _lease: None,
        }
    }

    /// Scan over an already materialized snapshot
    pub fn from_entries(entries: Vec<KeyValue>) -> Self {
        Self::new(entries.into_iter().map(Ok))
    }

    /// Tie a lease to this scan; it is released when the scan is dropped
    pub fn with_lease(mut self, lease: ScanLease) -> Self {
        self._lease = Some(lease);
        self
    }
}

impl Iterator for StateScan<'_> {
    type Item = Result<KeyValue>;

    fn next(&mut self) -> Option<Self::Item> {
        self.entries.next()
    }
}

/// Counts a scan as open for as long as it lives
#[derive(Debug)]
pub struct ScanLease {
    open: Arc<AtomicUsize>,
}

impl ScanLease {
    pub fn acquire(open: &Arc<AtomicUsize>) -> Self {
        open.fetch_add(1, Ordering::SeqCst);
        Self {
            open: Arc::clone(open),
        }
    }
}

impl Drop for ScanLease {
    fn drop(&mut self) {
        self.open.fetch_sub(1, Ordering::SeqCst);
    }
}
