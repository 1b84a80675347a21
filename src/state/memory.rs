//! Versioned in-memory world state
//!
//! BTreeMap-based store with RwLock for concurrency. Every value carries the
//! commit height that wrote it.

use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use parking_lot::{Mutex, RwLock};

use crate::error::{LedgerError, Result};
use crate::key::CompositeKey;

use super::transaction::{ReadWriteSet, Transaction};
use super::{KeyValue, ScanLease, StateScan, Version, WorldState, WriteOp};

/// Value plus the height it was committed at
#[derive(Debug, Clone)]
struct VersionedValue {
    value: Bytes,
    version: Version,
}

/// Ordered, versioned key-value store
///
/// ## Concurrency:
/// - `data`: RwLock (many concurrent readers, exclusive writer)
/// - `commit_lock`: serializes validate-then-apply so no two commits interleave
/// - `height`, `open_scans`: atomic counters (lock-free)
pub struct VersionedState {
    /// Current values, ordered by key bytes
    data: RwLock<BTreeMap<Bytes, VersionedValue>>,

    /// Height of the last applied commit (0 = nothing committed)
    height: AtomicU64,

    /// Serializes commits
    commit_lock: Mutex<()>,

    /// Number of scans that have not been dropped yet
    open_scans: Arc<AtomicUsize>,
}

impl VersionedState {
    /// Create an empty state at height 0
    pub fn new() -> Self {
        Self {
            data: RwLock::new(BTreeMap::new()),
            height: AtomicU64::new(0),
            commit_lock: Mutex::new(()),
            open_scans: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Start a unit of work against this state
    pub fn begin(&self) -> Transaction<'_> {
        Transaction::new(self)
    }

    /// Value and version of a key
    pub fn get_versioned(&self, key: &[u8]) -> Option<(Bytes, Version)> {
        self.data
            .read()
            .get(key)
            .map(|v| (v.value.clone(), v.version))
    }

    /// Version of a key, `None` when absent
    pub fn version_of(&self, key: &[u8]) -> Option<Version> {
        self.data.read().get(key).map(|v| v.version)
    }

    /// Snapshot of every entry under `prefix`, with versions, in key order
    pub fn scan_versioned(&self, prefix: &[u8]) -> Vec<(Bytes, Bytes, Version)> {
        let data = self.data.read();
        data.range::<[u8], _>((Bound::Included(prefix), Bound::Unbounded))
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, v)| (k.clone(), v.value.clone(), v.version))
            .collect()
    }

    /// Validate a transaction's read set and apply its writes
    pub fn commit(&self, rwset: ReadWriteSet) -> Result<Version> {
        self.commit_with(rwset, |_, _| Ok(()))
    }

    /// Like [`commit`](Self::commit), but runs `before_apply` after validation
    /// and before the writes become visible. If the hook fails nothing is
    /// applied and the height does not move.
    pub fn commit_with<F>(&self, rwset: ReadWriteSet, before_apply: F) -> Result<Version>
    where
        F: FnOnce(Version, &[WriteOp]) -> Result<()>,
    {
        let _commit_guard = self.commit_lock.lock();

        if rwset.is_read_only() {
            return Ok(self.height());
        }

        self.validate(&rwset)?;

        let version = self.height() + 1;
        let writes = rwset.write_ops();
        before_apply(version, &writes)?;
        self.apply(version, &writes);

        tracing::debug!(version, writes = writes.len(), "Committed write set");
        Ok(version)
    }

    /// Apply an already validated write set (journal replay, autocommit)
    ///
    /// The height only ever moves forward.
    pub fn apply(&self, version: Version, writes: &[WriteOp]) {
        let mut data = self.data.write();
        for op in writes {
            match op {
                WriteOp::Put { key, value } => {
                    data.insert(
                        key.clone(),
                        VersionedValue {
                            value: value.clone(),
                            version,
                        },
                    );
                }
                WriteOp::Delete { key } => {
                    data.remove(key);
                }
            }
        }
        self.height.fetch_max(version, Ordering::SeqCst);
    }

    /// Height of the last applied commit
    pub fn height(&self) -> Version {
        self.height.load(Ordering::SeqCst)
    }

    /// Number of live keys
    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.read().is_empty()
    }

    /// Number of scans handed out and not yet dropped
    pub fn open_scans(&self) -> usize {
        self.open_scans.load(Ordering::SeqCst)
    }

    pub(crate) fn lease(&self) -> ScanLease {
        ScanLease::acquire(&self.open_scans)
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    /// Check every read and range read against the current state
    /// (called with commit_lock held)
    fn validate(&self, rwset: &ReadWriteSet) -> Result<()> {
        for (key, seen) in rwset.reads() {
            let current = self.version_of(key);
            if current != seen {
                return Err(LedgerError::Conflict(format!(
                    "key {} changed since it was read (read {:?}, now {:?})",
                    CompositeKey::from_bytes(key.clone()),
                    seen,
                    current
                )));
            }
        }

        for range in rwset.range_reads() {
            let current: Vec<(Bytes, Version)> = self
                .scan_versioned(&range.prefix)
                .into_iter()
                .map(|(k, _, v)| (k, v))
                .collect();
            if current != range.observed {
                return Err(LedgerError::Conflict(format!(
                    "range under {} changed since it was scanned",
                    CompositeKey::from_bytes(range.prefix.clone())
                )));
            }
        }

        Ok(())
    }

    /// Apply a single blind write as its own commit
    fn autocommit(&self, op: WriteOp) -> Result<()> {
        let _commit_guard = self.commit_lock.lock();
        let version = self.height() + 1;
        self.apply(version, std::slice::from_ref(&op));
        Ok(())
    }
}

impl Default for VersionedState {
    fn default() -> Self {
        Self::new()
    }
}

/// Direct access outside a transaction: every write commits immediately.
impl WorldState for VersionedState {
    fn get_state(&self, key: &[u8]) -> Result<Option<Bytes>> {
        Ok(self.get_versioned(key).map(|(value, _)| value))
    }

    fn put_state(&self, key: &[u8], value: Bytes) -> Result<()> {
        self.autocommit(WriteOp::Put {
            key: Bytes::copy_from_slice(key),
            value,
        })
    }

    fn del_state(&self, key: &[u8]) -> Result<()> {
        self.autocommit(WriteOp::Delete {
            key: Bytes::copy_from_slice(key),
        })
    }

    fn scan_prefix(&self, prefix: &[u8]) -> Result<StateScan<'_>> {
        let entries = self
            .scan_versioned(prefix)
            .into_iter()
            .map(|(key, value, _)| KeyValue { key, value })
            .collect();
        Ok(StateScan::from_entries(entries).with_lease(self.lease()))
    }
}
