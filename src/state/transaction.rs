//! Transaction simulation
//!
//! A [`Transaction`] reads committed state, records what it saw, and buffers
//! its writes. Nothing it does is visible to others until
//! [`VersionedState::commit`] validates and applies it.

use std::collections::BTreeMap;
use std::ops::Bound;

use bytes::Bytes;
use parking_lot::Mutex;

use crate::error::Result;

use super::memory::VersionedState;
use super::{KeyValue, StateScan, Version, WorldState, WriteOp};

/// A prefix scan and the exact key/version set it observed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RangeRead {
    pub prefix: Bytes,
    pub observed: Vec<(Bytes, Version)>,
}

/// Everything a transaction read and wrote
#[derive(Debug, Clone, Default)]
pub struct ReadWriteSet {
    /// First committed version seen per key (`None` = key was absent)
    reads: BTreeMap<Bytes, Option<Version>>,

    /// Prefix scans, for phantom detection
    range_reads: Vec<RangeRead>,

    /// Pending writes (`None` = delete)
    writes: BTreeMap<Bytes, Option<Bytes>>,
}

impl ReadWriteSet {
    pub fn reads(&self) -> impl Iterator<Item = (&Bytes, Option<Version>)> {
        self.reads.iter().map(|(k, v)| (k, *v))
    }

    pub fn range_reads(&self) -> &[RangeRead] {
        &self.range_reads
    }

    /// Pending writes in key order
    pub fn write_ops(&self) -> Vec<WriteOp> {
        self.writes
            .iter()
            .map(|(key, value)| match value {
                Some(value) => WriteOp::Put {
                    key: key.clone(),
                    value: value.clone(),
                },
                None => WriteOp::Delete { key: key.clone() },
            })
            .collect()
    }

    pub fn is_read_only(&self) -> bool {
        self.writes.is_empty()
    }
}

/// A unit of work against a [`VersionedState`]
///
/// Reads see committed state plus this transaction's own pending writes.
/// A transaction has no commit of its own: its read/write set goes to
/// [`VersionedState::commit`], or to `Ledger::commit` when the ledger handed
/// it out, so ledger writes cannot skip the journal.
pub struct Transaction<'a> {
    state: &'a VersionedState,
    rwset: Mutex<ReadWriteSet>,
}

impl<'a> Transaction<'a> {
    pub(crate) fn new(state: &'a VersionedState) -> Self {
        Self {
            state,
            rwset: Mutex::new(ReadWriteSet::default()),
        }
    }

    /// True if nothing has been written yet
    pub fn is_read_only(&self) -> bool {
        self.rwset.lock().is_read_only()
    }

    /// Give up the transaction and keep what it recorded
    pub fn into_rwset(self) -> ReadWriteSet {
        self.rwset.into_inner()
    }
}

impl WorldState for Transaction<'_> {
    fn get_state(&self, key: &[u8]) -> Result<Option<Bytes>> {
        let mut rwset = self.rwset.lock();

        if let Some(pending) = rwset.writes.get(key) {
            return Ok(pending.clone());
        }

        let current = self.state.get_versioned(key);
        rwset
            .reads
            .entry(Bytes::copy_from_slice(key))
            .or_insert_with(|| current.as_ref().map(|(_, version)| *version));

        Ok(current.map(|(value, _)| value))
    }

    fn put_state(&self, key: &[u8], value: Bytes) -> Result<()> {
        self.rwset
            .lock()
            .writes
            .insert(Bytes::copy_from_slice(key), Some(value));
        Ok(())
    }

    fn del_state(&self, key: &[u8]) -> Result<()> {
        self.rwset
            .lock()
            .writes
            .insert(Bytes::copy_from_slice(key), None);
        Ok(())
    }

    fn scan_prefix(&self, prefix: &[u8]) -> Result<StateScan<'_>> {
        let snapshot = self.state.scan_versioned(prefix);
        let mut rwset = self.rwset.lock();

        rwset.range_reads.push(RangeRead {
            prefix: Bytes::copy_from_slice(prefix),
            observed: snapshot.iter().map(|(k, _, v)| (k.clone(), *v)).collect(),
        });

        // Overlay this transaction's own pending writes
        let mut merged: BTreeMap<Bytes, Bytes> =
            snapshot.into_iter().map(|(k, value, _)| (k, value)).collect();
        let pending = rwset
            .writes
            .range::<[u8], _>((Bound::Included(prefix), Bound::Unbounded))
            .take_while(|(k, _)| k.starts_with(prefix));
        for (key, value) in pending {
            match value {
                Some(value) => {
                    merged.insert(key.clone(), value.clone());
                }
                None => {
                    merged.remove(key);
                }
            }
        }

        let entries = merged
            .into_iter()
            .map(|(key, value)| KeyValue { key, value })
            .collect();
        Ok(StateScan::from_entries(entries).with_lease(self.state.lease()))
    }
}
