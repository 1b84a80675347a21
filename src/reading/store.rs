//! Reading Store
//!
//! Existence-checked CRUD over an injected world-state handle.
//!
//! Each reading is either Absent or Present:
//!
//! ```text
//!            create (fails if Present)
//!   Absent ─────────────────────────────► Present
//!          ◄─────────────────────────────
//!            delete (fails if Absent)
//! ```
//!
//! There is no update; replacing a payload is delete followed by create.

use bytes::Bytes;

use crate::error::{LedgerError, Result};
use crate::key::{CompositeKey, ReadingKey, TimestampLayout};
use crate::state::{StateScan, WorldState};

use super::SensorReading;

/// CRUD facade over a world-state handle
///
/// Holds nothing but the handle and the key layout; every call computes its
/// key afresh. Pass `&state` or `&transaction` to borrow instead of owning.
pub struct ReadingStore<S> {
    state: S,
    layout: TimestampLayout,
}

impl<S: WorldState> ReadingStore<S> {
    /// Store using the default (fixed-width, chronological) key layout
    pub fn new(state: S) -> Self {
        Self::with_layout(state, TimestampLayout::default())
    }

    pub fn with_layout(state: S, layout: TimestampLayout) -> Self {
        Self { state, layout }
    }

    /// Insert a reading blob; the payload is stored as given.
    ///
    /// Fails with `AlreadyExists` (and writes nothing) if the key is Present.
    #[tracing::instrument(level = "debug", skip(self, payload), fields(bytes = payload.len()))]
    pub fn create(&self, uuid: &str, timestamp: u64, payload: &[u8]) -> Result<()> {
        let key = ReadingKey::encode(uuid, timestamp, self.layout);

        // Read before write, in the same unit of work as the put
        if self.state.get_state(key.as_bytes())?.is_some() {
            return Err(LedgerError::AlreadyExists {
                key: key.to_string(),
            });
        }

        self.state
            .put_state(key.as_bytes(), Bytes::copy_from_slice(payload))?;

        tracing::debug!(%key, "Reading created");
        Ok(())
    }

    /// Serialize `reading` to JSON and [`create`](Self::create) it
    pub fn create_reading(&self, reading: &SensorReading) -> Result<()> {
        let payload = reading.to_json()?;
        self.create(&reading.uuid, reading.timestamp, &payload)
    }

    /// Look up one reading.
    ///
    /// `NotFound` if Absent; `CorruptRecord` if the stored bytes are not a
    /// valid reading.
    #[tracing::instrument(level = "debug", skip(self))]
    pub fn read(&self, uuid: &str, timestamp: u64) -> Result<SensorReading> {
        let key = ReadingKey::encode(uuid, timestamp, self.layout);

        match self.state.get_state(key.as_bytes())? {
            Some(bytes) => SensorReading::from_json(&key, &bytes),
            None => Err(LedgerError::NotFound {
                key: key.to_string(),
            }),
        }
    }

    /// Every reading of one device, in key order.
    ///
    /// Under the fixed-width layout that order is ascending timestamp. The
    /// scan stays open until the returned iterator is dropped.
    #[tracing::instrument(level = "debug", skip(self))]
    pub fn query_by_device(&self, uuid: &str) -> Result<DeviceReadings<'_>> {
        let prefix = ReadingKey::device_prefix(uuid);
        let scan = self.state.scan_prefix(prefix.as_bytes())?;
        Ok(DeviceReadings { scan })
    }

    /// The device's reading with the greatest timestamp, if any.
    ///
    /// Compares decoded timestamps, so the answer is right under either layout.
    #[tracing::instrument(level = "debug", skip(self))]
    pub fn latest(&self, uuid: &str) -> Result<Option<SensorReading>> {
        let prefix = ReadingKey::device_prefix(uuid);
        let mut newest: Option<(u64, CompositeKey, Bytes)> = None;

        for entry in self.state.scan_prefix(prefix.as_bytes())? {
            let entry = entry?;
            let key = CompositeKey::from_bytes(entry.key);
            let timestamp = ReadingKey::decode(&key, self.layout)?.timestamp;

            let is_newer = newest
                .as_ref()
                .map_or(true, |(best, _, _)| timestamp > *best);
            if is_newer {
                newest = Some((timestamp, key, entry.value));
            }
        }

        newest
            .map(|(_, key, value)| SensorReading::from_json(&key, &value))
            .transpose()
    }

    /// Physically remove one reading.
    ///
    /// Fails with `NotFound` (and mutates nothing) if the key is Absent.
    #[tracing::instrument(level = "debug", skip(self))]
    pub fn delete(&self, uuid: &str, timestamp: u64) -> Result<()> {
        let key = ReadingKey::encode(uuid, timestamp, self.layout);

        if self.state.get_state(key.as_bytes())?.is_none() {
            return Err(LedgerError::NotFound {
                key: key.to_string(),
            });
        }

        self.state.del_state(key.as_bytes())?;

        tracing::debug!(%key, "Reading deleted");
        Ok(())
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn layout(&self) -> TimestampLayout {
        self.layout
    }

    pub fn state(&self) -> &S {
        &self.state
    }

    pub fn into_inner(self) -> S {
        self.state
    }
}

/// Lazy per-device scan.
///
/// Yields one item per stored record: the reading, or `CorruptRecord` for a
/// record whose bytes do not deserialize (iteration continues after it).
/// Store errors are yielded as they come. Finite and not restartable; call
/// [`ReadingStore::query_by_device`] again for a fresh scan.
pub struct DeviceReadings<'a> {
    scan: StateScan<'a>,
}

impl Iterator for DeviceReadings<'_> {
    type Item = Result<SensorReading>;

    fn next(&mut self) -> Option<Self::Item> {
        let entry = match self.scan.next()? {
            Ok(entry) => entry,
            Err(e) => return Some(Err(e)),
        };

        let key = CompositeKey::from_bytes(entry.key);
        Some(SensorReading::from_json(&key, &entry.value))
    }
}
