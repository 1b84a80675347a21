//! Reading Module
//!
//! Sensor readings and the store that keeps them in the world state.
//!
//! ## Responsibilities
//! - Define the `SensorReading` record as it travels in JSON
//! - Existence-checked create/delete, point read, per-device scan
//!   (see [`ReadingStore`])
//! - Prepare raw gateway payloads before submission

mod payload;
mod store;

pub use payload::prepare_payload;
pub use store::{DeviceReadings, ReadingStore};

use serde::{Deserialize, Serialize};

use crate::error::{LedgerError, Result};
use crate::key::{CompositeKey, ReadingKey};

/// One sample from an environmental sensor node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorReading {
    /// Device identifier, assigned by the device
    pub uuid: String,

    /// Producer-chosen time (unix millis by convention)
    pub timestamp: u64,

    pub pressure: f64,
    pub humidity: f64,
    pub temperature: f64,

    /// Color sensor channels
    pub r: u8,
    pub g: u8,
    pub b: u8,

    /// Total volatile organic compounds
    pub tvoc: u16,

    /// Accelerometer axes
    pub accel_x: i8,
    pub accel_y: i8,
    pub accel_z: i8,
}

impl SensorReading {
    /// Primary key of this reading
    pub fn key(&self) -> ReadingKey {
        ReadingKey::new(self.uuid.clone(), self.timestamp)
    }

    /// Serialize as the JSON blob stored in the world state
    pub fn to_json(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(self).map_err(|e| LedgerError::Serialization(e.to_string()))
    }

    /// Deserialize a stored blob; `key` only labels the error
    pub fn from_json(key: &CompositeKey, bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(bytes).map_err(|source| {
            tracing::warn!(%key, error = %source, "Stored reading does not deserialize");
            LedgerError::CorruptRecord {
                key: key.to_string(),
                source,
            }
        })
    }
}
