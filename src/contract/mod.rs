//! Contract Module
//!
//! The transaction-dispatch surface of the ledger.
//!
//! ## Functions
//! | Function        | Arguments              | Result              |
//! |-----------------|------------------------|---------------------|
//! | `CreateReading` | uuid, timestamp, json  | none                |
//! | `GetReading`    | uuid, timestamp        | reading (JSON)      |
//! | `QueryDevice`   | uuid                   | readings (JSON list)|
//! | `LatestReading` | uuid                   | reading (JSON)      |
//! | `DeleteReading` | uuid, timestamp        | none                |
//!
//! ## Status Codes
//! - 0x00: OK
//! - 0x01: NOT_FOUND
//! - 0x02: ALREADY_EXISTS
//! - 0x03: CONFLICT
//! - 0x04: ERROR

mod invocation;
mod response;

pub use invocation::{Function, Invocation};
pub use response::{Response, Status};

use serde::Serialize;

use crate::error::{LedgerError, Result};
use crate::key::{ReadingKey, TimestampLayout};
use crate::reading::ReadingStore;
use crate::state::WorldState;

/// Executes invocations against whatever world-state handle it is given
#[derive(Debug, Clone, Copy, Default)]
pub struct ReadingContract {
    layout: TimestampLayout,
}

impl ReadingContract {
    pub fn new(layout: TimestampLayout) -> Self {
        Self { layout }
    }

    /// Execute an invocation
    ///
    /// Returns the JSON payload for read functions, `None` for writes.
    pub fn execute<S: WorldState>(
        &self,
        state: S,
        invocation: Invocation,
    ) -> Result<Option<Vec<u8>>> {
        let store = ReadingStore::with_layout(state, self.layout);

        match invocation {
            Invocation::CreateReading {
                uuid,
                timestamp,
                payload,
            } => {
                store.create(&uuid, timestamp, &payload)?;
                Ok(None)
            }
            Invocation::GetReading { uuid, timestamp } => {
                let reading = store.read(&uuid, timestamp)?;
                to_json(&reading).map(Some)
            }
            Invocation::QueryDevice { uuid } => {
                let readings = store.query_by_device(&uuid)?.collect::<Result<Vec<_>>>()?;
                to_json(&readings).map(Some)
            }
            Invocation::LatestReading { uuid } => match store.latest(&uuid)? {
                Some(reading) => to_json(&reading).map(Some),
                None => Err(LedgerError::NotFound {
                    key: ReadingKey::device_prefix(&uuid).to_string(),
                }),
            },
            Invocation::DeleteReading { uuid, timestamp } => {
                store.delete(&uuid, timestamp)?;
                Ok(None)
            }
        }
    }

    pub fn layout(&self) -> TimestampLayout {
        self.layout
    }
}

fn to_json<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    serde_json::to_vec(value).map_err(|e| LedgerError::Serialization(e.to_string()))
}
