//! # SensorLedger
//!
//! An append/query ledger for IoT sensor readings with:
//! - Collision-free composite keys keyed by (device uuid, timestamp)
//! - Chronological per-device prefix scans
//! - Existence-checked create/delete over a versioned world state
//! - Optimistic transactions with commit-time read-set validation
//! - A CRC-checked journal of committed write sets
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                         Ledger                               │
//! │         (submit = execute + commit, evaluate = read)         │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │ Invocation
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                    ReadingContract                           │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                     ReadingStore                             │
//! │        create / read / query_by_device / delete              │
//! └──────────┬──────────────────────────────────┬───────────────┘
//!            │ (uuid, ts)                       │ get/put/del/scan
//!            ▼                                  ▼
//!   ┌─────────────────┐              ┌─────────────────────┐
//!   │   Key Codec     │              │  WorldState (trait) │
//!   │ (CompositeKey)  │              │  Transaction        │
//!   └─────────────────┘              └──────────┬──────────┘
//!                                               │ commit
//!                                    ┌──────────▼──────────┐
//!                                    │  VersionedState     │
//!                                    │  + Journal (append) │
//!                                    └─────────────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod config;
pub mod error;

pub mod contract;
pub mod journal;
pub mod key;
pub mod ledger;
pub mod reading;
pub mod state;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use config::Config;
pub use error::{LedgerError, Result};
pub use key::{CompositeKey, ReadingKey, TimestampLayout};
pub use ledger::Ledger;
pub use reading::{ReadingStore, SensorReading};
pub use state::{VersionedState, WorldState};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of SensorLedger
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
