//! Configuration for SensorLedger
//!
//! Centralized configuration with sensible defaults.

use std::path::PathBuf;

use crate::key::TimestampLayout;

/// Main configuration for a ledger instance
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Storage Configuration
    // -------------------------------------------------------------------------
    /// Root directory for all data files
    /// Internal structure:
    ///   {data_dir}/
    ///     └── journal.log      (committed write sets)
    pub data_dir: PathBuf,

    // -------------------------------------------------------------------------
    // Journal Configuration
    // -------------------------------------------------------------------------
    /// Sync strategy: how often to fsync the journal
    pub journal_sync_strategy: JournalSyncStrategy,

    // -------------------------------------------------------------------------
    // Key Configuration
    // -------------------------------------------------------------------------
    /// How timestamps are rendered inside reading keys.
    ///
    /// Must stay the same for the lifetime of a data directory; keys written
    /// under one layout are not found under the other.
    pub timestamp_layout: TimestampLayout,
}

/// Journal sync strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JournalSyncStrategy {
    /// fsync after every commit (safest, slowest)
    EveryCommit,

    /// fsync after N unsynced commits (balanced durability/performance)
    EveryNCommits { count: usize },
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./sensorledger_data"),
            journal_sync_strategy: JournalSyncStrategy::EveryCommit,
            timestamp_layout: TimestampLayout::FixedWidth,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the data directory (root for all storage)
    pub fn data_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.data_dir = path.into();
        self
    }

    /// Set the journal sync strategy
    pub fn journal_sync_strategy(mut self, strategy: JournalSyncStrategy) -> Self {
        self.config.journal_sync_strategy = strategy;
        self
    }

    /// Set the timestamp layout used in reading keys
    pub fn timestamp_layout(mut self, layout: TimestampLayout) -> Self {
        self.config.timestamp_layout = layout;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
