//! Ledger Module
//!
//! Owns a world state and its journal, and runs invocations in transactions.
//!
//! ## Responsibilities
//! - Rebuild the world state from the journal on open
//! - Run each invocation inside its own transaction
//! - Journal a write set before it becomes visible
//! - Map outcomes onto status-coded responses

use std::fs;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;

use crate::config::Config;
use crate::contract::{Invocation, ReadingContract, Response};
use crate::error::{LedgerError, Result};
use crate::journal::{JournalEntry, JournalRecovery, JournalWriter, RecoveryResult};
use crate::key::TimestampLayout;
use crate::reading::ReadingStore;
use crate::state::{Transaction, Version, VersionedState};

/// A local, journaled sensor-reading ledger
///
/// ## Commit Path
///
/// `submit` executes against a fresh [`Transaction`], then commits it:
///   commit_lock → validate read set → journal append → apply to state
///
/// `evaluate` executes the same way and throws the transaction away, so
/// queries never write and never conflict.
pub struct Ledger {
    /// Ledger configuration
    config: Config,

    /// Current values (rebuilt from the journal on open)
    state: VersionedState,

    /// Append handle for committed write sets
    journal: Mutex<JournalWriter>,

    /// Invocation dispatcher
    contract: ReadingContract,

    /// What replay found when the ledger was opened
    recovery: RecoveryResult,
}

impl Ledger {
    // =========================================================================
    // Internal Path Constants
    // =========================================================================
    const JOURNAL_FILENAME: &'static str = "journal.log";
    const META_FILENAME: &'static str = "meta";
    const LAYOUT_FIELD: &'static str = "timestamp_layout";

    /// Open or create a ledger with the given config
    ///
    /// On startup:
    /// 1. Open/create data directory
    /// 2. Check the directory's timestamp layout (recorded on first open)
    /// 3. Replay the journal if it exists (truncating a damaged tail)
    /// 4. Open the journal for appends
    pub fn open(config: Config) -> Result<Self> {
        fs::create_dir_all(&config.data_dir)?;
        Self::check_layout(&config.data_dir, config.timestamp_layout)?;
        let journal_path = Self::journal_path_in(&config.data_dir);

        let state = VersionedState::new();
        let recovery = if journal_path.exists() {
            let (entries, result) = JournalRecovery::recover(&journal_path)?;
            for entry in &entries {
                state.apply(entry.seq, &entry.writes);
            }

            if result.entries_recovered > 0 || result.was_truncated {
                tracing::info!(
                    recovered = result.entries_recovered,
                    last_seq = result.last_seq,
                    truncated = result.was_truncated,
                    "Journal replayed"
                );
            }
            result
        } else {
            RecoveryResult::default()
        };

        let journal = JournalWriter::open(&journal_path, config.journal_sync_strategy)?;
        let contract = ReadingContract::new(config.timestamp_layout);

        Ok(Self {
            config,
            state,
            journal: Mutex::new(journal),
            contract,
            recovery,
        })
    }

    /// Record the layout in a fresh directory, or require the recorded one
    ///
    /// Keys written under one layout are invisible to lookups in the other,
    /// so reopening with a different layout would admit duplicate readings.
    fn check_layout(data_dir: &Path, layout: TimestampLayout) -> Result<()> {
        let meta_path = Self::meta_path_in(data_dir);
        if !meta_path.exists() {
            fs::write(&meta_path, format!("{}={}\n", Self::LAYOUT_FIELD, layout))?;
            return Ok(());
        }

        let contents = fs::read_to_string(&meta_path)?;
        let recorded = contents
            .lines()
            .filter_map(|line| line.split_once('='))
            .find(|(field, _)| field.trim() == Self::LAYOUT_FIELD)
            .map(|(_, value)| value.trim().parse::<TimestampLayout>())
            .transpose()?
            .ok_or_else(|| {
                LedgerError::Config(format!(
                    "{} has no {} entry",
                    meta_path.display(),
                    Self::LAYOUT_FIELD
                ))
            })?;

        if recorded != layout {
            return Err(LedgerError::Config(format!(
                "data directory {} uses the {} timestamp layout, not {}",
                data_dir.display(),
                recorded,
                layout
            )));
        }
        Ok(())
    }

    /// Open with a path (convenience method)
    ///
    /// Uses default config with the specified data directory
    pub fn open_path(path: &Path) -> Result<Self> {
        Self::open(Config::builder().data_dir(path).build())
    }

    /// Start a transaction against the current state
    pub fn begin(&self) -> Transaction<'_> {
        self.state.begin()
    }

    /// Validate, journal, and apply a transaction
    ///
    /// Returns the commit height (unchanged for read-only transactions).
    pub fn commit(&self, tx: Transaction<'_>) -> Result<Version> {
        self.state.commit_with(tx.into_rwset(), |seq, writes| {
            let entry = JournalEntry::new(seq, writes.to_vec());
            self.journal.lock().append(&entry)
        })
    }

    /// Run `f` against a reading store inside one transaction, then commit
    pub fn with_transaction<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&ReadingStore<&Transaction<'_>>) -> Result<T>,
    {
        let tx = self.begin();
        let value = {
            let store = ReadingStore::with_layout(&tx, self.config.timestamp_layout);
            f(&store)?
        };
        self.commit(tx)?;
        Ok(value)
    }

    /// Execute an invocation and commit its writes
    pub fn submit(&self, invocation: Invocation) -> Result<Option<Vec<u8>>> {
        let tx = self.begin();
        let output = self.contract.execute(&tx, invocation)?;
        self.commit(tx)?;
        Ok(output)
    }

    /// Execute an invocation without committing anything
    pub fn evaluate(&self, invocation: Invocation) -> Result<Option<Vec<u8>>> {
        let tx = self.begin();
        self.contract.execute(&tx, invocation)
    }

    /// Execute an invocation and report the outcome as a response
    ///
    /// Read-only functions are evaluated; everything else is submitted.
    pub fn handle(&self, invocation: Invocation) -> Response {
        let function = invocation.function();
        let result = if invocation.is_read_only() {
            self.evaluate(invocation)
        } else {
            self.submit(invocation)
        };

        match result {
            Ok(payload) => Response::ok(payload),
            Err(e) => {
                if e.is_recoverable() {
                    tracing::debug!(%function, error = %e, "Invocation rejected");
                } else {
                    tracing::warn!(%function, error = %e, "Invocation failed");
                }
                Response::from_error(&e)
            }
        }
    }

    /// Close the ledger gracefully
    ///
    /// Syncs the journal to disk
    pub fn close(self) -> Result<()> {
        self.journal.lock().sync()
    }

    // =========================================================================
    // Accessors (for testing and debugging)
    // =========================================================================

    /// Where a ledger rooted at `data_dir` keeps its journal
    pub fn journal_path_in(data_dir: &Path) -> PathBuf {
        data_dir.join(Self::JOURNAL_FILENAME)
    }

    /// Get the data directory path
    pub fn data_dir(&self) -> &Path {
        &self.config.data_dir
    }

    /// Where a ledger rooted at `data_dir` records its timestamp layout
    pub fn meta_path_in(data_dir: &Path) -> PathBuf {
        data_dir.join(Self::META_FILENAME)
    }

    /// Get the journal file path
    pub fn journal_path(&self) -> PathBuf {
        Self::journal_path_in(&self.config.data_dir)
    }

    /// Height of the last commit
    pub fn height(&self) -> Version {
        self.state.height()
    }

    /// Number of keys in the world state
    pub fn key_count(&self) -> usize {
        self.state.len()
    }

    /// Scans handed out and not yet released
    pub fn open_scans(&self) -> usize {
        self.state.open_scans()
    }

    /// What replay found on open
    pub fn recovery(&self) -> &RecoveryResult {
        &self.recovery
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }
}
