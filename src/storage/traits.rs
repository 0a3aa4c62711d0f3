//! Storage traits and error types
//!
//! This module defines the trait interface for storage backends and
//! associated error types.

use crate::state::KnownIdSet;
use crate::storage::{RunRecord, StoredItem, WriteMode};
use chrono::NaiveDateTime;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Run not found: {0}")]
    RunNotFound(i64),

    #[error("Corrupt row: {0}")]
    CorruptRow(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for storage backend implementations
///
/// This trait defines all database operations needed by the harvester. One
/// process owns the store; concurrent writers are not supported.
pub trait Storage {
    // ===== Run Management =====

    /// Creates a new harvest run
    ///
    /// # Arguments
    ///
    /// * `config_hash` - Hash of the configuration file
    ///
    /// # Returns
    ///
    /// The ID of the newly created run
    fn create_run(&mut self, config_hash: &str) -> StorageResult<i64>;

    /// Gets a run by ID
    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord>;

    /// Gets the most recent run
    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>>;

    /// Marks a run as completed with its totals
    fn complete_run(&mut self, run_id: i64, owners: u32, new_items: u32) -> StorageResult<()>;

    /// Marks a run as failed
    fn fail_run(&mut self, run_id: i64) -> StorageResult<()>;

    // ===== Items =====

    /// Loads the ids already stored for an owner
    fn load_known_ids(&self, owner_id: &str) -> StorageResult<KnownIdSet>;

    /// Writes one owner's records
    ///
    /// # Arguments
    ///
    /// * `owner_id` - The owner the records belong to
    /// * `items` - Records with their local directories, in capture order
    /// * `mode` - Replace the owner's rows or append to them
    /// * `run_id` - The run capturing the records
    ///
    /// # Returns
    ///
    /// The number of rows actually inserted (duplicates are skipped)
    fn write_items(
        &mut self,
        owner_id: &str,
        items: &[StoredItem],
        mode: WriteMode,
        run_id: i64,
    ) -> StorageResult<usize>;

    /// Gets all stored records of an owner in capture order
    fn get_items_for_owner(&self, owner_id: &str) -> StorageResult<Vec<StoredItem>>;

    /// Gets the records uploaded within `[start, end]`, oldest first
    fn items_uploaded_between(
        &self,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> StorageResult<Vec<StoredItem>>;

    // ===== Statistics =====

    /// Lists owners with at least one stored record
    fn list_owners(&self) -> StorageResult<Vec<String>>;

    /// Counts stored records, optionally for one owner
    fn count_items(&self, owner_id: Option<&str>) -> StorageResult<u64>;

    /// Counts recorded runs, whatever their status
    fn count_runs(&self) -> StorageResult<u64>;
}
