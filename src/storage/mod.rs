//! Storage module for persisting captured notes
//!
//! This module handles all database operations for the harvester, including:
//! - SQLite database initialization and schema management
//! - Run tracking
//! - Per-owner note records and their local directories
//! - Known-id loading for incremental runs

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteStorage;
pub use traits::{Storage, StorageError, StorageResult};

use crate::item::ItemRecord;
use crate::HarvestError;
use std::path::{Path, PathBuf};

/// Opens (or creates) the note store
///
/// # Arguments
///
/// * `path` - Path to the SQLite database file
///
/// # Returns
///
/// * `Ok(SqliteStorage)` - Successfully initialized storage
/// * `Err(HarvestError)` - Failed to open the database
pub fn open_storage(path: &Path) -> Result<SqliteStorage, HarvestError> {
    SqliteStorage::new(path)
}

/// How a batch of records is merged into an owner's rows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// Replace all of the owner's rows
    Create,
    /// Keep existing rows and skip records already stored
    Append,
}

/// A record together with the directory it was written to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredItem {
    pub record: ItemRecord,
    pub local_path: Option<PathBuf>,
}

/// Represents a harvest run
#[derive(Debug, Clone)]
pub struct RunRecord {
    pub id: i64,
    pub started_at: String,
    pub finished_at: Option<String>,
    pub config_hash: String,
    pub status: RunStatus,
    pub owners: u32,
    pub new_items: u32,
}

/// Status of a harvest run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Running,
    Completed,
    Failed,
}

impl RunStatus {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}
