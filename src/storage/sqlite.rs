//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the Storage trait.

use crate::item::{ItemRecord, RECORD_FIELDS, UPLOAD_TIME_FORMAT};
use crate::state::KnownIdSet;
use crate::storage::schema::{initialize_schema, BOOKKEEPING_COLUMNS};
use crate::storage::traits::{Storage, StorageError, StorageResult};
use crate::storage::{RunRecord, RunStatus, StoredItem, WriteMode};
use crate::HarvestError;
use chrono::{NaiveDateTime, Utc};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use std::path::{Path, PathBuf};

const RUN_COLUMNS: &str = "id, started_at, finished_at, config_hash, status, owners, new_items";

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Creates a new SqliteStorage instance
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteStorage)` - Successfully opened/created database
    /// * `Err(HarvestError)` - Failed to open database
    pub fn new(path: &Path) -> Result<Self, HarvestError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database (for testing)
    #[cfg(test)]
    pub fn new_in_memory() -> Result<Self, HarvestError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }

    fn record_columns() -> String {
        RECORD_FIELDS
            .iter()
            .map(|field| field.column())
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn insert_sql() -> String {
        let count = RECORD_FIELDS.len() + BOOKKEEPING_COLUMNS.len();
        let placeholders = (1..=count)
            .map(|i| format!("?{}", i))
            .collect::<Vec<_>>()
            .join(", ");
        format!(
            "INSERT OR IGNORE INTO items ({}, {}) VALUES ({})",
            Self::record_columns(),
            BOOKKEEPING_COLUMNS.join(", "),
            placeholders
        )
    }

    fn select_items(&self, filter: &str, params: &[Value]) -> StorageResult<Vec<StoredItem>> {
        let sql = format!(
            "SELECT {}, local_path FROM items {}",
            Self::record_columns(),
            filter
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(params.iter()), read_item)?;

        let mut items = Vec::new();
        for row in rows {
            items.push(row??);
        }
        Ok(items)
    }
}

fn read_run(row: &Row<'_>) -> rusqlite::Result<RunRecord> {
    Ok(RunRecord {
        id: row.get(0)?,
        started_at: row.get(1)?,
        finished_at: row.get(2)?,
        config_hash: row.get(3)?,
        status: RunStatus::from_db_string(&row.get::<_, String>(4)?).unwrap_or(RunStatus::Running),
        owners: row.get(5)?,
        new_items: row.get(6)?,
    })
}

fn read_item(row: &Row<'_>) -> rusqlite::Result<StorageResult<StoredItem>> {
    let mut values = Vec::with_capacity(RECORD_FIELDS.len());
    for i in 0..RECORD_FIELDS.len() {
        values.push(row.get::<_, Option<String>>(i)?);
    }
    let local_path: Option<String> = row.get(RECORD_FIELDS.len())?;

    let record = ItemRecord::from_fields(|field| {
        RECORD_FIELDS
            .iter()
            .position(|f| *f == field)
            .and_then(|i| values[i].clone())
    });

    Ok(match record {
        Some(record) => Ok(StoredItem {
            record,
            local_path: local_path.filter(|p| !p.is_empty()).map(PathBuf::from),
        }),
        None => Err(StorageError::CorruptRow("item row without id".to_string())),
    })
}

impl Storage for SqliteStorage {
    // ===== Run Management =====

    fn create_run(&mut self, config_hash: &str) -> StorageResult<i64> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO runs (started_at, config_hash, status) VALUES (?1, ?2, ?3)",
            params![now, config_hash, RunStatus::Running.to_db_string()],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord> {
        self.conn
            .query_row(
                &format!("SELECT {} FROM runs WHERE id = ?1", RUN_COLUMNS),
                params![run_id],
                read_run,
            )
            .optional()?
            .ok_or(StorageError::RunNotFound(run_id))
    }

    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>> {
        let run = self
            .conn
            .query_row(
                &format!("SELECT {} FROM runs ORDER BY id DESC LIMIT 1", RUN_COLUMNS),
                [],
                read_run,
            )
            .optional()?;
        Ok(run)
    }

    fn complete_run(&mut self, run_id: i64, owners: u32, new_items: u32) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        let updated = self.conn.execute(
            "UPDATE runs SET status = ?1, finished_at = ?2, owners = ?3, new_items = ?4 WHERE id = ?5",
            params![
                RunStatus::Completed.to_db_string(),
                now,
                owners,
                new_items,
                run_id
            ],
        )?;
        if updated == 0 {
            return Err(StorageError::RunNotFound(run_id));
        }
        Ok(())
    }

    fn fail_run(&mut self, run_id: i64) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        let updated = self.conn.execute(
            "UPDATE runs SET status = ?1, finished_at = ?2 WHERE id = ?3",
            params![RunStatus::Failed.to_db_string(), now, run_id],
        )?;
        if updated == 0 {
            return Err(StorageError::RunNotFound(run_id));
        }
        Ok(())
    }

    // ===== Items =====

    fn load_known_ids(&self, owner_id: &str) -> StorageResult<KnownIdSet> {
        let mut stmt = self
            .conn
            .prepare("SELECT item_id FROM items WHERE owner_id = ?1")?;
        let ids = stmt
            .query_map(params![owner_id], |row| row.get::<_, String>(0))?
            .collect::<Result<KnownIdSet, _>>()?;
        Ok(ids)
    }

    fn write_items(
        &mut self,
        owner_id: &str,
        items: &[StoredItem],
        mode: WriteMode,
        run_id: i64,
    ) -> StorageResult<usize> {
        let captured_at = Utc::now().to_rfc3339();
        let sql = Self::insert_sql();

        let tx = self.conn.transaction()?;
        if mode == WriteMode::Create {
            tx.execute("DELETE FROM items WHERE owner_id = ?1", params![owner_id])?;
        }

        let mut inserted = 0;
        {
            let mut stmt = tx.prepare(&sql)?;
            for item in items {
                let mut values: Vec<Value> = RECORD_FIELDS
                    .iter()
                    .map(|field| Value::Text(item.record.field_value(*field)))
                    .collect();
                values.push(match &item.local_path {
                    Some(path) => Value::Text(path.to_string_lossy().into_owned()),
                    None => Value::Null,
                });
                values.push(Value::Text(captured_at.clone()));
                values.push(Value::Integer(run_id));

                inserted += stmt.execute(params_from_iter(values.iter()))?;
            }
        }
        tx.commit()?;

        Ok(inserted)
    }

    fn get_items_for_owner(&self, owner_id: &str) -> StorageResult<Vec<StoredItem>> {
        self.select_items(
            "WHERE owner_id = ?1 ORDER BY id",
            &[Value::Text(owner_id.to_string())],
        )
    }

    fn items_uploaded_between(
        &self,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> StorageResult<Vec<StoredItem>> {
        self.select_items(
            "WHERE upload_time != '' AND upload_time >= ?1 AND upload_time <= ?2 ORDER BY upload_time, id",
            &[
                Value::Text(start.format(UPLOAD_TIME_FORMAT).to_string()),
                Value::Text(end.format(UPLOAD_TIME_FORMAT).to_string()),
            ],
        )
    }

    // ===== Statistics =====

    fn list_owners(&self) -> StorageResult<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT DISTINCT owner_id FROM items ORDER BY owner_id")?;
        let owners = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(owners)
    }

    fn count_items(&self, owner_id: Option<&str>) -> StorageResult<u64> {
        let count: i64 = match owner_id {
            Some(owner) => self.conn.query_row(
                "SELECT COUNT(*) FROM items WHERE owner_id = ?1",
                params![owner],
                |row| row.get(0),
            )?,
            None => self
                .conn
                .query_row("SELECT COUNT(*) FROM items", [], |row| row.get(0))?,
        };
        Ok(count as u64)
    }

    fn count_runs(&self) -> StorageResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM runs", [], |row| row.get(0))?;
        Ok(count as u64)
    }
}
