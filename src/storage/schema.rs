//! Database schema definitions
//!
//! The `items` table carries one TEXT column per record field, in
//! [`RECORD_FIELDS`] order, followed by bookkeeping columns.

use crate::item::RECORD_FIELDS;

/// SQL schema for the runs table and indexes
const RUNS_SQL: &str = r#"
-- Track harvest runs
CREATE TABLE IF NOT EXISTS runs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    started_at TEXT NOT NULL,
    finished_at TEXT,
    config_hash TEXT NOT NULL,
    status TEXT NOT NULL,
    owners INTEGER NOT NULL DEFAULT 0,
    new_items INTEGER NOT NULL DEFAULT 0
);
"#;

const ITEM_INDEXES_SQL: &str = r#"
CREATE INDEX IF NOT EXISTS idx_items_owner ON items(owner_id);
CREATE INDEX IF NOT EXISTS idx_items_upload_time ON items(upload_time);
"#;

/// Bookkeeping columns appended after the record fields
pub const BOOKKEEPING_COLUMNS: [&str; 3] = ["local_path", "captured_at", "run_id"];

/// Builds the `items` table definition from the record field schema
pub fn items_table_sql() -> String {
    let columns: Vec<String> = RECORD_FIELDS
        .iter()
        .map(|field| format!("    {} TEXT NOT NULL DEFAULT ''", field.column()))
        .collect();

    format!(
        "-- Captured notes, one row per (owner, note)
CREATE TABLE IF NOT EXISTS items (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
{},
    local_path TEXT,
    captured_at TEXT NOT NULL,
    run_id INTEGER NOT NULL REFERENCES runs(id),
    UNIQUE(owner_id, item_id)
);",
        columns.join(",\n")
    )
}

/// Initializes the database schema
///
/// # Arguments
///
/// * `conn` - The database connection
///
/// # Returns
///
/// * `Ok(())` - Schema initialized successfully
/// * `Err(rusqlite::Error)` - Failed to initialize schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(RUNS_SQL)?;
    conn.execute_batch(&items_table_sql())?;
    conn.execute_batch(ITEM_INDEXES_SQL)?;
    Ok(())
}
