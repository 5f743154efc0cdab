//! SQLite storage implementation
//!
//! This module persists check outcomes and run records in SQLite so that a
//! later run can reuse the outcomes of URLs it has already checked.

use crate::check::CompactSnapshot;
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{ResultCache, RunLog, StorageError, StorageResult};
use crate::storage::{RunRecord, RunStatus};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Opens or creates the database
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteStorage)` - Successfully opened/created database
    /// * `Err(StorageError)` - Failed to open database
    pub fn new(path: &Path) -> StorageResult<Self> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database (for testing)
    pub fn new_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }

    /// Removes all stored outcomes
    pub fn clear_results(&mut self) -> StorageResult<usize> {
        Ok(self.conn.execute("DELETE FROM results", [])?)
    }

    /// Number of stored outcomes that are invalid
    pub fn count_invalid(&self) -> StorageResult<usize> {
        let count: i64 =
            self.conn
                .query_row("SELECT COUNT(*) FROM results WHERE valid = 0", [], |row| {
                    row.get(0)
                })?;
        Ok(count as usize)
    }
}

impl ResultCache for SqliteStorage {
    fn get(&self, cache_key: &str) -> StorageResult<Option<CompactSnapshot>> {
        let json: Option<String> = self
            .conn
            .query_row(
                "SELECT snapshot FROM results WHERE cache_url = ?1",
                params![cache_key],
                |row| row.get(0),
            )
            .optional()?;

        match json {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    fn put(&mut self, cache_key: &str, snapshot: &CompactSnapshot) -> StorageResult<()> {
        let json = serde_json::to_string(snapshot)?;
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO results (cache_url, valid, result, snapshot, checked_at)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(cache_url) DO UPDATE SET
                valid = excluded.valid,
                result = excluded.result,
                snapshot = excluded.snapshot,
                checked_at = excluded.checked_at",
            params![cache_key, snapshot.is_valid(), snapshot.result(), json, now],
        )?;
        Ok(())
    }

    fn len(&self) -> StorageResult<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM results", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}

impl RunLog for SqliteStorage {
    fn create_run(&mut self, config_hash: &str) -> StorageResult<i64> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO runs (started_at, config_hash, status) VALUES (?1, ?2, ?3)",
            params![now, config_hash, RunStatus::Running.to_db_string()],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord> {
        let mut stmt = self.conn.prepare(
            "SELECT id, started_at, finished_at, config_hash, status FROM runs WHERE id = ?1",
        )?;

        let run = stmt
            .query_row(params![run_id], |row| {
                Ok(RunRecord {
                    id: row.get(0)?,
                    started_at: row.get(1)?,
                    finished_at: row.get(2)?,
                    config_hash: row.get(3)?,
                    status: RunStatus::from_db_string(&row.get::<_, String>(4)?)
                        .unwrap_or(RunStatus::Running),
                })
            })
            .optional()?;

        run.ok_or(StorageError::RunNotFound(run_id))
    }

    fn finish_run(&mut self, run_id: i64, status: RunStatus) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "UPDATE runs SET status = ?1, finished_at = ?2 WHERE id = ?3",
            params![status.to_db_string(), now, run_id],
        )?;
        Ok(())
    }
}
