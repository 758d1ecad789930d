//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the Storage trait.

use crate::state::RequestState;
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{Storage, StorageError, StorageResult};
use crate::storage::{Dataset, RequestRecord, RunRecord, RunStatus};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::collections::HashMap;
use std::path::Path;

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Creates a new SqliteStorage instance
    ///
    /// Parent directories of `path` are created if missing.
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
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
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
    pub fn new_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }
}

fn run_from_row(row: &Row<'_>) -> rusqlite::Result<RunRecord> {
    Ok(RunRecord {
        id: row.get(0)?,
        started_at: row.get(1)?,
        finished_at: row.get(2)?,
        config_hash: row.get(3)?,
        status: RunStatus::from_db_string(&row.get::<_, String>(4)?)
            .unwrap_or(RunStatus::Running),
    })
}

fn request_from_row(row: &Row<'_>) -> rusqlite::Result<RequestRecord> {
    Ok(RequestRecord {
        url: row.get(0)?,
        unique_key: row.get(1)?,
        label: row.get(2)?,
        state: RequestState::from_db_string(&row.get::<_, String>(3)?)
            .unwrap_or(RequestState::Failed),
        retry_count: row.get(4)?,
        error_message: row.get(5)?,
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
                "SELECT id, started_at, finished_at, config_hash, status FROM runs WHERE id = ?1",
                params![run_id],
                run_from_row,
            )
            .optional()?
            .ok_or(StorageError::RunNotFound(run_id))
    }

    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>> {
        let run = self
            .conn
            .query_row(
                "SELECT id, started_at, finished_at, config_hash, status FROM runs ORDER BY id DESC LIMIT 1",
                [],
                run_from_row,
            )
            .optional()?;

        Ok(run)
    }

    fn update_run_status(&mut self, run_id: i64, status: RunStatus) -> StorageResult<()> {
        let updated = self.conn.execute(
            "UPDATE runs SET status = ?1 WHERE id = ?2",
            params![status.to_db_string(), run_id],
        )?;
        if updated == 0 {
            return Err(StorageError::RunNotFound(run_id));
        }
        Ok(())
    }

    fn complete_run(&mut self, run_id: i64) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        let updated = self.conn.execute(
            "UPDATE runs SET status = ?1, finished_at = ?2 WHERE id = ?3",
            params![RunStatus::Completed.to_db_string(), now, run_id],
        )?;
        if updated == 0 {
            return Err(StorageError::RunNotFound(run_id));
        }
        Ok(())
    }

    // ===== Datasets =====

    fn push_data(
        &mut self,
        run_id: i64,
        dataset: Dataset,
        items: &[serde_json::Value],
    ) -> StorageResult<usize> {
        let now = Utc::now().to_rfc3339();
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO dataset_items (run_id, dataset, data, created_at) VALUES (?1, ?2, ?3, ?4)",
            )?;
            for item in items {
                let data = serde_json::to_string(item)
                    .map_err(|e| StorageError::Serialization(e.to_string()))?;
                stmt.execute(params![run_id, dataset.name(), data, now])?;
            }
        }
        tx.commit()?;
        Ok(items.len())
    }

    fn get_data(&self, run_id: i64, dataset: Dataset) -> StorageResult<Vec<serde_json::Value>> {
        let mut stmt = self.conn.prepare(
            "SELECT data FROM dataset_items WHERE run_id = ?1 AND dataset = ?2 ORDER BY id",
        )?;

        let rows = stmt.query_map(params![run_id, dataset.name()], |row| {
            row.get::<_, String>(0)
        })?;

        let mut items = Vec::new();
        for row in rows {
            let data = row?;
            let value = serde_json::from_str(&data)
                .map_err(|e| StorageError::Serialization(e.to_string()))?;
            items.push(value);
        }

        Ok(items)
    }

    fn count_items(&self, run_id: i64, dataset: Dataset) -> StorageResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM dataset_items WHERE run_id = ?1 AND dataset = ?2",
            params![run_id, dataset.name()],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    // ===== Request Tracking =====

    fn record_request(&mut self, run_id: i64, request: &RequestRecord) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO requests (run_id, url, unique_key, label, state, retry_count, error_message, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
             ON CONFLICT(run_id, unique_key) DO UPDATE SET
                state = excluded.state,
                retry_count = excluded.retry_count,
                error_message = excluded.error_message,
                updated_at = excluded.updated_at",
            params![
                run_id,
                request.url,
                request.unique_key,
                request.label,
                request.state.to_db_string(),
                request.retry_count,
                request.error_message,
                now
            ],
        )?;
        Ok(())
    }

    fn count_requests_by_state(&self, run_id: i64) -> StorageResult<HashMap<RequestState, u64>> {
        let mut stmt = self
            .conn
            .prepare("SELECT state, COUNT(*) FROM requests WHERE run_id = ?1 GROUP BY state")?;

        let rows = stmt.query_map(params![run_id], |row| {
            let state_str: String = row.get(0)?;
            let count: i64 = row.get(1)?;
            Ok((state_str, count))
        })?;

        let mut counts = HashMap::new();
        for row in rows {
            let (state_str, count) = row?;
            if let Some(state) = RequestState::from_db_string(&state_str) {
                counts.insert(state, count as u64);
            }
        }

        Ok(counts)
    }

    fn get_requests_by_state(
        &self,
        run_id: i64,
        state: RequestState,
    ) -> StorageResult<Vec<RequestRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT url, unique_key, label, state, retry_count, error_message
             FROM requests WHERE run_id = ?1 AND state = ?2 ORDER BY id",
        )?;

        let requests = stmt
            .query_map(params![run_id, state.to_db_string()], request_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(requests)
    }
}
