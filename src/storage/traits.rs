//! Storage traits and error types
//!
//! This module defines the trait interface for storage backends and
//! associated error types.

use crate::state::RequestState;
use crate::storage::{Dataset, RequestRecord, RunRecord, RunStatus};
use std::collections::HashMap;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Run not found: {0}")]
    RunNotFound(i64),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for storage backend implementations
///
/// Datasets are append-only and scoped to a crawl run: items pushed during
/// run N are read back, in insertion order, by exporting run N.
pub trait Storage {
    // ===== Run Management =====

    /// Creates a new crawl run
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

    /// Updates the status of a run
    fn update_run_status(&mut self, run_id: i64, status: RunStatus) -> StorageResult<()>;

    /// Marks a run as completed with a finish timestamp
    fn complete_run(&mut self, run_id: i64) -> StorageResult<()>;

    // ===== Datasets =====

    /// Appends a batch of items to a dataset as one operation
    ///
    /// # Returns
    ///
    /// The number of items appended
    fn push_data(
        &mut self,
        run_id: i64,
        dataset: Dataset,
        items: &[serde_json::Value],
    ) -> StorageResult<usize>;

    /// Reads every item of a dataset in insertion order
    fn get_data(&self, run_id: i64, dataset: Dataset) -> StorageResult<Vec<serde_json::Value>>;

    /// Counts the items of a dataset
    fn count_items(&self, run_id: i64, dataset: Dataset) -> StorageResult<u64>;

    // ===== Request Tracking =====

    /// Records the latest state of a crawl request
    ///
    /// A request is identified by its unique key; recording it again
    /// replaces the previous state.
    fn record_request(&mut self, run_id: i64, request: &RequestRecord) -> StorageResult<()>;

    /// Counts the requests of a run by state
    fn count_requests_by_state(&self, run_id: i64) -> StorageResult<HashMap<RequestState, u64>>;

    /// Gets the requests of a run that ended in `state`
    fn get_requests_by_state(
        &self,
        run_id: i64,
        state: RequestState,
    ) -> StorageResult<Vec<RequestRecord>>;
}
