//! Storage module for persisting crawl data
//!
//! This module handles all database operations for the scraper, including:
//! - SQLite database initialization and schema management
//! - Run tracking
//! - Append-only named datasets (`products`, `collections`, `product_images`)
//! - Final request states for statistics

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteStorage;
pub use traits::{Storage, StorageError, StorageResult};

use crate::state::RequestState;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt;
use std::path::Path;

/// Initializes or opens a storage database
///
/// # Arguments
///
/// * `path` - Path to the SQLite database file
///
/// # Returns
///
/// * `Ok(SqliteStorage)` - Successfully initialized storage
/// * `Err(StorageError)` - Failed to initialize storage
pub fn open_storage(path: &Path) -> StorageResult<SqliteStorage> {
    SqliteStorage::new(path)
}

/// Named record collections
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dataset {
    Products,
    Collections,
    ProductImages,
}

impl Dataset {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Products => "products",
            Self::Collections => "collections",
            Self::ProductImages => "product_images",
        }
    }

    pub fn from_name(s: &str) -> Option<Self> {
        match s {
            "products" => Some(Self::Products),
            "collections" => Some(Self::Collections),
            "product_images" => Some(Self::ProductImages),
            _ => None,
        }
    }

    pub fn all() -> [Self; 3] {
        [Self::Products, Self::Collections, Self::ProductImages]
    }
}

impl fmt::Display for Dataset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Represents a crawl run
#[derive(Debug, Clone)]
pub struct RunRecord {
    pub id: i64,
    pub started_at: String,
    pub finished_at: Option<String>,
    pub config_hash: String,
    pub status: RunStatus,
}

/// Status of a crawl run
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

/// The recorded state of one crawl request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestRecord {
    pub url: String,
    pub unique_key: String,
    pub label: Option<String>,
    pub state: RequestState,
    pub retry_count: u32,
    pub error_message: Option<String>,
}

/// Serializes and appends a batch of records to a dataset
pub fn push_records<T: Serialize>(
    storage: &mut dyn Storage,
    run_id: i64,
    dataset: Dataset,
    records: &[T],
) -> StorageResult<usize> {
    let items = records
        .iter()
        .map(serde_json::to_value)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| StorageError::Serialization(e.to_string()))?;
    storage.push_data(run_id, dataset, &items)
}

/// Reads every record of a dataset and deserializes it
pub fn read_records<T: DeserializeOwned>(
    storage: &dyn Storage,
    run_id: i64,
    dataset: Dataset,
) -> StorageResult<Vec<T>> {
    storage
        .get_data(run_id, dataset)?
        .into_iter()
        .map(|value| {
            serde_json::from_value(value).map_err(|e| {
                StorageError::Serialization(format!("Malformed {} item: {}", dataset, e))
            })
        })
        .collect()
}
