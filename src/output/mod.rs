//! Output module for exporting crawl results
//!
//! This module handles:
//! - Grouping products by collection and writing the JSON artifacts
//! - The file-backed artifact store
//! - The optional backend relay
//! - Run statistics

mod artifacts;
pub mod backend;
pub mod export;
pub mod stats;

pub use artifacts::{get_json, set_json, FileKeyValueStore, KeyValueStore};
pub use backend::{resolve_base_url, send_export, BackendClient, BACKEND_URL_ENV};
pub use export::{
    group_by_collection, load_collections, load_grouped_products, run_export, ExportFailure,
    ExportSummary, ProductsByCollection, COLLECTIONS_KEY, PRODUCTS_BY_COLLECTION_KEY,
    PRODUCT_IMAGES_KEY,
};
pub use stats::{load_statistics, print_statistics, CrawlStatistics};

use crate::storage::{RunRecord, Storage};
use crate::{HarvestError, Result};

/// Gets the most recent run, failing when the database has none
pub fn latest_run(storage: &dyn Storage) -> Result<RunRecord> {
    storage
        .get_latest_run()?
        .ok_or_else(|| HarvestError::Storage("No crawl runs found in database".to_string()))
}

/// Sends a run's grouped products and collections to the backend
///
/// The datasets are read back before any request goes out.
pub async fn relay_run(backend: &BackendClient, storage: &dyn Storage, run_id: i64) -> Result<()> {
    let products = load_grouped_products(storage, run_id)?;
    let collections = load_collections(storage, run_id)?;

    tracing::info!(
        "Sending {} collections and {} products to the backend",
        collections.len(),
        products.product_count()
    );
    send_export(backend, &products, &collections).await
}
