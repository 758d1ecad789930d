//! Export and grouping pipeline
//!
//! Runs once after the crawl. Reads the run's datasets back, groups products
//! by collection and writes the artifacts. Each artifact is an independent
//! step: a failing step is logged and reported while the others still run.

use crate::extract::{CollectionLink, Product, ProductImageRecord};
use crate::output::artifacts::{set_json, KeyValueStore};
use crate::storage::{read_records, Dataset, Storage};
use crate::{collection_or_default, Result};
use serde::ser::{Serialize, SerializeMap, Serializer};

/// Artifact key of the grouped products
pub const PRODUCTS_BY_COLLECTION_KEY: &str = "products_by_collection.json";
/// Artifact key of the flat collection list
pub const COLLECTIONS_KEY: &str = "collections.json";
/// Artifact key of the product image manifests
pub const PRODUCT_IMAGES_KEY: &str = "product_images.json";

/// Products grouped by collection name
///
/// Groups keep the order in which their collection was first seen, and
/// products keep their order within a group. Serializes as a JSON object.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductsByCollection {
    groups: Vec<(String, Vec<Product>)>,
}

impl ProductsByCollection {
    /// Adds a product to its collection's group
    pub fn insert(&mut self, product: Product) {
        let key = collection_or_default(Some(&product.collection));
        match self.groups.iter_mut().find(|(name, _)| name == key) {
            Some((_, products)) => products.push(product),
            None => {
                let key = key.to_string();
                self.groups.push((key, vec![product]));
            }
        }
    }

    /// Products of one collection
    pub fn get(&self, collection: &str) -> Option<&[Product]> {
        self.groups
            .iter()
            .find(|(name, _)| name == collection)
            .map(|(_, products)| products.as_slice())
    }

    /// Collection names in first-seen order
    pub fn collection_names(&self) -> impl Iterator<Item = &str> {
        self.groups.iter().map(|(name, _)| name.as_str())
    }

    /// Number of groups
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Number of products across all groups
    pub fn product_count(&self) -> usize {
        self.groups.iter().map(|(_, products)| products.len()).sum()
    }
}

impl Serialize for ProductsByCollection {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.groups.len()))?;
        for (name, products) in &self.groups {
            map.serialize_entry(name, products)?;
        }
        map.end()
    }
}

/// Groups products by collection, defaulting an empty collection to
/// `"Uncategorized"`
pub fn group_by_collection(products: impl IntoIterator<Item = Product>) -> ProductsByCollection {
    products
        .into_iter()
        .fold(ProductsByCollection::default(), |mut grouped, product| {
            grouped.insert(product);
            grouped
        })
}

/// A failed export step
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportFailure {
    pub artifact: &'static str,
    pub error: String,
}

/// What the export wrote
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExportSummary {
    /// Number of products across all groups
    pub products: usize,
    /// Number of collection groups
    pub groups: usize,
    pub collections: usize,
    pub product_images: usize,
    /// Artifact keys that were written
    pub written: Vec<&'static str>,
    pub failures: Vec<ExportFailure>,
}

impl ExportSummary {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    fn record(&mut self, artifact: &'static str, result: Result<()>) {
        match result {
            Ok(()) => {
                tracing::info!("Wrote {}", artifact);
                self.written.push(artifact);
            }
            Err(e) => {
                tracing::error!("Failed to export {}: {}", artifact, e);
                self.failures.push(ExportFailure {
                    artifact,
                    error: e.to_string(),
                });
            }
        }
    }
}

/// Loads the run's products and groups them by collection
pub fn load_grouped_products(storage: &dyn Storage, run_id: i64) -> Result<ProductsByCollection> {
    let products: Vec<Product> = read_records(storage, run_id, Dataset::Products)?;
    Ok(group_by_collection(products))
}

/// Loads the run's collection links in discovery order
pub fn load_collections(storage: &dyn Storage, run_id: i64) -> Result<Vec<CollectionLink>> {
    Ok(read_records(storage, run_id, Dataset::Collections)?)
}

/// Writes the run's artifacts to `store`
///
/// `product_images.json` is only written when the run recorded any image
/// manifests.
pub fn run_export(storage: &dyn Storage, store: &dyn KeyValueStore, run_id: i64) -> ExportSummary {
    tracing::info!("Exporting run {}", run_id);
    let mut summary = ExportSummary::default();

    let result = load_grouped_products(storage, run_id).and_then(|grouped| {
        tracing::info!(
            "Grouped {} products into {} collections",
            grouped.product_count(),
            grouped.len()
        );
        summary.products = grouped.product_count();
        summary.groups = grouped.len();
        set_json(store, PRODUCTS_BY_COLLECTION_KEY, &grouped)
    });
    summary.record(PRODUCTS_BY_COLLECTION_KEY, result);

    let result = load_collections(storage, run_id).and_then(|collections| {
        summary.collections = collections.len();
        set_json(store, COLLECTIONS_KEY, &collections)
    });
    summary.record(COLLECTIONS_KEY, result);

    match read_records::<ProductImageRecord>(storage, run_id, Dataset::ProductImages) {
        Ok(records) if records.is_empty() => {
            tracing::info!("No product image records to export");
        }
        Ok(records) => {
            summary.product_images = records.len();
            let result = set_json(store, PRODUCT_IMAGES_KEY, &records);
            summary.record(PRODUCT_IMAGES_KEY, result);
        }
        Err(e) => summary.record(PRODUCT_IMAGES_KEY, Err(e.into())),
    }

    summary
}
