use serde::{Deserialize, Serialize};

/// One product as shown on a collection's listing page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub name: String,
    pub description: String,
    /// Raw price text, currency not parsed
    pub price: String,
    #[serde(default)]
    pub collection: String,
    /// Absolute URL of the product detail page
    pub url: String,
}

/// A category link found in the shop navigation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionLink {
    /// Display name
    pub text: String,
    /// Absolute URL
    pub href: String,
}

/// One downloadable image on a product detail page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageDescriptor {
    pub url: String,
    pub filename: String,
}

/// Image manifest for one visited product detail page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductImageRecord {
    pub product_name: String,
    pub collection_name: String,
    pub images: Vec<ImageDescriptor>,
    pub output_dir: String,
}
