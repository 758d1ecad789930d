//! Irbis-Harvest: a catalog scraper for a single miniatures shop
//!
//! This crate crawls the shop's collection pages, extracts product listings,
//! follows product detail pages to download images, and exports the collected
//! data as collection-grouped JSON artifacts.

pub mod config;
pub mod crawler;
pub mod dedup;
pub mod extract;
pub mod images;
pub mod output;
pub mod state;
pub mod storage;
pub mod url;

use thiserror::Error;

/// Collection name used when a product carries no collection context
pub const DEFAULT_COLLECTION: &str = "Uncategorized";

/// Returns the collection name, falling back to [`DEFAULT_COLLECTION`]
/// when it is absent or empty.
pub fn collection_or_default(name: Option<&str>) -> &str {
    match name {
        Some(name) if !name.is_empty() => name,
        _ => DEFAULT_COLLECTION,
    }
}

/// Main error type for Irbis-Harvest operations
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("HTTP error for {url}: {source}")]
    Http { url: String, source: reqwest::Error },

    #[error("Unexpected HTTP status {status} for {url}")]
    Status { url: String, status: u16 },

    #[error("Request failed for {url}: {message}")]
    Request { url: String, message: String },

    #[error("Backend rejected {endpoint} with status {status}")]
    Backend { endpoint: String, status: u16 },

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Storage error: {0}")]
    StorageError(#[from] storage::StorageError),

    #[error("URL error: {0}")]
    UrlError(#[from] UrlError),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error for {path}: {source}")]
    FileIo {
        path: String,
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Task failed: {0}")]
    Task(String),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid selector '{selector}': {message}")]
    InvalidSelector { selector: String, message: String },

    #[error("Backend base URL is not configured (set backend.base-url or {0})")]
    MissingBackendUrl(&'static str),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing host in URL")]
    MissingHost,
}

/// Result type alias for Irbis-Harvest operations
pub type Result<T> = std::result::Result<T, HarvestError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::Config;
pub use dedup::{DedupSet, DedupTracker};
pub use state::RequestState;
pub use url::{resolve_href, unique_key};
