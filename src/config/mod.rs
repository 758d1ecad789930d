//! Configuration module for Irbis-Harvest
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use irbis_harvest::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("harvest.toml")).unwrap();
//! println!("Request ceiling: {}", config.crawler.max_requests_per_crawl);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    BackendConfig, Config, CrawlerConfig, OutputConfig, SelectorConfig, SiteConfig,
    UserAgentConfig,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash};
pub use validation::validate;
