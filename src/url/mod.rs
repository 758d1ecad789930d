//! URL handling module for Irbis-Harvest
//!
//! This module resolves catalog links against the site origin, derives image
//! filenames, and computes the keys the request queue deduplicates on.

mod key;
mod resolve;

use crate::UrlError;
use url::Url;

// Re-export main functions
pub use key::unique_key;
pub use resolve::{file_name_from_url, resolve_href};

/// Parses a configured absolute URL, accepting only http and https
pub fn parse_http_url(value: &str) -> Result<Url, UrlError> {
    let url = Url::parse(value).map_err(|e| UrlError::Parse(e.to_string()))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(url.scheme().to_string()));
    }

    if url.host_str().is_none() {
        return Err(UrlError::MissingHost);
    }

    Ok(url)
}
