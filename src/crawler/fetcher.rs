//! HTTP fetcher implementation
//!
//! This module handles all page requests for the crawler, including:
//! - Building HTTP clients with proper user agent strings
//! - GET requests to fetch page content
//! - Error classification into retryable and permanent failures

use crate::config::UserAgentConfig;
use reqwest::{redirect::Policy, Client, StatusCode};
use std::time::Duration;

/// Result of a fetch operation
#[derive(Debug)]
pub enum FetchResult {
    /// Successfully fetched the page
    Success {
        /// Final URL after redirects
        final_url: String,
        /// HTTP status code
        status_code: u16,
        /// Page body content
        body: String,
    },

    /// Page is not HTML (Content-Type mismatch)
    ContentMismatch {
        /// The actual Content-Type received
        content_type: String,
    },

    /// Non-success HTTP status
    HttpError {
        /// The HTTP status code
        status_code: u16,
        /// Whether the request may succeed if tried again
        retryable: bool,
    },

    /// Network error (connection refused, timeout, etc.)
    NetworkError {
        /// Error description
        error: String,
        /// Whether the request may succeed if tried again
        retryable: bool,
    },
}

impl FetchResult {
    /// Describes a failed fetch and whether it is worth retrying
    ///
    /// Returns `None` for [`FetchResult::Success`].
    pub fn failure(&self) -> Option<(String, bool)> {
        match self {
            Self::Success { .. } => None,
            Self::ContentMismatch { content_type } => {
                Some((format!("Expected HTML, got {}", content_type), false))
            }
            Self::HttpError {
                status_code,
                retryable,
            } => Some((format!("HTTP {}", status_code), *retryable)),
            Self::NetworkError { error, retryable } => Some((error.clone(), *retryable)),
        }
    }
}

/// Builds an HTTP client with proper configuration
///
/// The same client serves page fetches, image downloads and the backend
/// relay.
///
/// # Arguments
///
/// * `config` - The user agent configuration
/// * `timeout` - Per-request timeout
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
///
/// # Example
///
/// ```no_run
/// use irbis_harvest::config::UserAgentConfig;
/// use irbis_harvest::crawler::build_http_client;
/// use std::time::Duration;
///
/// let config = UserAgentConfig {
///     crawler_name: "IrbisHarvest".to_string(),
///     crawler_version: "1.0".to_string(),
///     contact_url: "https://example.com/about".to_string(),
///     contact_email: "admin@example.com".to_string(),
/// };
///
/// let client = build_http_client(&config, Duration::from_secs(30)).unwrap();
/// ```
pub fn build_http_client(
    config: &UserAgentConfig,
    timeout: Duration,
) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.header_value())
        .timeout(timeout)
        .connect_timeout(Duration::from_secs(10))
        .redirect(Policy::limited(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Fetches a page
///
/// # Error Classification
///
/// | Condition | Retryable |
/// |-----------|-----------|
/// | HTTP 5xx | yes |
/// | HTTP 429 | yes |
/// | Other non-2xx | no |
/// | Timeout | yes |
/// | Connection refused | yes |
/// | Non-HTML Content-Type | no |
/// | Body decode error | yes |
///
/// # Arguments
///
/// * `client` - The HTTP client to use
/// * `url` - The URL to fetch
///
/// # Returns
///
/// A FetchResult indicating success or the type of failure
pub async fn fetch_page(client: &Client, url: &str) -> FetchResult {
    let response = match client.get(url).send().await {
        Ok(response) => response,
        Err(e) => return classify_request_error(&e),
    };

    let status = response.status();
    let final_url = response.url().to_string();

    if !status.is_success() {
        return FetchResult::HttpError {
            status_code: status.as_u16(),
            retryable: is_retryable_status(status),
        };
    }

    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string();

    if !content_type.contains("text/html") {
        return FetchResult::ContentMismatch { content_type };
    }

    match response.text().await {
        Ok(body) => FetchResult::Success {
            final_url,
            status_code: status.as_u16(),
            body,
        },
        Err(e) => FetchResult::NetworkError {
            error: format!("Failed to read body: {}", e),
            retryable: true,
        },
    }
}

fn is_retryable_status(status: StatusCode) -> bool {
    status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS
}

fn classify_request_error(e: &reqwest::Error) -> FetchResult {
    if e.is_timeout() {
        FetchResult::NetworkError {
            error: "Request timeout".to_string(),
            retryable: true,
        }
    } else if e.is_connect() {
        FetchResult::NetworkError {
            error: "Connection refused".to_string(),
            retryable: true,
        }
    } else if e.is_redirect() {
        FetchResult::NetworkError {
            error: format!("Redirect error: {}", e),
            retryable: false,
        }
    } else {
        FetchResult::NetworkError {
            error: e.to_string(),
            retryable: false,
        }
    }
}
