//! Crawler module for fetching and dispatching catalog pages
//!
//! This module contains the crawl engine, including:
//! - Crawl requests with their label and collection/product context
//! - The request queue, concurrency limit and request ceiling
//! - HTTP fetching with retry classification
//! - Routing fetched pages to the listing, index and detail handlers
//! - Overall crawl coordination

mod coordinator;
mod fetcher;
mod request;
mod routes;
mod scheduler;

pub use coordinator::{run_crawl, Coordinator, CrawlOutcome};
pub use fetcher::{build_http_client, fetch_page, FetchResult};
pub use request::{CrawlRequest, Label, UserData};
pub use routes::{handle_default, handle_product_detail, route, CrawlContext};
pub use scheduler::{RequestQueue, ScheduledRequest, Scheduler};
