//! Extraction of catalog data from parsed pages
//!
//! Everything here is synchronous and side-effect free: a page is parsed,
//! queried through [`SiteSelectors`], and the results are returned as owned
//! values. The crawl handlers decide what to enqueue, persist and download.
//!
//! - `classify_page`: does the page list products or collections?
//! - `extract_listing_items`: product summaries on a listing page
//! - `extract_collection_links`: category links in the shop navigation
//! - `extract_product_images`: full-size images on a product detail page

mod classifier;
mod collections;
mod detail;
mod products;
mod records;
mod selectors;

pub use classifier::{classify_page, PageKind};
pub use collections::extract_collection_links;
pub use detail::extract_product_images;
pub use products::{extract_listing_items, ListingItem};
pub use records::{CollectionLink, ImageDescriptor, Product, ProductImageRecord};
pub use selectors::SiteSelectors;
