use crate::extract::SiteSelectors;
use scraper::Html;

/// What a fetched catalog page shows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageKind {
    /// At least one product listing item is present
    Products,
    /// No listing items; the page is treated as a collection index
    Collections,
}

/// Classifies a parsed page by checking for listing items
pub fn classify_page(document: &Html, selectors: &SiteSelectors) -> PageKind {
    if document.select(&selectors.listing_item).next().is_some() {
        PageKind::Products
    } else {
        PageKind::Collections
    }
}
