use crate::extract::selectors::{attr_of, text_of};
use crate::extract::{Product, SiteSelectors};
use crate::url::resolve_href;
use scraper::Html;
use url::Url;

/// A listing item with its detail link already resolved
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingItem {
    pub name: String,
    pub description: String,
    pub price: String,
    pub url: Url,
}

impl ListingItem {
    /// Builds the persisted product record for this item
    pub fn into_product(self, collection: &str) -> Product {
        Product {
            name: self.name,
            description: self.description,
            price: self.price,
            collection: collection.to_string(),
            url: self.url.to_string(),
        }
    }
}

/// Extracts every well-formed listing item on a page
///
/// Items without a detail link (or whose link does not resolve against the
/// origin) are skipped; missing text fields become empty strings.
pub fn extract_listing_items(
    document: &Html,
    selectors: &SiteSelectors,
    origin: &Url,
) -> Vec<ListingItem> {
    let mut items = Vec::new();

    for element in document.select(&selectors.listing_item) {
        let Some(href) = attr_of(&element, &selectors.item_link, "href") else {
            tracing::debug!("Skipping listing item without a detail link");
            continue;
        };

        let Some(url) = resolve_href(origin, href) else {
            tracing::debug!("Skipping listing item with unusable link: {}", href);
            continue;
        };

        items.push(ListingItem {
            name: text_of(&element, &selectors.item_name),
            description: text_of(&element, &selectors.item_description),
            price: text_of(&element, &selectors.item_price),
            url,
        });
    }

    items
}
