use crate::extract::{CollectionLink, SiteSelectors};
use crate::url::resolve_href;
use scraper::Html;
use url::Url;

/// Extracts the category links from the shop navigation
///
/// Anchors without an href, or whose href does not resolve, are skipped.
/// Links are returned in document order, duplicates included; the caller
/// decides which ones are new.
pub fn extract_collection_links(
    document: &Html,
    selectors: &SiteSelectors,
    origin: &Url,
) -> Vec<CollectionLink> {
    document
        .select(&selectors.collection_link)
        .filter_map(|element| {
            let href = element.value().attr("href")?;
            let url = resolve_href(origin, href)?;
            Some(CollectionLink {
                text: element.text().collect::<String>().trim().to_string(),
                href: url.to_string(),
            })
        })
        .collect()
}
