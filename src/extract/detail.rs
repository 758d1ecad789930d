use crate::extract::{ImageDescriptor, SiteSelectors};
use crate::url::{file_name_from_url, resolve_href};
use scraper::Html;
use url::Url;

/// Extracts the full-size image URLs from a product detail page
///
/// The primary image comes from the first "enlarge" anchor, if present.
/// Gallery anchors are kept only when their href contains the full-size
/// marker, which filters out thumbnails. Repeated URLs are dropped, keeping
/// the first occurrence, and anchors whose URL has no final path segment are
/// skipped since no filename can be derived.
pub fn extract_product_images(
    document: &Html,
    selectors: &SiteSelectors,
    origin: &Url,
) -> Vec<ImageDescriptor> {
    let primary = document
        .select(&selectors.primary_image)
        .next()
        .and_then(|el| el.value().attr("href"));

    let gallery = document
        .select(&selectors.gallery_image)
        .filter_map(|el| el.value().attr("href"))
        .filter(|href| href.contains(&selectors.full_size_marker));

    let mut images: Vec<ImageDescriptor> = Vec::new();

    for href in primary.into_iter().chain(gallery) {
        let Some(url) = resolve_href(origin, href) else {
            continue;
        };
        let Some(filename) = file_name_from_url(&url) else {
            tracing::debug!("Skipping image without a filename: {}", url);
            continue;
        };

        let url = url.to_string();
        if images.iter().any(|image| image.url == url) {
            continue;
        }
        images.push(ImageDescriptor { url, filename });
    }

    images
}
