use crate::config::SelectorConfig;
use crate::ConfigError;
use scraper::{ElementRef, Selector};

/// Compiled CSS selectors for the catalog's markup
#[derive(Debug, Clone)]
pub struct SiteSelectors {
    pub listing_item: Selector,
    pub item_name: Selector,
    pub item_description: Selector,
    pub item_price: Selector,
    pub item_link: Selector,
    pub collection_link: Selector,
    pub primary_image: Selector,
    pub gallery_image: Selector,
    pub full_size_marker: String,
}

impl SiteSelectors {
    /// Compiles every configured selector
    pub fn compile(config: &SelectorConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            listing_item: compile(&config.listing_item)?,
            item_name: compile(&config.item_name)?,
            item_description: compile(&config.item_description)?,
            item_price: compile(&config.item_price)?,
            item_link: compile(&config.item_link)?,
            collection_link: compile(&config.collection_link)?,
            primary_image: compile(&config.primary_image)?,
            gallery_image: compile(&config.gallery_image)?,
            full_size_marker: config.full_size_marker.clone(),
        })
    }
}

fn compile(selector: &str) -> Result<Selector, ConfigError> {
    Selector::parse(selector).map_err(|e| ConfigError::InvalidSelector {
        selector: selector.to_string(),
        message: e.to_string(),
    })
}

/// Trimmed text of the first descendant matching `selector`, or empty
pub fn text_of(element: &ElementRef<'_>, selector: &Selector) -> String {
    element
        .select(selector)
        .next()
        .map(|el| el.text().collect::<String>().trim().to_string())
        .unwrap_or_default()
}

/// Attribute of the first descendant matching `selector`
pub fn attr_of<'a>(element: &ElementRef<'a>, selector: &Selector, attr: &str) -> Option<&'a str> {
    element
        .select(selector)
        .next()
        .and_then(|el| el.value().attr(attr))
}
