use serde::Deserialize;

/// Main configuration structure for Irbis-Harvest
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub crawler: CrawlerConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    pub site: SiteConfig,
    #[serde(default)]
    pub selectors: SelectorConfig,
    pub output: OutputConfig,
    #[serde(default)]
    pub backend: BackendConfig,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// URLs the crawl starts from
    #[serde(rename = "start-urls")]
    pub start_urls: Vec<String>,

    /// Maximum number of requests dispatched in one run
    #[serde(rename = "max-requests-per-crawl", default = "default_max_requests")]
    pub max_requests_per_crawl: u32,

    /// Maximum number of pages in flight at once
    #[serde(rename = "max-concurrency", default = "default_max_concurrency")]
    pub max_concurrency: u32,

    /// How many times a failed request is retried before it is given up
    #[serde(rename = "max-request-retries", default = "default_max_retries")]
    pub max_request_retries: u32,

    /// Per-request timeout (seconds)
    #[serde(rename = "request-timeout-secs", default = "default_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_max_requests() -> u32 {
    50
}

fn default_max_concurrency() -> u32 {
    10
}

fn default_max_retries() -> u32 {
    3
}

fn default_timeout_secs() -> u64 {
    30
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Name of the crawler
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url")]
    pub contact_url: String,

    /// Email address for crawler-related contact
    #[serde(rename = "contact-email")]
    pub contact_email: String,
}

impl UserAgentConfig {
    /// Formats the header value: `Name/Version (+ContactURL; ContactEmail)`
    pub fn header_value(&self) -> String {
        format!(
            "{}/{} (+{}; {})",
            self.crawler_name, self.crawler_version, self.contact_url, self.contact_email
        )
    }
}

/// The catalog site being scraped
#[derive(Debug, Clone, Deserialize)]
pub struct SiteConfig {
    /// Origin that relative catalog links are resolved against
    pub origin: String,
}

/// CSS selectors describing the catalog's markup
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SelectorConfig {
    /// One product summary block on a listing page
    #[serde(rename = "listing-item")]
    pub listing_item: String,

    #[serde(rename = "item-name")]
    pub item_name: String,

    #[serde(rename = "item-description")]
    pub item_description: String,

    #[serde(rename = "item-price")]
    pub item_price: String,

    /// Anchor (inside a listing item) pointing at the detail page
    #[serde(rename = "item-link")]
    pub item_link: String,

    /// Category anchors in the shop navigation
    #[serde(rename = "collection-link")]
    pub collection_link: String,

    /// "Enlarge" anchor wrapping the main product image
    #[serde(rename = "primary-image")]
    pub primary_image: String,

    /// Secondary image anchors inside the gallery container
    #[serde(rename = "gallery-image")]
    pub gallery_image: String,

    /// Path fragment that only full-size image URLs contain
    #[serde(rename = "full-size-marker")]
    pub full_size_marker: String,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            listing_item: ".tovar".to_string(),
            item_name: "h2 a".to_string(),
            item_description: ".t_note".to_string(),
            item_price: "li.price span b".to_string(),
            item_link: "h2 a".to_string(),
            collection_link: "nav.shop-folders-wrap ul.shop-folders li a".to_string(),
            primary_image: "a.enlarge".to_string(),
            gallery_image: ".gallery a".to_string(),
            full_size_marker: "/d/".to_string(),
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Path to the SQLite database holding runs and datasets
    #[serde(rename = "database-path")]
    pub database_path: String,

    /// Directory the exported JSON artifacts are written to
    #[serde(rename = "artifacts-dir")]
    pub artifacts_dir: String,

    /// Base directory for downloaded product images
    #[serde(rename = "images-dir", default = "default_images_dir")]
    pub images_dir: String,
}

fn default_images_dir() -> String {
    "output/images".to_string()
}

/// Optional relay of the exported artifacts to a backend API
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BackendConfig {
    /// Whether the relay runs after export
    #[serde(default)]
    pub enabled: bool,

    /// API base URL; falls back to the `BACKEND_API_URL` environment variable
    #[serde(rename = "base-url")]
    pub base_url: Option<String>,
}
