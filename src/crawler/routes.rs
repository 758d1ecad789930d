//! Page handlers and the label router
//!
//! Requests without a label go to the default handler, which classifies the
//! page and extracts either products or collection links. `PRODUCT_DETAIL`
//! requests go to the detail handler, which downloads the product images.
//!
//! Parsed documents are not `Send`, so every handler extracts what it needs
//! synchronously and drops the document before its first `.await`.

use crate::crawler::request::{CrawlRequest, Label};
use crate::crawler::scheduler::RequestQueue;
use crate::dedup::{DedupSet, DedupTracker};
use crate::extract::{
    classify_page, extract_collection_links, extract_listing_items, extract_product_images,
    CollectionLink, PageKind, Product, ProductImageRecord, SiteSelectors,
};
use crate::images::{download_sequentially, product_output_dir, ImageFetcher};
use crate::storage::{push_records, Dataset, SqliteStorage, StorageResult};
use crate::{collection_or_default, HarvestError, Result};
use scraper::Html;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use url::Url;

/// Everything a page handler needs, shared by all in-flight requests
pub struct CrawlContext {
    pub run_id: i64,
    pub origin: Url,
    pub selectors: SiteSelectors,
    pub images_dir: PathBuf,
    pub image_fetcher: ImageFetcher,
    pub queue: RequestQueue,
    pub dedup: Arc<DedupTracker>,
    pub storage: Arc<Mutex<SqliteStorage>>,
}

impl CrawlContext {
    /// Appends a batch of records to a dataset of the current run
    pub fn push<T: Serialize>(&self, dataset: Dataset, records: &[T]) -> Result<usize> {
        self.with_storage(|storage| push_records(storage, self.run_id, dataset, records))
    }

    /// Runs `f` with the storage lock held
    pub fn with_storage<T>(
        &self,
        f: impl FnOnce(&mut SqliteStorage) -> StorageResult<T>,
    ) -> Result<T> {
        let mut storage = self
            .storage
            .lock()
            .map_err(|_| HarvestError::Storage("Storage lock poisoned".to_string()))?;
        Ok(f(&mut storage)?)
    }
}

/// Dispatches a fetched page to the handler for its label
pub async fn route(ctx: &CrawlContext, request: &CrawlRequest, body: &str) -> Result<()> {
    match request.label {
        None => handle_default(ctx, request, body),
        Some(Label::ProductDetail) => handle_product_detail(ctx, request, body).await,
    }
}

/// Default handler: listing pages yield products, anything else is
/// treated as a collection index
pub fn handle_default(ctx: &CrawlContext, request: &CrawlRequest, body: &str) -> Result<()> {
    let document = Html::parse_document(body);

    match classify_page(&document, &ctx.selectors) {
        PageKind::Products => handle_products(ctx, request, &document),
        PageKind::Collections => handle_collections(ctx, request, &document),
    }
}

fn handle_products(ctx: &CrawlContext, request: &CrawlRequest, document: &Html) -> Result<()> {
    let collection = collection_or_default(request.user_data.collection_name.as_deref());
    let items = extract_listing_items(document, &ctx.selectors, &ctx.origin);

    if items.is_empty() {
        tracing::info!("No products found on {}", request.url);
        return Ok(());
    }

    let mut products: Vec<Product> = Vec::with_capacity(items.len());
    for item in items {
        if ctx.dedup.check_and_mark(DedupSet::Products, item.url.as_str()) {
            let detail = CrawlRequest::product_detail(item.url.clone(), &item.name, collection);
            if !ctx.queue.add_request(detail) {
                tracing::debug!("Detail page {} was not enqueued", item.url);
            }
        }
        products.push(item.into_product(collection));
    }

    ctx.push(Dataset::Products, &products)?;
    tracing::info!(
        "Extracted {} products from {} ({})",
        products.len(),
        request.url,
        collection
    );

    Ok(())
}

fn handle_collections(ctx: &CrawlContext, request: &CrawlRequest, document: &Html) -> Result<()> {
    let new_links: Vec<CollectionLink> = extract_collection_links(document, &ctx.selectors, &ctx.origin)
        .into_iter()
        .filter(|link| ctx.dedup.check_and_mark(DedupSet::Collections, &link.href))
        .collect();

    for link in &new_links {
        match Url::parse(&link.href) {
            Ok(url) => {
                ctx.queue.add_request(CrawlRequest::collection(url, &link.text));
            }
            Err(e) => tracing::warn!("Cannot enqueue collection {}: {}", link.href, e),
        }
    }

    if new_links.is_empty() {
        tracing::info!("No new collections found on {}", request.url);
        return Ok(());
    }

    ctx.push(Dataset::Collections, &new_links)?;
    tracing::info!(
        "Found {} new collections on {}",
        new_links.len(),
        request.url
    );

    Ok(())
}

/// Detail handler: downloads every image of one product, then records the
/// images that made it to disk
///
/// The record is written even when every download failed.
pub async fn handle_product_detail(
    ctx: &CrawlContext,
    request: &CrawlRequest,
    body: &str,
) -> Result<()> {
    let images = {
        let document = Html::parse_document(body);
        extract_product_images(&document, &ctx.selectors, &ctx.origin)
    };

    let product_name = request.user_data.product_name.clone().unwrap_or_default();
    let collection_name =
        collection_or_default(request.user_data.collection_name.as_deref()).to_string();

    if images.is_empty() {
        tracing::info!("No images found for {} ({})", product_name, request.url);
        return Ok(());
    }

    let output_dir = product_output_dir(&ctx.images_dir, &product_name);
    let outcomes = download_sequentially(&ctx.image_fetcher, &images, &output_dir).await;
    let attempted = outcomes.len();
    let downloaded: Vec<_> = images
        .into_iter()
        .zip(outcomes)
        .filter(|(_, outcome)| outcome.is_success())
        .map(|(image, _)| image)
        .collect();

    let record = ProductImageRecord {
        product_name,
        collection_name,
        images: downloaded,
        output_dir: output_dir.display().to_string(),
    };
    ctx.push(Dataset::ProductImages, std::slice::from_ref(&record))?;

    tracing::info!(
        "Downloaded {}/{} images for {} into {}",
        record.images.len(),
        attempted,
        record.product_name,
        record.output_dir
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SelectorConfig;
    use crate::storage::{read_records, Storage};
    use reqwest::Client;

    const LISTING: &str = r#"
        <html><body>
          <div class="tovar">
            <h2><a href="/p/1">Goblin</a></h2>
            <div class="t_note">A small goblin</div>
            <ul><li class="price"><span><b>$5</b></span></li></ul>
          </div>
        </body></html>
    "#;

    const INDEX: &str = r#"
        <html><body>
          <nav class="shop-folders-wrap"><ul class="shop-folders">
            <li><a href="/shop/monsters">Monsters</a></li>
            <li><a href="/shop/heroes">Heroes</a></li>
            <li><a>Broken</a></li>
          </ul></nav>
        </body></html>
    "#;

    fn context(storage: SqliteStorage, run_id: i64, images_dir: PathBuf) -> CrawlContext {
        CrawlContext {
            run_id,
            origin: Url::parse("http://irbis-miniatures.com").unwrap(),
            selectors: SiteSelectors::compile(&SelectorConfig::default()).unwrap(),
            images_dir,
            image_fetcher: ImageFetcher::new(Client::new()),
            queue: RequestQueue::new(),
            dedup: Arc::new(DedupTracker::new()),
            storage: Arc::new(Mutex::new(storage)),
        }
    }

    fn test_context() -> CrawlContext {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        let run_id = storage.create_run("hash").unwrap();
        context(storage, run_id, PathBuf::from("output/images"))
    }

    fn products(ctx: &CrawlContext) -> Vec<Product> {
        let storage = ctx.storage.lock().unwrap();
        read_records(&*storage, ctx.run_id, Dataset::Products).unwrap()
    }

    #[test]
    fn test_listing_page_twice_enqueues_detail_once() {
        let ctx = test_context();
        let url = Url::parse("http://irbis-miniatures.com/shop/monsters").unwrap();
        let request = CrawlRequest::collection(url, "Monsters");

        handle_default(&ctx, &request, LISTING).unwrap();
        handle_default(&ctx, &request, LISTING).unwrap();

        let stored = products(&ctx);
        assert_eq!(stored.len(), 2);
        assert_eq!(
            stored[0],
            Product {
                name: "Goblin".to_string(),
                description: "A small goblin".to_string(),
                price: "$5".to_string(),
                collection: "Monsters".to_string(),
                url: "http://irbis-miniatures.com/p/1".to_string(),
            }
        );

        assert_eq!(ctx.queue.pending_count(), 1);
        let detail = ctx.queue.fetch_next().unwrap();
        assert_eq!(detail.label, Some(Label::ProductDetail));
        assert_eq!(detail.user_data.product_name.as_deref(), Some("Goblin"));
        assert_eq!(detail.user_data.collection_name.as_deref(), Some("Monsters"));
    }

    #[test]
    fn test_listing_without_collection_context() {
        let ctx = test_context();
        let request = CrawlRequest::new(Url::parse("http://irbis-miniatures.com/").unwrap());

        handle_default(&ctx, &request, LISTING).unwrap();

        assert_eq!(products(&ctx)[0].collection, "Uncategorized");
    }

    #[test]
    fn test_index_page_enqueues_new_collections() {
        let ctx = test_context();
        let request = CrawlRequest::new(Url::parse("http://irbis-miniatures.com/").unwrap());

        handle_default(&ctx, &request, INDEX).unwrap();
        handle_default(&ctx, &request, INDEX).unwrap();

        let storage = ctx.storage.lock().unwrap();
        let links: Vec<CollectionLink> =
            read_records(&*storage, ctx.run_id, Dataset::Collections).unwrap();
        assert_eq!(links.len(), 2);
        assert_eq!(links[0].text, "Monsters");
        assert_eq!(links[0].href, "http://irbis-miniatures.com/shop/monsters");

        let queued = ctx.queue.drain();
        assert_eq!(queued.len(), 2);
        assert_eq!(queued[1].user_data.collection_name.as_deref(), Some("Heroes"));
        assert_eq!(queued[1].label, None);
    }

    #[test]
    fn test_empty_page_persists_nothing() {
        let ctx = test_context();
        let request = CrawlRequest::new(Url::parse("http://irbis-miniatures.com/").unwrap());

        handle_default(&ctx, &request, "<html><body></body></html>").unwrap();

        let storage = ctx.storage.lock().unwrap();
        for dataset in Dataset::all() {
            assert_eq!(storage.count_items(ctx.run_id, dataset).unwrap(), 0);
        }
        assert!(ctx.queue.is_empty());
    }

    #[tokio::test]
    async fn test_detail_without_images_persists_nothing() {
        let ctx = test_context();
        let url = Url::parse("http://irbis-miniatures.com/p/1").unwrap();
        let request = CrawlRequest::product_detail(url, "Goblin", "Monsters");

        handle_product_detail(&ctx, &request, "<html><body></body></html>")
            .await
            .unwrap();

        let storage = ctx.storage.lock().unwrap();
        assert_eq!(
            storage.count_items(ctx.run_id, Dataset::ProductImages).unwrap(),
            0
        );
    }

    #[tokio::test]
    async fn test_detail_record_keeps_only_downloaded_images() {
        use wiremock::matchers::{method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/d/ok.jpg"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"jpeg".to_vec()))
            .mount(&server)
            .await;
        // /d/broken.jpg is not mounted and answers 404

        let dir = tempfile::tempdir().unwrap();
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        let run_id = storage.create_run("hash").unwrap();
        let mut ctx = context(storage, run_id, dir.path().to_path_buf());
        ctx.origin = Url::parse(&server.uri()).unwrap();

        let url = Url::parse(&format!("{}/p/1", server.uri())).unwrap();
        let request = CrawlRequest::product_detail(url, "Goblin", "Monsters");
        let body = r#"
            <a class="enlarge" href="/d/broken.jpg">big</a>
            <div class="gallery"><a href="/d/ok.jpg">more</a></div>
        "#;

        handle_product_detail(&ctx, &request, body).await.unwrap();

        let storage = ctx.storage.lock().unwrap();
        let records: Vec<ProductImageRecord> =
            read_records(&*storage, run_id, Dataset::ProductImages).unwrap();
        assert_eq!(records.len(), 1);
        let filenames: Vec<&str> = records[0]
            .images
            .iter()
            .map(|image| image.filename.as_str())
            .collect();
        assert_eq!(filenames, vec!["ok.jpg"]);
        assert!(dir.path().join("goblin/ok.jpg").exists());
        assert!(!dir.path().join("goblin/broken.jpg").exists());
    }

    #[tokio::test]
    async fn test_detail_record_without_failed_downloads() {
        let dir = tempfile::tempdir().unwrap();
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        let run_id = storage.create_run("hash").unwrap();
        // Nothing listens on the origin's port in tests, so every download fails
        let mut ctx = context(storage, run_id, dir.path().to_path_buf());
        ctx.origin = Url::parse("http://127.0.0.1:9").unwrap();

        let url = Url::parse("http://127.0.0.1:9/p/1").unwrap();
        let request = CrawlRequest::product_detail(url, "Orc King", "Monsters");
        let body = r#"<a class="enlarge" href="/d/orc.jpg">big</a>"#;

        handle_product_detail(&ctx, &request, body).await.unwrap();

        let storage = ctx.storage.lock().unwrap();
        let records: Vec<ProductImageRecord> =
            read_records(&*storage, run_id, Dataset::ProductImages).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].product_name, "Orc King");
        assert!(records[0].images.is_empty());
        let expected_dir = dir.path().join("orc_king");
        assert_eq!(records[0].output_dir, expected_dir.display().to_string());
    }
}
