//! Integration tests for the crawler
//!
//! These tests use wiremock to serve a small copy of the shop and run the
//! full crawl, export and relay cycle end-to-end.

use irbis_harvest::config::{
    BackendConfig, Config, CrawlerConfig, OutputConfig, SelectorConfig, SiteConfig,
    UserAgentConfig,
};
use irbis_harvest::crawler::run_crawl;
use irbis_harvest::extract::{Product, ProductImageRecord};
use irbis_harvest::output::{
    get_json, relay_run, run_export, BackendClient, FileKeyValueStore, KeyValueStore,
    COLLECTIONS_KEY, PRODUCTS_BY_COLLECTION_KEY, PRODUCT_IMAGES_KEY,
};
use irbis_harvest::state::RequestState;
use irbis_harvest::storage::{read_records, Dataset, SqliteStorage, Storage};
use irbis_harvest::HarvestError;
use std::collections::HashMap;
use std::path::Path;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const INDEX_PAGE: &str = r#"<html><body>
<nav class="shop-folders-wrap"><ul class="shop-folders">
  <li><a href="/shop/monsters">Monsters</a></li>
  <li><a href="/shop/heroes">Heroes</a></li>
</ul></nav>
</body></html>"#;

const MONSTERS_PAGE: &str = r#"<html><body>
<div class="tovar">
  <h2><a href="/p/1">Goblin</a></h2>
  <div class="t_note">A small goblin</div>
  <ul><li class="price"><span><b>$5</b></span></li></ul>
</div>
<div class="tovar">
  <h2><a href="/p/2">Orc King (Painted)!</a></h2>
  <div class="t_note">Big and green</div>
  <ul><li class="price"><span><b>$12</b></span></li></ul>
</div>
<div class="tovar"><h2>No link here</h2></div>
</body></html>"#;

const HEROES_PAGE: &str = r#"<html><body>
<div class="tovar">
  <h2><a href="/p/3">Knight</a></h2>
  <div class="t_note">Shiny armor</div>
  <ul><li class="price"><span><b>$7</b></span></li></ul>
</div>
<div class="tovar">
  <h2><a href="/p/1">Goblin</a></h2>
  <div class="t_note">A small goblin</div>
  <ul><li class="price"><span><b>$5</b></span></li></ul>
</div>
</body></html>"#;

const GOBLIN_DETAIL: &str = r#"<html><body>
<a class="enlarge" href="/d/goblin.jpg">Enlarge</a>
<div class="gallery">
  <a href="/d/goblin_back.jpg">back</a>
  <a href="/t/goblin_thumb.jpg">thumb</a>
</div>
</body></html>"#;

const ORC_DETAIL: &str = r#"<html><body>
<div class="gallery"><a href="/d/orc.jpg">front</a></div>
</body></html>"#;

const KNIGHT_DETAIL: &str = r#"<html><body><p>No pictures yet</p></body></html>"#;

fn html(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(body, "text/html; charset=utf-8")
}

async fn mount_page(server: &MockServer, route: &str, body: &str) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(html(body))
        .mount(server)
        .await;
}

/// Serves the index, two collections, three detail pages and their images
async fn mount_shop(server: &MockServer) {
    mount_page(server, "/", INDEX_PAGE).await;
    mount_page(server, "/shop/monsters", MONSTERS_PAGE).await;
    mount_page(server, "/shop/heroes", HEROES_PAGE).await;
    mount_page(server, "/p/1", GOBLIN_DETAIL).await;
    mount_page(server, "/p/2", ORC_DETAIL).await;
    mount_page(server, "/p/3", KNIGHT_DETAIL).await;

    for image in ["/d/goblin.jpg", "/d/goblin_back.jpg"] {
        Mock::given(method("GET"))
            .and(path(image))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"jpeg".to_vec()))
            .mount(server)
            .await;
    }

    Mock::given(method("GET"))
        .and(path("/d/orc.jpg"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"orc".to_vec()))
        .mount(server)
        .await;
}

/// Creates a test configuration crawling `origin` from its root
fn create_test_config(origin: &str, dir: &Path, max_concurrency: u32) -> Config {
    Config {
        crawler: CrawlerConfig {
            start_urls: vec![format!("{}/", origin)],
            max_requests_per_crawl: 50,
            max_concurrency,
            max_request_retries: 1,
            request_timeout_secs: 5,
        },
        user_agent: UserAgentConfig {
            crawler_name: "TestBot".to_string(),
            crawler_version: "1.0.0".to_string(),
            contact_url: "https://example.com/contact".to_string(),
            contact_email: "test@example.com".to_string(),
        },
        site: SiteConfig {
            origin: origin.to_string(),
        },
        selectors: SelectorConfig::default(),
        output: OutputConfig {
            database_path: dir.join("harvest.db").display().to_string(),
            artifacts_dir: dir.join("artifacts").display().to_string(),
            images_dir: dir.join("images").display().to_string(),
        },
        backend: BackendConfig::default(),
    }
}

fn open_storage(config: &Config) -> SqliteStorage {
    SqliteStorage::new(Path::new(&config.output.database_path)).expect("Failed to open database")
}

async fn requests_to(server: &MockServer, route: &str) -> usize {
    server
        .received_requests()
        .await
        .expect("Request recording is enabled")
        .iter()
        .filter(|r| r.url.path() == route)
        .count()
}

#[tokio::test]
async fn test_full_crawl_and_export() {
    let mock_server = MockServer::start().await;
    mount_shop(&mock_server).await;
    let origin = mock_server.uri();
    let dir = TempDir::new().unwrap();
    let config = create_test_config(&origin, dir.path(), 1);

    let outcome = run_crawl(&config, "test-hash").await.expect("Crawl failed");

    // index + 2 collections + 3 detail pages
    assert_eq!(outcome.handled, 6);
    assert_eq!(outcome.failed, 0);
    assert_eq!(outcome.skipped, 0);

    let storage = open_storage(&config);
    let run = storage.get_run(outcome.run_id).unwrap();
    assert!(run.finished_at.is_some());
    assert_eq!(run.config_hash, "test-hash");

    let products: Vec<Product> = read_records(&storage, outcome.run_id, Dataset::Products).unwrap();
    assert_eq!(products.len(), 4);
    assert_eq!(
        products[0],
        Product {
            name: "Goblin".to_string(),
            description: "A small goblin".to_string(),
            price: "$5".to_string(),
            collection: "Monsters".to_string(),
            url: format!("{}/p/1", origin),
        }
    );

    // Goblin is listed twice but its detail page is fetched once
    assert_eq!(requests_to(&mock_server, "/p/1").await, 1);

    // Images land under the sanitized product name; the thumbnail is skipped
    let images_dir = dir.path().join("images");
    assert!(images_dir.join("goblin/goblin.jpg").exists());
    assert!(images_dir.join("goblin/goblin_back.jpg").exists());
    assert!(images_dir.join("orc_king__painted__/orc.jpg").exists());
    assert_eq!(requests_to(&mock_server, "/t/goblin_thumb.jpg").await, 0);

    let store = FileKeyValueStore::new(&config.output.artifacts_dir);
    let summary = run_export(&storage, &store, outcome.run_id);
    assert!(summary.is_success());
    assert_eq!(summary.products, 4);
    assert_eq!(summary.groups, 2);
    assert_eq!(summary.collections, 2);
    assert_eq!(summary.product_images, 2);

    let grouped: HashMap<String, Vec<Product>> = get_json(&store, PRODUCTS_BY_COLLECTION_KEY)
        .unwrap()
        .unwrap();
    assert_eq!(grouped["Monsters"].len(), 2);
    assert_eq!(grouped["Heroes"].len(), 2);
    let total: usize = grouped.values().map(Vec::len).sum();
    assert_eq!(total, products.len());

    let collections = store.get_value(COLLECTIONS_KEY).unwrap().unwrap();
    assert_eq!(collections[0]["text"], "Monsters");
    assert_eq!(collections[0]["href"], format!("{}/shop/monsters", origin));
    assert_eq!(collections[1]["text"], "Heroes");

    let manifests: Vec<ProductImageRecord> = get_json(&store, PRODUCT_IMAGES_KEY).unwrap().unwrap();
    assert_eq!(manifests.len(), 2);
    let goblin = manifests
        .iter()
        .find(|m| m.product_name == "Goblin")
        .unwrap();
    assert_eq!(goblin.collection_name, "Monsters");
    assert_eq!(goblin.images.len(), 2);
    assert_eq!(goblin.images[0].filename, "goblin.jpg");

    // Gallery-only detail page: exactly one image attempted and recorded
    let orc = manifests
        .iter()
        .find(|m| m.product_name == "Orc King (Painted)!")
        .unwrap();
    assert_eq!(orc.images.len(), 1);
    assert_eq!(requests_to(&mock_server, "/d/orc.jpg").await, 1);
}

#[tokio::test]
async fn test_concurrent_crawl_enqueues_each_detail_once() {
    let mock_server = MockServer::start().await;
    mount_shop(&mock_server).await;
    let dir = TempDir::new().unwrap();
    let config = create_test_config(&mock_server.uri(), dir.path(), 4);

    let outcome = run_crawl(&config, "test-hash").await.expect("Crawl failed");

    assert_eq!(outcome.handled, 6);
    for route in ["/", "/shop/monsters", "/shop/heroes", "/p/1", "/p/2", "/p/3"] {
        assert_eq!(requests_to(&mock_server, route).await, 1, "{} fetched once", route);
    }

    let storage = open_storage(&config);
    assert_eq!(
        storage
            .count_items(outcome.run_id, Dataset::Products)
            .unwrap(),
        4
    );
    assert_eq!(
        storage
            .count_items(outcome.run_id, Dataset::Collections)
            .unwrap(),
        2
    );
}

#[tokio::test]
async fn test_failed_image_download_still_records_manifest() {
    let mock_server = MockServer::start().await;
    mount_page(&mock_server, "/", MONSTERS_PAGE).await;
    mount_page(&mock_server, "/p/1", GOBLIN_DETAIL).await;
    mount_page(&mock_server, "/p/2", ORC_DETAIL).await;
    Mock::given(method("GET"))
        .and(path("/d/goblin.jpg"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/d/goblin_back.jpg"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"jpeg".to_vec()))
        .mount(&mock_server)
        .await;
    // /d/orc.jpg is not mounted: wiremock answers 404

    let dir = TempDir::new().unwrap();
    let config = create_test_config(&mock_server.uri(), dir.path(), 2);

    let outcome = run_crawl(&config, "test-hash").await.expect("Crawl failed");
    assert_eq!(outcome.failed, 0);

    let storage = open_storage(&config);
    let manifests: Vec<ProductImageRecord> =
        read_records(&storage, outcome.run_id, Dataset::ProductImages).unwrap();
    assert_eq!(manifests.len(), 2);

    let goblin = manifests
        .iter()
        .find(|m| m.product_name == "Goblin")
        .unwrap();
    // The start page carries no collection context
    assert_eq!(goblin.collection_name, "Uncategorized");
    assert_eq!(goblin.images.len(), 1);
    assert_eq!(goblin.images[0].filename, "goblin_back.jpg");

    let goblin_dir = dir.path().join("images/goblin");
    assert_eq!(goblin.output_dir, goblin_dir.display().to_string());
    assert!(!goblin_dir.join("goblin.jpg").exists());
    assert!(goblin_dir.join("goblin_back.jpg").exists());

    // Every orc image failed, yet its record is kept
    let orc = manifests
        .iter()
        .find(|m| m.product_name == "Orc King (Painted)!")
        .unwrap();
    assert!(orc.images.is_empty());
}

#[tokio::test]
async fn test_request_ceiling_skips_remaining_requests() {
    let mock_server = MockServer::start().await;
    mount_shop(&mock_server).await;
    let dir = TempDir::new().unwrap();
    let mut config = create_test_config(&mock_server.uri(), dir.path(), 1);
    config.crawler.max_requests_per_crawl = 2;

    let outcome = run_crawl(&config, "test-hash").await.expect("Crawl failed");

    // "/" and "/shop/monsters" run; heroes and two detail pages are left
    assert_eq!(outcome.handled, 2);
    assert_eq!(outcome.skipped, 3);
    assert_eq!(requests_to(&mock_server, "/shop/heroes").await, 0);

    let storage = open_storage(&config);
    let counts = storage.count_requests_by_state(outcome.run_id).unwrap();
    assert_eq!(counts.get(&RequestState::Handled), Some(&2));
    assert_eq!(counts.get(&RequestState::Skipped), Some(&3));
}

#[tokio::test]
async fn test_server_errors_are_retried_then_failed() {
    let mock_server = MockServer::start().await;
    mount_page(&mock_server, "/", INDEX_PAGE).await;
    mount_page(&mock_server, "/shop/heroes", HEROES_PAGE).await;
    Mock::given(method("GET"))
        .and(path("/shop/monsters"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&mock_server)
        .await;

    let dir = TempDir::new().unwrap();
    let mut config = create_test_config(&mock_server.uri(), dir.path(), 2);
    // Keep the run to the index and the two collections
    config.crawler.max_requests_per_crawl = 3;

    let outcome = run_crawl(&config, "test-hash").await.expect("Crawl failed");

    assert_eq!(outcome.failed, 1);
    // First attempt plus one retry
    assert_eq!(requests_to(&mock_server, "/shop/monsters").await, 2);

    let storage = open_storage(&config);
    let failed = storage
        .get_requests_by_state(outcome.run_id, RequestState::Failed)
        .unwrap();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].error_message.as_deref(), Some("HTTP 503"));
    assert_eq!(failed[0].retry_count, 1);
}

#[tokio::test]
async fn test_backend_relay() {
    let mock_server = MockServer::start().await;
    mount_shop(&mock_server).await;
    let dir = TempDir::new().unwrap();
    let config = create_test_config(&mock_server.uri(), dir.path(), 2);
    let outcome = run_crawl(&config, "test-hash").await.expect("Crawl failed");

    let backend_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/collections"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&backend_server)
        .await;
    Mock::given(method("POST"))
        .and(path("/products"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&backend_server)
        .await;

    let storage = open_storage(&config);
    let backend = BackendClient::new(reqwest::Client::new(), backend_server.uri());
    let result = relay_run(&backend, &storage, outcome.run_id).await;

    match result {
        Err(HarvestError::Backend { endpoint, status }) => {
            assert!(endpoint.ends_with("/products"));
            assert_eq!(status, 500);
        }
        other => panic!("expected backend error, got {:?}", other),
    }

    let received = backend_server.received_requests().await.unwrap();
    let collections = received
        .iter()
        .find(|r| r.url.path() == "/collections")
        .unwrap();
    let body: serde_json::Value = serde_json::from_slice(&collections.body).unwrap();
    assert_eq!(body.as_array().unwrap().len(), 2);

    // Local export is unaffected by the backend failure
    let store = FileKeyValueStore::new(&config.output.artifacts_dir);
    assert!(run_export(&storage, &store, outcome.run_id).is_success());
}

#[test]
fn test_cli_reports_fatal_error_once() {
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("missing.toml");

    let output = std::process::Command::new(env!("CARGO_BIN_EXE_irbis-harvest"))
        .arg(&missing)
        .env("NO_COLOR", "1")
        .output()
        .unwrap();

    assert!(!output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    let combined = format!("{}{}", stdout, stderr);
    assert_eq!(
        combined.matches("Failed to load configuration from").count(),
        1
    );
    assert!(!stderr.contains("Error:"));
}
