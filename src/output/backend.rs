//! Optional relay of exported data to a backend API
//!
//! Runs only after the local artifacts are written. Failures here are logged
//! by the caller and never touch the local artifacts.

use crate::config::BackendConfig;
use crate::extract::CollectionLink;
use crate::output::export::ProductsByCollection;
use crate::{ConfigError, HarvestError, Result};
use reqwest::{Client, StatusCode};
use serde::Serialize;

/// Environment variable consulted when `backend.base-url` is not set
pub const BACKEND_URL_ENV: &str = "BACKEND_API_URL";

/// Picks the backend base URL: config first, then the environment value
pub fn resolve_base_url(
    config: &BackendConfig,
    env_value: Option<String>,
) -> std::result::Result<String, ConfigError> {
    config
        .base_url
        .clone()
        .or(env_value)
        .map(|url| url.trim().trim_end_matches('/').to_string())
        .filter(|url| !url.is_empty())
        .ok_or(ConfigError::MissingBackendUrl(BACKEND_URL_ENV))
}

/// Client for the backend's collection and product endpoints
#[derive(Debug, Clone)]
pub struct BackendClient {
    client: Client,
    base_url: String,
}

impl BackendClient {
    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { client, base_url }
    }

    /// Builds a client from configuration, reading `BACKEND_API_URL` when
    /// the config has no base URL
    pub fn from_config(client: Client, config: &BackendConfig) -> Result<Self> {
        let base_url = resolve_base_url(config, std::env::var(BACKEND_URL_ENV).ok())?;
        Ok(Self::new(client, base_url))
    }

    pub fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    /// POSTs `body` as JSON; anything but 200 is a failure
    pub async fn post_json<T: Serialize + ?Sized>(&self, path: &str, body: &T) -> Result<()> {
        let endpoint = self.endpoint(path);
        let response = self
            .client
            .post(&endpoint)
            .json(body)
            .send()
            .await
            .map_err(|source| HarvestError::Http {
                url: endpoint.clone(),
                source,
            })?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(HarvestError::Backend {
                endpoint,
                status: status.as_u16(),
            });
        }

        tracing::info!("Sent data to {}", endpoint);
        Ok(())
    }

    pub async fn send_collections(&self, collections: &[CollectionLink]) -> Result<()> {
        self.post_json("collections", collections).await
    }

    pub async fn send_products(&self, products: &ProductsByCollection) -> Result<()> {
        self.post_json("products", products).await
    }
}

/// Sends collections, then grouped products
///
/// Both calls are attempted; each failure is logged and the first one is
/// returned.
pub async fn send_export(
    backend: &BackendClient,
    products: &ProductsByCollection,
    collections: &[CollectionLink],
) -> Result<()> {
    let collections_result = backend.send_collections(collections).await;
    if let Err(e) = &collections_result {
        tracing::error!("Failed to send collections: {}", e);
    }

    let products_result = backend.send_products(products).await;
    if let Err(e) = &products_result {
        tracing::error!("Failed to send products: {}", e);
    }

    collections_result.and(products_result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::Product;
    use crate::output::export::group_by_collection;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn grouped() -> ProductsByCollection {
        group_by_collection(vec![Product {
            name: "Goblin".to_string(),
            description: "A small goblin".to_string(),
            price: "$5".to_string(),
            collection: "Monsters".to_string(),
            url: "http://irbis-miniatures.com/p/1".to_string(),
        }])
    }

    fn collections() -> Vec<CollectionLink> {
        vec![CollectionLink {
            text: "Monsters".to_string(),
            href: "http://irbis-miniatures.com/shop/monsters".to_string(),
        }]
    }

    #[test]
    fn test_resolve_base_url_prefers_config() {
        let config = BackendConfig {
            enabled: true,
            base_url: Some("http://api.local/".to_string()),
        };
        let url = resolve_base_url(&config, Some("http://env.local".to_string())).unwrap();
        assert_eq!(url, "http://api.local");
    }

    #[test]
    fn test_resolve_base_url_falls_back_to_env() {
        let config = BackendConfig::default();
        let url = resolve_base_url(&config, Some("http://env.local".to_string())).unwrap();
        assert_eq!(url, "http://env.local");
    }

    #[test]
    fn test_resolve_base_url_missing() {
        let config = BackendConfig::default();
        let result = resolve_base_url(&config, None);
        assert!(matches!(result, Err(ConfigError::MissingBackendUrl(BACKEND_URL_ENV))));
    }

    #[tokio::test]
    async fn test_send_export_posts_both_bodies() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/collections"))
            .and(body_json(serde_json::json!([
                {"text": "Monsters", "href": "http://irbis-miniatures.com/shop/monsters"}
            ])))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/products"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let backend = BackendClient::new(Client::new(), format!("{}/api/", server.uri()));
        send_export(&backend, &grouped(), &collections()).await.unwrap();

        let requests = server.received_requests().await.unwrap();
        let products_body: serde_json::Value = requests
            .iter()
            .find(|r| r.url.path() == "/api/products")
            .map(|r| serde_json::from_slice(&r.body).unwrap())
            .unwrap();
        assert_eq!(products_body["Monsters"][0]["name"], "Goblin");
    }

    #[tokio::test]
    async fn test_non_200_is_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/collections"))
            .respond_with(ResponseTemplate::new(201))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/products"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let backend = BackendClient::new(Client::new(), server.uri());
        let result = send_export(&backend, &grouped(), &collections()).await;

        match result {
            Err(HarvestError::Backend { endpoint, status }) => {
                assert!(endpoint.ends_with("/collections"));
                assert_eq!(status, 201);
            }
            other => panic!("expected backend error, got {:?}", other),
        }
    }
}
