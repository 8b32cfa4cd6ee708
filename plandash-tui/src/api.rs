//! HTTP clients for product image lookups.
//!
//! `ImageClient` talks to the upstream product-information API and is what
//! the proxy server runs on. `ProxyClient` is what the dashboard uses; it
//! talks to the proxy. Both keep "no image" (`Ok(None)`) apart from a failed
//! lookup (`Err`). Nothing is retried.

use std::time::Duration;

use reqwest::{Client, StatusCode};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::models::{ImageMatch, ProxyErrorBody, UpstreamProduct, UpstreamSearchPage};

#[derive(Debug, Error)]
pub enum ImageLookupError {
    /// The remote side answered with a failure status
    #[error("upstream error {status}: {message}")]
    Upstream { status: StatusCode, message: String },
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

impl ImageLookupError {
    /// Status to report to a caller of the proxy
    pub fn status(&self) -> StatusCode {
        match self {
            ImageLookupError::Upstream { status, .. } => *status,
            ImageLookupError::Transport(e) => e.status().unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
        }
    }
}

fn build_client() -> Result<Client, ImageLookupError> {
    Ok(Client::builder().timeout(Duration::from_secs(30)).build()?)
}

async fn upstream_error(response: reqwest::Response) -> ImageLookupError {
    let status = response.status();
    let message = response.text().await.unwrap_or_default();
    ImageLookupError::Upstream { status, message }
}

/// Client for the upstream product-information API
#[derive(Debug, Clone)]
pub struct ImageClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl ImageClient {
    pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> Result<Self, ImageLookupError> {
        Ok(Self {
            client: build_client()?,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
        })
    }

    fn get(&self, url: &str) -> reqwest::RequestBuilder {
        let request = self.client.get(url);
        match &self.api_key {
            Some(key) => request.bearer_auth(key),
            None => request,
        }
    }

    /// Fetch a product by its upstream id. 404 and an empty body mean absent.
    async fn fetch_product(&self, item_number: &str) -> Result<Option<UpstreamProduct>, ImageLookupError> {
        let url = format!("{}/{}", self.base_url, item_number);
        let response = self.get(&url).send().await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(upstream_error(response).await);
        }

        let body = response.bytes().await?;
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(None);
        }
        Ok(serde_json::from_slice::<Option<UpstreamProduct>>(&body).unwrap_or_else(|e| {
            warn!(item_number, error = %e, "unreadable product document");
            None
        }))
    }

    /// Broader search on the "Item Number" property
    async fn search_product(&self, item_number: &str) -> Result<Option<UpstreamProduct>, ImageLookupError> {
        let filter = format!("\"Item Number\" eq \"{}\"", item_number);
        let response = self
            .get(&self.base_url)
            .query(&[("filter", filter.as_str()), ("per_page", "1")])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(upstream_error(response).await);
        }

        let page: UpstreamSearchPage = response.json().await?;
        Ok(page.data.into_iter().next())
    }

    /// Image of a product, `None` when the product or a usable image is missing
    pub async fn lookup_image(&self, item_number: &str) -> Result<Option<ImageMatch>, ImageLookupError> {
        info!(item_number, "looking up product image");

        let product = match self.fetch_product(item_number).await? {
            Some(product) => Some(product),
            None => self.search_product(item_number).await?,
        };

        let Some(product) = product else {
            info!(item_number, "no product found");
            return Ok(None);
        };

        match product.first_image().and_then(|asset| asset.url.clone()) {
            Some(image_url) => {
                debug!(item_number, %image_url, "image found");
                Ok(Some(ImageMatch {
                    image_url,
                    product_id: product.id.clone(),
                }))
            }
            None => {
                info!(item_number, "no suitable image");
                Ok(None)
            }
        }
    }
}

/// Client for the local image proxy
#[derive(Debug, Clone)]
pub struct ProxyClient {
    client: Client,
    base_url: String,
}

impl ProxyClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self, ImageLookupError> {
        Ok(Self {
            client: build_client()?,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Whether the proxy answers on `/health`
    pub async fn health_check(&self) -> Result<bool, ImageLookupError> {
        let url = format!("{}/health", self.base_url);
        let response = self.client.get(&url).send().await?;
        Ok(response.status().is_success())
    }

    pub async fn product_image(&self, item_number: &str) -> Result<Option<String>, ImageLookupError> {
        let url = format!("{}/api/product-image", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[("itemNumber", item_number)])
            .send()
            .await?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => {
                let found: ImageMatch = response.json().await?;
                Ok(Some(found.image_url))
            }
            status => {
                let text = response.text().await.unwrap_or_default();
                let message = serde_json::from_str::<ProxyErrorBody>(&text)
                    .ok()
                    .and_then(|body| body.message)
                    .unwrap_or(text);
                Err(ImageLookupError::Upstream { status, message })
            }
        }
    }
}

/// Messages sent from the API worker to the main TUI loop
#[derive(Debug, Clone)]
pub enum ApiMessage {
    ImageFound { product_id: String, url: String },
    ImageNotFound { product_id: String },
    /// An error occurred during API communication
    Error(String),
    /// Proxy reachability changed
    ConnectionStatus(bool),
}

/// Commands sent from the TUI to the API worker
#[derive(Debug, Clone)]
pub enum ApiCommand {
    LookupImage { product_id: String, item_number: String },
    CheckConnection,
    /// Shutdown the API worker
    Shutdown,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upstream_error_keeps_status() {
        let err = ImageLookupError::Upstream {
            status: StatusCode::UNAUTHORIZED,
            message: "bad token".to_string(),
        };
        assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(err.to_string(), "upstream error 401 Unauthorized: bad token");
    }

    #[test]
    fn test_clients_trim_trailing_slash() {
        let client = ImageClient::new("https://example.test/products/", None).unwrap();
        assert_eq!(client.base_url, "https://example.test/products");
        let proxy = ProxyClient::new("http://localhost:3001/").unwrap();
        assert_eq!(proxy.base_url, "http://localhost:3001");
    }

    #[tokio::test]
    async fn test_unreachable_proxy_is_an_error_not_a_miss() {
        // Port 9 (discard) on loopback is closed in test environments
        let proxy = ProxyClient::new("http://127.0.0.1:9").unwrap();
        let result = proxy.product_image("77595GQ6").await;
        assert!(matches!(result, Err(ImageLookupError::Transport(_))));
    }
}
