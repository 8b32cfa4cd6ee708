//! Image proxy server.
//!
//! Serves `GET /api/product-image?itemNumber=...` on top of an image
//! source, so the dashboard never holds the upstream credentials.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::api::{ImageClient, ImageLookupError};
use crate::config::ProxyConfig;
use crate::models::{ImageMatch, ProxyErrorBody};

/// Anything that can resolve an item number to an image
pub trait ImageSource: Send + Sync + 'static {
    fn find_image(
        &self,
        item_number: &str,
    ) -> impl Future<Output = Result<Option<ImageMatch>, ImageLookupError>> + Send;
}

impl ImageSource for ImageClient {
    fn find_image(
        &self,
        item_number: &str,
    ) -> impl Future<Output = Result<Option<ImageMatch>, ImageLookupError>> + Send {
        self.lookup_image(item_number)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ImageQuery {
    item_number: Option<String>,
}

/// Error side of the endpoint
#[derive(Debug)]
enum ProxyError {
    MissingItemNumber,
    NotFound(String),
    Lookup(ImageLookupError),
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ProxyError::MissingItemNumber => (
                StatusCode::BAD_REQUEST,
                ProxyErrorBody {
                    error: "itemNumber is required".into(),
                    message: None,
                },
            ),
            ProxyError::NotFound(item) => (
                StatusCode::NOT_FOUND,
                ProxyErrorBody {
                    error: format!("No images found for item {}", item).into(),
                    message: None,
                },
            ),
            ProxyError::Lookup(err) => {
                let status = err.status();
                // Relay the upstream body when there is one
                let error = match &err {
                    ImageLookupError::Upstream { message, .. } if !message.is_empty() => {
                        serde_json::from_str(message).unwrap_or_else(|_| message.clone().into())
                    }
                    _ => "Internal server error".into(),
                };
                (
                    status,
                    ProxyErrorBody {
                        error,
                        message: Some(err.to_string()),
                    },
                )
            }
        };
        (status, Json(body)).into_response()
    }
}

async fn product_image<S: ImageSource>(
    State(source): State<Arc<S>>,
    Query(query): Query<ImageQuery>,
) -> Result<Json<ImageMatch>, ProxyError> {
    let item_number = query
        .item_number
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .ok_or(ProxyError::MissingItemNumber)?;

    info!(%item_number, "image request");
    match source.find_image(&item_number).await {
        Ok(Some(found)) => Ok(Json(found)),
        Ok(None) => Err(ProxyError::NotFound(item_number)),
        Err(e) => {
            error!(%item_number, error = %e, "image lookup failed");
            Err(ProxyError::Lookup(e))
        }
    }
}

pub fn router<S: ImageSource>(source: S) -> Router {
    Router::new()
        .route("/api/product-image", get(product_image::<S>))
        .route("/health", get(|| async { "OK" }))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(Arc::new(source))
}

/// Run the proxy until the process is stopped
pub async fn run(config: &ProxyConfig) -> Result<()> {
    if config.api_key.is_none() {
        tracing::warn!("no upstream API key configured, requests will likely be rejected");
    }
    let client = ImageClient::new(config.upstream_url.clone(), config.api_key.clone())
        .context("Failed to create upstream client")?;

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Proxy server listening at http://localhost:{}", config.port);

    axum::serve(listener, router(client))
        .await
        .context("Proxy server stopped")?;
    Ok(())
}
