//! Catalog API client implementation

use crate::{
    config::ApiConfig,
    error::ApiError,
    types::{ErrorBody, OrderRequest, OrderResult, ProductList, RemoteProduct},
};
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::future::Future;
use std::pin::Pin;

/// Boxed future returned by [`CatalogApi`] methods
pub type ApiFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, ApiError>> + Send + 'a>>;

/// Remote catalog and order operations the storefront depends on.
///
/// Implementations must return product images as absolute URLs.
///
/// # Dyn Compatibility
///
/// Methods return boxed futures instead of using `async fn` so the trait can be
/// used as `Arc<dyn CatalogApi>` inside reducer environments.
pub trait CatalogApi: Send + Sync {
    /// Fetch the whole catalog
    fn list_products(&self) -> ApiFuture<'_, Vec<RemoteProduct>>;

    /// Fetch a single product
    ///
    /// Fails with [`ApiError::NotFound`] if the id is unknown to the server.
    fn get_product<'a>(&'a self, id: &'a str) -> ApiFuture<'a, RemoteProduct>;

    /// Submit an order
    ///
    /// Fails with [`ApiError::Rejected`] if the server refuses the order.
    fn submit_order<'a>(&'a self, order: &'a OrderRequest) -> ApiFuture<'a, OrderResult>;
}

/// HTTP client for the storefront API
#[derive(Clone, Debug)]
pub struct LarekClient {
    client: Client,
    api_url: String,
    cdn_url: String,
}

impl LarekClient {
    /// Create a client for the given configuration
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::RequestFailed`] if the HTTP client cannot be built.
    pub fn new(config: &ApiConfig) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ApiError::RequestFailed(e.to_string()))?;

        Ok(Self {
            client,
            api_url: config.api_url.clone(),
            cdn_url: config.cdn_url.clone(),
        })
    }

    /// Base URL of the JSON API
    #[must_use]
    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    /// Base URL prepended to image paths
    #[must_use]
    pub fn cdn_url(&self) -> &str {
        &self.cdn_url
    }

    fn with_cdn(&self, mut product: RemoteProduct) -> RemoteProduct {
        product.image = format!("{}{}", self.cdn_url, product.image);
        product
    }

    /// Fetch the whole catalog with absolute image URLs
    ///
    /// # Errors
    ///
    /// Returns errors for network failures, error statuses, or parsing failures
    pub async fn fetch_products(&self) -> Result<Vec<RemoteProduct>, ApiError> {
        let url = format!("{}/product", self.api_url);
        tracing::debug!(%url, "Fetching product list");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| ApiError::RequestFailed(e.to_string()))?;

        let list: ProductList = decode(response, "product list").await?;
        tracing::debug!(count = list.items.len(), total = list.total, "Product list received");

        Ok(list.items.into_iter().map(|p| self.with_cdn(p)).collect())
    }

    /// Fetch one product with an absolute image URL
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::NotFound`] for unknown ids, and errors for network
    /// failures, other error statuses, or parsing failures
    pub async fn fetch_product(&self, id: &str) -> Result<RemoteProduct, ApiError> {
        let url = format!("{}/product/{id}", self.api_url);
        tracing::debug!(%url, "Fetching product");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| ApiError::RequestFailed(e.to_string()))?;

        let product = decode(response, &format!("product {id}")).await?;
        Ok(self.with_cdn(product))
    }

    /// Post an order
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Rejected`] when the server refuses the order, and
    /// errors for network failures, other error statuses, or parsing failures
    pub async fn post_order(&self, order: &OrderRequest) -> Result<OrderResult, ApiError> {
        let url = format!("{}/order", self.api_url);
        tracing::debug!(%url, items = order.items.len(), total = order.total, "Posting order");

        let response = self
            .client
            .post(&url)
            .json(order)
            .send()
            .await
            .map_err(|e| ApiError::RequestFailed(e.to_string()))?;

        decode(response, "order").await
    }
}

impl CatalogApi for LarekClient {
    fn list_products(&self) -> ApiFuture<'_, Vec<RemoteProduct>> {
        Box::pin(self.fetch_products())
    }

    fn get_product<'a>(&'a self, id: &'a str) -> ApiFuture<'a, RemoteProduct> {
        Box::pin(self.fetch_product(id))
    }

    fn submit_order<'a>(&'a self, order: &'a OrderRequest) -> ApiFuture<'a, OrderResult> {
        Box::pin(self.post_order(order))
    }
}

/// Decode a successful response, or map the error status
async fn decode<T: DeserializeOwned>(response: Response, resource: &str) -> Result<T, ApiError> {
    match response.status() {
        status if status.is_success() => response
            .json::<T>()
            .await
            .map_err(|e| ApiError::ResponseParseFailed(e.to_string())),
        StatusCode::NOT_FOUND => Err(ApiError::NotFound(resource.to_string())),
        status => {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorBody>(&body)
                .map(|b| b.error)
                .unwrap_or_else(|_| {
                    status
                        .canonical_reason()
                        .map_or_else(|| body.clone(), str::to_string)
                });

            if status == StatusCode::BAD_REQUEST {
                Err(ApiError::Rejected(message))
            } else {
                Err(ApiError::Status {
                    status: status.as_u16(),
                    message,
                })
            }
        }
    }
}
