//! # Storefront API Client
//!
//! Client for the remote catalog and order API, plus the [`CatalogApi`] trait
//! reducers depend on so tests can swap in an in-memory implementation.
//!
//! ## Example
//!
//! ```no_run
//! use storefront_api::{ApiConfig, CatalogApi, LarekClient};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = LarekClient::new(&ApiConfig::from_env()?)?;
//!
//!     for product in client.list_products().await? {
//!         println!("{} - {:?}", product.title, product.price);
//!     }
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod types;

pub use client::{ApiFuture, CatalogApi, LarekClient};
pub use config::ApiConfig;
pub use error::{ApiError, ConfigError};
pub use types::{
    OrderRequest, OrderResult, PaymentMethod, ProductList, RemoteProduct, UnknownPaymentMethod,
};
