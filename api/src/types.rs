//! Wire types for the catalog and order API

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A product as returned by the API
///
/// After passing through [`LarekClient`](crate::LarekClient) the `image` field
/// holds an absolute CDN URL rather than the server-relative path.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct RemoteProduct {
    /// Unique product identifier
    pub id: String,
    /// Display title
    pub title: String,
    /// Long description
    pub description: String,
    /// Price; `None` marks a priceless product that cannot be bought
    pub price: Option<u64>,
    /// Category label
    pub category: String,
    /// Image path (relative on the wire, absolute once prefixed)
    pub image: String,
}

/// Paged list envelope used by `GET /product`
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProductList {
    /// Number of products on the server
    pub total: u64,
    /// The products
    pub items: Vec<RemoteProduct>,
}

/// How the customer pays for an order
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    /// Card payment online (pre-selected)
    #[default]
    Online,
    /// Cash on delivery
    Cash,
}

impl PaymentMethod {
    /// Wire name of the method
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Online => "online",
            Self::Cash => "cash",
        }
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a payment method name is not recognized
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("Unknown payment method: {0}")]
pub struct UnknownPaymentMethod(pub String);

impl FromStr for PaymentMethod {
    type Err = UnknownPaymentMethod;

    /// Accepts the wire names and the form button names (`card` is online).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "online" | "card" => Ok(Self::Online),
            "cash" => Ok(Self::Cash),
            _ => Err(UnknownPaymentMethod(s.to_string())),
        }
    }
}

/// Body of `POST /order`
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct OrderRequest {
    /// Payment method
    pub payment: PaymentMethod,
    /// Delivery address
    pub address: String,
    /// Contact email
    pub email: String,
    /// Contact phone
    pub phone: String,
    /// Order total as computed by the client
    pub total: u64,
    /// Ordered product ids
    pub items: Vec<String>,
}

/// Response of `POST /order`
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct OrderResult {
    /// Server-side order id
    pub id: String,
    /// Amount charged, as confirmed by the server
    pub total: Option<u64>,
}

/// Error envelope returned by the API on failure
#[derive(Clone, Debug, Deserialize)]
pub(crate) struct ErrorBody {
    pub(crate) error: String,
}
