//! Domain types for the storefront.
//!
//! The session state holds the catalog, the basket, the order being checked out
//! and the errors of the last form validation. Views never read it directly:
//! they render the [`StorefrontEvent`] payloads emitted after each transition.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use storefront_api::{ApiError, OrderRequest, PaymentMethod, RemoteProduct};
use storefront_core::event_bus::BusEvent;

/// Unique identifier for a product
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductId(String);

impl ProductId {
    /// Creates a `ProductId` from any string
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the id as a string slice
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProductId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ProductId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// A catalog product
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    /// Unique identifier
    pub id: ProductId,
    /// Display title
    pub title: String,
    /// Long description
    pub description: String,
    /// Price; `None` means the product is priceless and cannot be bought
    pub price: Option<u64>,
    /// Category label
    pub category: String,
    /// Absolute image URL
    pub image: String,
}

impl Product {
    /// Whether the product can be put in the basket
    #[must_use]
    pub const fn is_purchasable(&self) -> bool {
        self.price.is_some()
    }
}

impl From<RemoteProduct> for Product {
    fn from(remote: RemoteProduct) -> Self {
        Self {
            id: ProductId(remote.id),
            title: remote.title,
            description: remote.description,
            price: remote.price,
            category: remote.category,
            image: remote.image,
        }
    }
}

/// Fields of the delivery step
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DeliveryField {
    /// Payment method (`online`/`card` or `cash`)
    Payment,
    /// Delivery address
    Address,
}

/// Fields of the contact step
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ContactField {
    /// Contact email
    Email,
    /// Contact phone
    Phone,
}

/// Fields that can carry a validation error
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FormField {
    /// Delivery address
    Address,
    /// Contact email
    Email,
    /// Contact phone
    Phone,
}

impl FormField {
    /// Wire name of the field
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Address => "address",
            Self::Email => "email",
            Self::Phone => "phone",
        }
    }
}

impl fmt::Display for FormField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Validation messages keyed by field; a missing key means the field is valid
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FormErrors(BTreeMap<FormField, String>);

impl FormErrors {
    /// No errors
    #[must_use]
    pub const fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Record an error for `field`, replacing any previous one
    pub fn insert(&mut self, field: FormField, message: impl Into<String>) {
        self.0.insert(field, message.into());
    }

    /// The error for `field`, if any
    #[must_use]
    pub fn get(&self, field: FormField) -> Option<&str> {
        self.0.get(&field).map(String::as_str)
    }

    /// Whether every field is valid
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of invalid fields
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Errors in field order
    pub fn iter(&self) -> impl Iterator<Item = (FormField, &str)> {
        self.0.iter().map(|(field, message)| (*field, message.as_str()))
    }
}

/// The order being checked out
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderDraft {
    /// Payment method
    pub payment: PaymentMethod,
    /// Delivery address
    pub address: String,
    /// Contact email
    pub email: String,
    /// Contact phone
    pub phone: String,
    /// Sum of basket prices
    pub total: u64,
    /// Basket product ids, in basket order
    pub items: Vec<ProductId>,
}

impl OrderDraft {
    /// Body of the order submission
    #[must_use]
    pub fn to_request(&self) -> OrderRequest {
        OrderRequest {
            payment: self.payment,
            address: self.address.clone(),
            email: self.email.clone(),
            phone: self.phone.clone(),
            total: self.total,
            items: self.items.iter().map(|id| id.as_str().to_string()).collect(),
        }
    }
}

/// Confirmation of a placed order
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderReceipt {
    /// Server-side order id
    pub id: String,
    /// Amount charged
    pub total: u64,
    /// When the confirmation arrived
    pub placed_at: DateTime<Utc>,
}

/// Session state of the storefront
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StorefrontState {
    /// Products on sale, in server order
    pub catalog: Vec<Product>,
    /// Products in the basket, in insertion order, without duplicates
    pub basket: Vec<Product>,
    /// Order being checked out
    pub order: OrderDraft,
    /// Result of the last form validation
    pub form_errors: FormErrors,
    /// Product shown in the detail view
    pub preview: Option<ProductId>,
    /// Bumped by every catalog load; older fetch results are discarded
    pub catalog_generation: u64,
    /// An order submission is in flight
    pub submitting: bool,
    /// Most recent successful order
    pub last_receipt: Option<OrderReceipt>,
    /// Rejection or failure caused by the last action
    pub last_error: Option<String>,
}

impl StorefrontState {
    /// Creates an empty session
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Looks up a catalog product
    #[must_use]
    pub fn product(&self, id: &ProductId) -> Option<&Product> {
        self.catalog.iter().find(|p| &p.id == id)
    }

    /// Whether the product is in the basket
    #[must_use]
    pub fn in_basket(&self, id: &ProductId) -> bool {
        self.basket.iter().any(|p| &p.id == id)
    }

    /// Sum of basket prices; priceless products count as zero
    #[must_use]
    pub fn basket_total(&self) -> u64 {
        self.basket.iter().map(|p| p.price.unwrap_or(0)).sum()
    }

    /// Whether checkout can start
    #[must_use]
    pub fn checkout_enabled(&self) -> bool {
        !self.basket.is_empty() && self.basket_total() > 0
    }
}

/// Everything that can happen to the storefront
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StorefrontAction {
    // ========== Catalog ==========
    /// Fetch the catalog from the API
    RequestCatalog,

    /// Replace the catalog
    LoadCatalog {
        /// New catalog, in display order
        products: Vec<Product>,
    },

    /// Catalog fetch succeeded
    CatalogFetched {
        /// Generation of the request that produced this result
        generation: u64,
        /// Fetched catalog
        products: Vec<Product>,
    },

    /// Catalog fetch failed
    CatalogFetchFailed {
        /// Generation of the request that failed
        generation: u64,
        /// What went wrong
        error: ApiError,
    },

    /// Show a product in the detail view
    SelectPreview {
        /// Product to show
        id: ProductId,
    },

    // ========== Basket ==========
    /// Put a product in the basket
    AddToBasket {
        /// Product to add
        id: ProductId,
    },

    /// Take a product out of the basket
    RemoveFromBasket {
        /// Product to remove
        id: ProductId,
    },

    /// Add the product if absent, otherwise remove it
    ToggleBasket {
        /// Product to toggle
        id: ProductId,
    },

    /// Empty the basket
    ClearBasket,

    // ========== Checkout ==========
    /// Start checkout from the current basket
    BeginCheckout,

    /// Set a field of the delivery step
    SetDeliveryField {
        /// Field to set
        field: DeliveryField,
        /// Raw input
        value: String,
    },

    /// Set a field of the contact step
    SetContactField {
        /// Field to set
        field: ContactField,
        /// Raw input
        value: String,
    },

    /// Submit the order to the API
    SubmitOrder,

    /// The API accepted the order
    OrderPlaced {
        /// Confirmation
        receipt: OrderReceipt,
    },

    /// The API refused the order or could not be reached
    OrderFailed {
        /// What went wrong
        error: ApiError,
    },

    /// Reset the order draft
    ClearOrder,
}

/// Notifications emitted after state transitions
///
/// Serialized as `{"event": "<kind>", "payload": {...}}`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "payload", rename_all = "kebab-case")]
pub enum StorefrontEvent {
    /// The catalog was replaced
    CatalogChanged {
        /// New catalog
        catalog: Vec<Product>,
    },

    /// The detail view should show a product
    PreviewChanged {
        /// Product to show
        product: Product,
        /// Whether it is already in the basket
        in_basket: bool,
    },

    /// The number of basket items changed
    BasketCountChanged {
        /// Items in the basket
        count: usize,
    },

    /// The basket changed
    BasketChanged {
        /// Basket contents
        items: Vec<Product>,
        /// Sum of prices
        total: u64,
        /// Whether checkout can start
        checkout_enabled: bool,
    },

    /// A form was validated
    FormErrorsChanged {
        /// All current errors
        errors: FormErrors,
    },

    /// The delivery step is valid
    DeliveryReady {
        /// Current draft
        order: OrderDraft,
    },

    /// The contact step is valid
    ContactReady {
        /// Current draft
        order: OrderDraft,
    },

    /// An order was placed
    OrderPlaced {
        /// Confirmation
        receipt: OrderReceipt,
    },
}

/// Discriminant of [`StorefrontEvent`], used as a bus topic
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// `catalog-changed`
    CatalogChanged,
    /// `preview-changed`
    PreviewChanged,
    /// `basket-count-changed`
    BasketCountChanged,
    /// `basket-changed`
    BasketChanged,
    /// `form-errors-changed`
    FormErrorsChanged,
    /// `delivery-ready`
    DeliveryReady,
    /// `contact-ready`
    ContactReady,
    /// `order-placed`
    OrderPlaced,
}

impl EventKind {
    /// Every kind, in declaration order
    pub const ALL: [Self; 8] = [
        Self::CatalogChanged,
        Self::PreviewChanged,
        Self::BasketCountChanged,
        Self::BasketChanged,
        Self::FormErrorsChanged,
        Self::DeliveryReady,
        Self::ContactReady,
        Self::OrderPlaced,
    ];

    /// Public name of the notification
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::CatalogChanged => "catalog-changed",
            Self::PreviewChanged => "preview-changed",
            Self::BasketCountChanged => "basket-count-changed",
            Self::BasketChanged => "basket-changed",
            Self::FormErrorsChanged => "form-errors-changed",
            Self::DeliveryReady => "delivery-ready",
            Self::ContactReady => "contact-ready",
            Self::OrderPlaced => "order-placed",
        }
    }

    /// Looks a kind up by its public name
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl BusEvent for StorefrontEvent {
    type Kind = EventKind;

    fn kind(&self) -> EventKind {
        match self {
            Self::CatalogChanged { .. } => EventKind::CatalogChanged,
            Self::PreviewChanged { .. } => EventKind::PreviewChanged,
            Self::BasketCountChanged { .. } => EventKind::BasketCountChanged,
            Self::BasketChanged { .. } => EventKind::BasketChanged,
            Self::FormErrorsChanged { .. } => EventKind::FormErrorsChanged,
            Self::DeliveryReady { .. } => EventKind::DeliveryReady,
            Self::ContactReady { .. } => EventKind::ContactReady,
            Self::OrderPlaced { .. } => EventKind::OrderPlaced,
        }
    }
}
