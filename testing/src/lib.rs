//! # Storefront Testing
//!
//! Testing utilities and helpers for the storefront.
//!
//! This crate provides:
//! - Mock implementations of Environment traits (clock, catalog API)
//! - A recorder that captures everything emitted on an event bus
//! - Sample catalog data and proptest strategies
//! - The Given-When-Then [`ReducerTest`] harness
//!
//! ## Example
//!
//! ```ignore
//! use storefront_testing::{EventRecorder, MockCatalogApi, fixtures, test_clock};
//!
//! #[tokio::test]
//! async fn test_checkout() {
//!     let api = Arc::new(MockCatalogApi::new(fixtures::sample_products()));
//!     let store = Store::new(StorefrontState::default(), StorefrontReducer, env(api, test_clock()));
//!     let recorder = EventRecorder::attach(store.events());
//!
//!     store.send(StorefrontAction::RequestCatalog).await?.wait().await;
//!     assert_eq!(recorder.len(), 1);
//! }
//! ```

use chrono::{DateTime, Utc};
use storefront_core::environment::Clock;

mod reducer_test;

pub use reducer_test::{ReducerTest, assertions};

/// Mock implementations for testing.
pub mod mocks {
    use super::{Clock, DateTime, Utc};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex, PoisonError};
    use storefront_api::{
        ApiError, ApiFuture, CatalogApi, OrderRequest, OrderResult, RemoteProduct,
    };
    use storefront_core::event_bus::{BusEvent, EventBus, SubscriptionId, Topic};

    /// Fixed clock for deterministic tests
    ///
    /// # Example
    ///
    /// ```
    /// use storefront_testing::mocks::FixedClock;
    /// use storefront_core::environment::Clock;
    /// use chrono::Utc;
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// assert_eq!(clock.now(), clock.now());
    /// ```
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: DateTime<Utc>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self { time }
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.time
        }
    }

    /// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC)
    ///
    /// # Panics
    ///
    /// This function will panic if the hardcoded timestamp fails to parse,
    /// which should never happen in practice.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(
            DateTime::parse_from_rfc3339("2025-01-01T00:00:00Z")
                .expect("hardcoded timestamp should always parse")
                .with_timezone(&Utc),
        )
    }

    /// In-memory [`CatalogApi`]
    ///
    /// Serves a fixed product list, records submitted orders and can be told
    /// to fail either endpoint.
    #[derive(Debug, Default)]
    pub struct MockCatalogApi {
        products: Mutex<Vec<RemoteProduct>>,
        orders: Mutex<Vec<OrderRequest>>,
        catalog_error: Mutex<Option<ApiError>>,
        order_error: Mutex<Option<ApiError>>,
        list_calls: AtomicUsize,
    }

    impl MockCatalogApi {
        /// Serve `products`
        #[must_use]
        pub fn new(products: Vec<RemoteProduct>) -> Self {
            Self {
                products: Mutex::new(products),
                ..Self::default()
            }
        }

        /// Fail every catalog request with `error`
        #[must_use]
        pub fn with_catalog_error(self, error: ApiError) -> Self {
            *lock(&self.catalog_error) = Some(error);
            self
        }

        /// Fail every order submission with `error`
        #[must_use]
        pub fn with_order_error(self, error: ApiError) -> Self {
            *lock(&self.order_error) = Some(error);
            self
        }

        /// Replace the served products
        pub fn set_products(&self, products: Vec<RemoteProduct>) {
            *lock(&self.products) = products;
        }

        /// Stop failing catalog requests
        pub fn clear_catalog_error(&self) {
            *lock(&self.catalog_error) = None;
        }

        /// Orders submitted so far
        #[must_use]
        pub fn orders(&self) -> Vec<OrderRequest> {
            lock(&self.orders).clone()
        }

        /// How many times the catalog was requested
        #[must_use]
        pub fn list_calls(&self) -> usize {
            self.list_calls.load(Ordering::SeqCst)
        }
    }

    impl CatalogApi for MockCatalogApi {
        fn list_products(&self) -> ApiFuture<'_, Vec<RemoteProduct>> {
            self.list_calls.fetch_add(1, Ordering::SeqCst);
            let result = match lock(&self.catalog_error).clone() {
                Some(error) => Err(error),
                None => Ok(lock(&self.products).clone()),
            };
            Box::pin(async move { result })
        }

        fn get_product<'a>(&'a self, id: &'a str) -> ApiFuture<'a, RemoteProduct> {
            let result = match lock(&self.catalog_error).clone() {
                Some(error) => Err(error),
                None => lock(&self.products)
                    .iter()
                    .find(|p| p.id == id)
                    .cloned()
                    .ok_or_else(|| ApiError::NotFound(format!("product {id}"))),
            };
            Box::pin(async move { result })
        }

        fn submit_order<'a>(&'a self, order: &'a OrderRequest) -> ApiFuture<'a, OrderResult> {
            let result = match lock(&self.order_error).clone() {
                Some(error) => Err(error),
                None => {
                    let mut orders = lock(&self.orders);
                    orders.push(order.clone());
                    Ok(OrderResult {
                        id: format!("order-{}", orders.len()),
                        total: Some(order.total),
                    })
                },
            };
            Box::pin(async move { result })
        }
    }

    /// Captures every event emitted on a bus, in delivery order
    pub struct EventRecorder<E: BusEvent> {
        bus: EventBus<E>,
        subscription: SubscriptionId,
        events: Arc<Mutex<Vec<E>>>,
    }

    impl<E> EventRecorder<E>
    where
        E: BusEvent + Clone + Send + 'static,
    {
        /// Subscribe to every event on `bus`
        #[must_use]
        pub fn attach(bus: &EventBus<E>) -> Self {
            let events = Arc::new(Mutex::new(Vec::new()));
            let sink = Arc::clone(&events);
            let subscription = bus.subscribe(Topic::Any, move |event: &E| {
                lock(&sink).push(event.clone());
            });

            Self {
                bus: bus.clone(),
                subscription,
                events,
            }
        }

        /// Everything recorded so far
        #[must_use]
        pub fn events(&self) -> Vec<E> {
            lock(&self.events).clone()
        }

        /// Kinds of everything recorded so far
        #[must_use]
        pub fn kinds(&self) -> Vec<E::Kind> {
            lock(&self.events).iter().map(BusEvent::kind).collect()
        }

        /// Number of recorded events
        #[must_use]
        pub fn len(&self) -> usize {
            lock(&self.events).len()
        }

        /// Whether nothing has been recorded
        #[must_use]
        pub fn is_empty(&self) -> bool {
            lock(&self.events).is_empty()
        }

        /// Drain the recording
        pub fn take(&self) -> Vec<E> {
            std::mem::take(&mut *lock(&self.events))
        }

        /// Stop recording
        pub fn detach(self) {
            self.bus.unsubscribe(self.subscription);
        }
    }

    fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
        mutex.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Sample catalog data
pub mod fixtures {
    use storefront_api::RemoteProduct;

    /// Id of a priced product in [`sample_products`] (750)
    pub const EXTRA_HOUR: &str = "854cef69-976d-4c2a-a18c-2aa45046c390";
    /// Id of a priced product in [`sample_products`] (2500)
    pub const FORTUNE_COOKIES: &str = "b06cde61-912f-4663-9751-09956c0eed67";
    /// Id of a priced product in [`sample_products`] (2000)
    pub const MUTE_BUTTON: &str = "412bcf81-7e75-4e70-bdb9-d3c73c9803b7";
    /// Id of the priceless product in [`sample_products`]
    pub const HEX_LOLLIPOP: &str = "c101ab44-ed99-4a54-990d-47aa2bb4e7d9";

    /// Build a product
    #[must_use]
    pub fn product(id: &str, title: &str, price: Option<u64>) -> RemoteProduct {
        RemoteProduct {
            id: id.to_string(),
            title: title.to_string(),
            description: format!("{title} description"),
            price,
            category: "другое".to_string(),
            image: format!("https://cdn.test/{id}.svg"),
        }
    }

    /// A small catalog with three priced products and one priceless one
    #[must_use]
    pub fn sample_products() -> Vec<RemoteProduct> {
        vec![
            RemoteProduct {
                category: "софт-скил".to_string(),
                ..product(EXTRA_HOUR, "+1 час в сутках", Some(750))
            },
            RemoteProduct {
                category: "дополнительное".to_string(),
                ..product(FORTUNE_COOKIES, "Фреймворк куки судьбы", Some(2500))
            },
            RemoteProduct {
                category: "кнопка".to_string(),
                ..product(MUTE_BUTTON, "Кнопка «Замьютить кота»", Some(2000))
            },
            product(HEX_LOLLIPOP, "HEX-леденец", None),
        ]
    }
}

/// Property-based testing utilities using proptest.
pub mod properties {
    use proptest::prelude::*;
    use storefront_api::RemoteProduct;

    /// Strategy for a single product with a unique-ish id
    pub fn product_strategy() -> impl Strategy<Value = RemoteProduct> {
        (
            "[a-f0-9]{8}",
            "[A-Za-z ]{1,24}",
            proptest::option::weighted(0.85, 1u64..100_000),
        )
            .prop_map(|(id, title, price)| super::fixtures::product(&id, &title, price))
    }

    /// Strategy for a catalog of products with distinct ids
    pub fn catalog_strategy(max_len: usize) -> impl Strategy<Value = Vec<RemoteProduct>> {
        proptest::collection::vec(product_strategy(), 0..=max_len).prop_map(|mut products| {
            let mut seen = std::collections::HashSet::new();
            products.retain(|p| seen.insert(p.id.clone()));
            products
        })
    }
}

/// Test helpers and utilities.
pub mod helpers {
    /// Route `tracing` output through the test harness
    ///
    /// Safe to call from every test; only the first call installs a subscriber.
    pub fn init_tracing() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
            )
            .with_test_writer()
            .try_init();
    }
}

pub use mocks::{EventRecorder, FixedClock, MockCatalogApi, test_clock};
