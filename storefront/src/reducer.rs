//! Reducer logic for the storefront session.
//!
//! Every transition is a pure function of the current state and one action.
//! Notifications are returned as `Effect::Emit` values in the order views must
//! see them; network calls are returned as `Effect::Future` values whose result
//! comes back as another action.

use crate::types::{
    ContactField, DeliveryField, FormErrors, OrderDraft, OrderReceipt, Product, ProductId,
    StorefrontAction, StorefrontEvent, StorefrontState,
};
use crate::validation::{validate_contact, validate_delivery};
use std::sync::Arc;
use storefront_api::{CatalogApi, OrderRequest, PaymentMethod};
use storefront_core::{SmallVec, effect::Effect, environment::Clock, reducer::Reducer, smallvec};

type Effects = SmallVec<[Effect<StorefrontAction, StorefrontEvent>; 4]>;

/// Environment dependencies for the storefront reducer
#[derive(Clone)]
pub struct StorefrontEnvironment {
    /// Remote catalog and order API
    pub api: Arc<dyn CatalogApi>,
    /// Clock for order timestamps
    pub clock: Arc<dyn Clock>,
}

impl StorefrontEnvironment {
    /// Creates a new `StorefrontEnvironment`
    #[must_use]
    pub fn new(api: Arc<dyn CatalogApi>, clock: Arc<dyn Clock>) -> Self {
        Self { api, clock }
    }
}

impl std::fmt::Debug for StorefrontEnvironment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorefrontEnvironment").finish_non_exhaustive()
    }
}

/// Reducer for the storefront session
#[derive(Clone, Copy, Debug, Default)]
pub struct StorefrontReducer;

impl StorefrontReducer {
    /// Creates a new `StorefrontReducer`
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Rejects an action that the UI should never have sent
    fn reject(state: &mut StorefrontState, message: String) -> Effects {
        tracing::error!(error = %message, "Rejected action");
        state.last_error = Some(message);
        SmallVec::new()
    }

    /// Rejects an action the user may legitimately attempt
    fn refuse(state: &mut StorefrontState, message: String) -> Effects {
        tracing::warn!(reason = %message, "Refused action");
        state.last_error = Some(message);
        SmallVec::new()
    }

    /// Re-derives the draft's items and total from the basket
    fn sync_order(state: &mut StorefrontState) {
        state.order.items = state.basket.iter().map(|p| p.id.clone()).collect();
        state.order.total = state.basket_total();
    }

    fn basket_events(state: &StorefrontState) -> Effects {
        smallvec![
            Effect::Emit(StorefrontEvent::BasketCountChanged {
                count: state.basket.len(),
            }),
            Effect::Emit(StorefrontEvent::BasketChanged {
                items: state.basket.clone(),
                total: state.basket_total(),
                checkout_enabled: state.checkout_enabled(),
            }),
        ]
    }

    fn preview_event(state: &StorefrontState, id: &ProductId) -> Option<Effect<StorefrontAction, StorefrontEvent>> {
        state.product(id).map(|product| {
            Effect::Emit(StorefrontEvent::PreviewChanged {
                product: product.clone(),
                in_basket: state.in_basket(id),
            })
        })
    }

    /// Replaces the catalog and drops basket entries and the preview it no longer has
    fn apply_catalog(state: &mut StorefrontState, products: Vec<Product>) -> Effects {
        state.catalog = products;

        let before = std::mem::take(&mut state.basket);
        let basket: Vec<Product> = before
            .iter()
            .filter_map(|p| state.product(&p.id).cloned())
            .collect();
        state.basket = basket;

        if state
            .preview
            .as_ref()
            .is_some_and(|id| state.product(id).is_none())
        {
            state.preview = None;
        }

        Self::sync_order(state);
        tracing::debug!(
            products = state.catalog.len(),
            generation = state.catalog_generation,
            "Catalog loaded"
        );

        let mut effects: Effects = smallvec![Effect::Emit(StorefrontEvent::CatalogChanged {
            catalog: state.catalog.clone(),
        })];
        if state.basket != before {
            tracing::debug!(
                removed = before.len() - state.basket.len(),
                "Basket pruned after catalog reload"
            );
            effects.extend(Self::basket_events(state));
        }
        effects
    }

    fn add(state: &mut StorefrontState, id: &ProductId) -> Effects {
        let Some(product) = state.product(id).cloned() else {
            return Self::reject(state, format!("Product {id} is not in the catalog"));
        };

        if !product.is_purchasable() {
            return Self::refuse(state, format!("Product {id} has no price and cannot be bought"));
        }

        if state.in_basket(id) {
            return SmallVec::new();
        }

        state.basket.push(product);
        Self::sync_order(state);
        tracing::debug!(%id, items = state.basket.len(), "Added to basket");

        Self::basket_events(state)
    }

    fn remove(state: &mut StorefrontState, id: &ProductId) -> Effects {
        state.basket.retain(|p| &p.id != id);
        Self::sync_order(state);
        tracing::debug!(%id, items = state.basket.len(), "Removed from basket");

        Self::basket_events(state)
    }

    /// Stores the result of a validation pass and emits it
    fn publish_validation(
        state: &mut StorefrontState,
        errors: FormErrors,
        ready: fn(OrderDraft) -> StorefrontEvent,
    ) -> Effects {
        state.form_errors = errors.clone();

        let mut effects: Effects = smallvec![Effect::Emit(StorefrontEvent::FormErrorsChanged {
            errors
        })];
        if state.form_errors.is_empty() {
            effects.push(Effect::Emit(ready(state.order.clone())));
        }
        effects
    }

    fn validate_submit(state: &StorefrontState) -> Result<(), String> {
        if state.submitting {
            return Err("An order is already being submitted".to_string());
        }

        if !state.checkout_enabled() {
            return Err("The basket has nothing to pay for".to_string());
        }

        let problems: Vec<String> = validate_delivery(&state.order)
            .iter()
            .chain(validate_contact(&state.order).iter())
            .map(|(_, message)| message.to_string())
            .collect();

        if problems.is_empty() {
            Ok(())
        } else {
            Err(problems.join("; "))
        }
    }

    fn fetch_catalog(env: &StorefrontEnvironment, generation: u64) -> Effect<StorefrontAction, StorefrontEvent> {
        let api = Arc::clone(&env.api);

        Effect::future(async move {
            match api.list_products().await {
                Ok(products) => Some(StorefrontAction::CatalogFetched {
                    generation,
                    products: products.into_iter().map(Product::from).collect(),
                }),
                Err(error) => Some(StorefrontAction::CatalogFetchFailed { generation, error }),
            }
        })
    }

    fn submit_order(env: &StorefrontEnvironment, request: OrderRequest) -> Effect<StorefrontAction, StorefrontEvent> {
        let api = Arc::clone(&env.api);
        let clock = Arc::clone(&env.clock);

        Effect::future(async move {
            match api.submit_order(&request).await {
                Ok(result) => Some(StorefrontAction::OrderPlaced {
                    receipt: OrderReceipt {
                        id: result.id,
                        total: result.total.unwrap_or(request.total),
                        placed_at: clock.now(),
                    },
                }),
                Err(error) => Some(StorefrontAction::OrderFailed { error }),
            }
        })
    }
}

impl Reducer for StorefrontReducer {
    type State = StorefrontState;
    type Action = StorefrontAction;
    type Event = StorefrontEvent;
    type Environment = StorefrontEnvironment;

    #[allow(clippy::too_many_lines)] // One arm per action
    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action, Self::Event>; 4]> {
        state.last_error = None;

        match action {
            // ========== Catalog ==========
            StorefrontAction::RequestCatalog => {
                state.catalog_generation += 1;
                tracing::debug!(generation = state.catalog_generation, "Requesting catalog");
                smallvec![Self::fetch_catalog(env, state.catalog_generation)]
            },
            StorefrontAction::LoadCatalog { products } => {
                state.catalog_generation += 1;
                Self::apply_catalog(state, products)
            },
            StorefrontAction::CatalogFetched {
                generation,
                products,
            } => {
                if generation != state.catalog_generation {
                    tracing::debug!(
                        generation,
                        current = state.catalog_generation,
                        "Ignoring stale catalog"
                    );
                    return SmallVec::new();
                }
                Self::apply_catalog(state, products)
            },
            StorefrontAction::CatalogFetchFailed { generation, error } => {
                if generation != state.catalog_generation {
                    tracing::debug!(generation, "Ignoring stale catalog failure");
                    return SmallVec::new();
                }
                tracing::error!(%error, "Failed to load catalog");
                state.last_error = Some(format!("Failed to load catalog: {error}"));
                SmallVec::new()
            },
            StorefrontAction::SelectPreview { id } => {
                let Some(effect) = Self::preview_event(state, &id) else {
                    return Self::reject(state, format!("Product {id} is not in the catalog"));
                };
                state.preview = Some(id);
                smallvec![effect]
            },

            // ========== Basket ==========
            StorefrontAction::AddToBasket { id } => Self::add(state, &id),
            StorefrontAction::RemoveFromBasket { id } => Self::remove(state, &id),
            StorefrontAction::ToggleBasket { id } => {
                if state.product(&id).is_none() {
                    return Self::reject(state, format!("Product {id} is not in the catalog"));
                }

                let mut effects = if state.in_basket(&id) {
                    Self::remove(state, &id)
                } else {
                    Self::add(state, &id)
                };

                if !effects.is_empty() && state.preview.as_ref() == Some(&id) {
                    effects.extend(Self::preview_event(state, &id));
                }
                effects
            },
            StorefrontAction::ClearBasket => {
                state.basket.clear();
                Self::sync_order(state);
                tracing::debug!("Basket cleared");
                Self::basket_events(state)
            },

            // ========== Checkout ==========
            StorefrontAction::BeginCheckout => {
                if !state.checkout_enabled() {
                    return Self::refuse(state, "The basket has nothing to pay for".to_string());
                }
                Self::sync_order(state);
                state.form_errors = FormErrors::new();
                tracing::debug!(
                    items = state.order.items.len(),
                    total = state.order.total,
                    "Checkout started"
                );
                SmallVec::new()
            },
            StorefrontAction::SetDeliveryField { field, value } => {
                match field {
                    DeliveryField::Payment => match value.parse::<PaymentMethod>() {
                        Ok(payment) => state.order.payment = payment,
                        Err(error) => return Self::reject(state, error.to_string()),
                    },
                    DeliveryField::Address => state.order.address = value,
                }

                let errors = validate_delivery(&state.order);
                Self::publish_validation(state, errors, |order| StorefrontEvent::DeliveryReady {
                    order,
                })
            },
            StorefrontAction::SetContactField { field, value } => {
                match field {
                    ContactField::Email => state.order.email = value,
                    ContactField::Phone => state.order.phone = value,
                }

                let errors = validate_contact(&state.order);
                Self::publish_validation(state, errors, |order| StorefrontEvent::ContactReady {
                    order,
                })
            },
            StorefrontAction::SubmitOrder => {
                if let Err(message) = Self::validate_submit(state) {
                    return Self::refuse(state, message);
                }

                Self::sync_order(state);
                state.submitting = true;
                tracing::info!(
                    items = state.order.items.len(),
                    total = state.order.total,
                    payment = %state.order.payment,
                    "Submitting order"
                );
                smallvec![Self::submit_order(env, state.order.to_request())]
            },
            StorefrontAction::OrderPlaced { receipt } => {
                tracing::info!(order_id = %receipt.id, total = receipt.total, "Order placed");
                state.submitting = false;
                state.basket.clear();
                state.order = OrderDraft::default();
                state.form_errors = FormErrors::new();
                state.last_receipt = Some(receipt.clone());

                let mut effects = Self::basket_events(state);
                effects.push(Effect::Emit(StorefrontEvent::OrderPlaced { receipt }));
                effects
            },
            StorefrontAction::OrderFailed { error } => {
                tracing::error!(%error, "Order submission failed");
                state.submitting = false;
                state.last_error = Some(format!("Order failed: {error}"));
                SmallVec::new()
            },
            StorefrontAction::ClearOrder => {
                state.order = OrderDraft::default();
                SmallVec::new()
            },
        }
    }
}
