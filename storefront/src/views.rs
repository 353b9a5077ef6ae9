//! Console views.
//!
//! A view turns notifications into text. Mounting a view subscribes it to the
//! topics it cares about on the store's event bus; whatever it renders goes to
//! a [`Sink`].

use crate::types::{EventKind, FormErrors, OrderDraft, OrderReceipt, Product, StorefrontEvent};
use std::fmt::Write as _;
use std::sync::{Arc, Mutex, PoisonError};
use storefront_core::event_bus::{EventBus, SubscriptionId, Topic};

/// Destination of rendered text
pub trait Sink: Send + Sync {
    /// Write one block of text
    fn write(&self, text: &str);
}

/// Writes to standard output
#[derive(Debug, Clone, Copy, Default)]
pub struct StdoutSink;

impl Sink for StdoutSink {
    fn write(&self, text: &str) {
        println!("{text}");
    }
}

/// Keeps everything written, for tests
#[derive(Debug, Default)]
pub struct BufferSink {
    blocks: Mutex<Vec<String>>,
}

impl BufferSink {
    /// Creates an empty buffer
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Blocks written so far
    #[must_use]
    pub fn blocks(&self) -> Vec<String> {
        self.lock().clone()
    }

    /// Everything written so far, one block per line group
    #[must_use]
    pub fn contents(&self) -> String {
        self.lock().join("\n")
    }

    /// Drain the buffer
    pub fn take(&self) -> Vec<String> {
        std::mem::take(&mut *self.lock())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<String>> {
        self.blocks.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Sink for BufferSink {
    fn write(&self, text: &str) {
        self.lock().push(text.to_string());
    }
}

/// Something that renders notifications
pub trait View: Send + Sync + 'static {
    /// Topics the view subscribes to
    fn topics(&self) -> Vec<Topic<EventKind>>;

    /// Text for `event`, or `None` to stay silent
    fn render(&self, event: &StorefrontEvent) -> Option<String>;
}

/// Subscribe `view` to its topics, writing its output to `sink`
pub fn mount<V: View>(
    view: V,
    bus: &EventBus<StorefrontEvent>,
    sink: &Arc<dyn Sink>,
) -> Vec<SubscriptionId> {
    let view = Arc::new(view);

    view.topics()
        .into_iter()
        .map(|topic| {
            let view = Arc::clone(&view);
            let sink = Arc::clone(sink);
            bus.subscribe(topic, move |event: &StorefrontEvent| {
                if let Some(text) = view.render(event) {
                    sink.write(&text);
                }
            })
        })
        .collect()
}

/// Mount every view, in the order they appear on screen
pub fn mount_all(bus: &EventBus<StorefrontEvent>, sink: &Arc<dyn Sink>) -> Vec<SubscriptionId> {
    let mut subscriptions = Vec::new();
    subscriptions.extend(mount(HeaderCounter, bus, sink));
    subscriptions.extend(mount(CatalogView, bus, sink));
    subscriptions.extend(mount(PreviewView, bus, sink));
    subscriptions.extend(mount(BasketView, bus, sink));
    subscriptions.extend(mount(CheckoutView, bus, sink));
    subscriptions.extend(mount(SuccessView, bus, sink));
    subscriptions
}

/// Price as shown to the customer
#[must_use]
pub fn price_label(price: Option<u64>) -> String {
    price.map_or_else(|| "Бесценно".to_string(), |value| format!("{value} синапсов"))
}

/// Basket counter in the page header
#[derive(Debug, Clone, Copy, Default)]
pub struct HeaderCounter;

impl View for HeaderCounter {
    fn topics(&self) -> Vec<Topic<EventKind>> {
        vec![Topic::Kind(EventKind::BasketCountChanged)]
    }

    fn render(&self, event: &StorefrontEvent) -> Option<String> {
        match event {
            StorefrontEvent::BasketCountChanged { count } => Some(format!("[Корзина: {count}]")),
            _ => None,
        }
    }
}

/// Product gallery
#[derive(Debug, Clone, Copy, Default)]
pub struct CatalogView;

impl CatalogView {
    /// Render a catalog listing
    #[must_use]
    pub fn render_catalog(catalog: &[Product]) -> String {
        if catalog.is_empty() {
            return "Каталог пуст".to_string();
        }

        let mut text = String::from("Каталог:");
        for (index, product) in catalog.iter().enumerate() {
            let _ = write!(
                text,
                "\n{:>3}. [{}] {} | {} | {}",
                index + 1,
                product.category,
                product.title,
                price_label(product.price),
                product.id
            );
        }
        text
    }
}

impl View for CatalogView {
    fn topics(&self) -> Vec<Topic<EventKind>> {
        vec![Topic::Kind(EventKind::CatalogChanged)]
    }

    fn render(&self, event: &StorefrontEvent) -> Option<String> {
        match event {
            StorefrontEvent::CatalogChanged { catalog } => Some(Self::render_catalog(catalog)),
            _ => None,
        }
    }
}

/// Product detail card
#[derive(Debug, Clone, Copy, Default)]
pub struct PreviewView;

impl PreviewView {
    /// Render a full product card
    #[must_use]
    pub fn render_product(product: &Product, in_basket: bool) -> String {
        let button = if !product.is_purchasable() {
            "Недоступно"
        } else if in_basket {
            "Удалить из корзины"
        } else {
            "Купить"
        };

        format!(
            "{title}\n[{category}] {price}\n{description}\n{image}\n<{button}>",
            title = product.title,
            category = product.category,
            price = price_label(product.price),
            description = product.description,
            image = product.image,
        )
    }
}

impl View for PreviewView {
    fn topics(&self) -> Vec<Topic<EventKind>> {
        vec![Topic::Kind(EventKind::PreviewChanged)]
    }

    fn render(&self, event: &StorefrontEvent) -> Option<String> {
        match event {
            StorefrontEvent::PreviewChanged { product, in_basket } => {
                Some(Self::render_product(product, *in_basket))
            },
            _ => None,
        }
    }
}

/// Basket modal
#[derive(Debug, Clone, Copy, Default)]
pub struct BasketView;

impl BasketView {
    /// Render the basket contents
    #[must_use]
    pub fn render_basket(items: &[Product], total: u64, checkout_enabled: bool) -> String {
        if items.is_empty() {
            return "Корзина пуста".to_string();
        }

        let mut text = String::from("Корзина:");
        for (index, product) in items.iter().enumerate() {
            let _ = write!(
                text,
                "\n{:>3}. {} | {}",
                index + 1,
                product.title,
                price_label(product.price)
            );
        }
        let _ = write!(text, "\nИтого: {total} синапсов");
        if checkout_enabled {
            text.push_str("\n<Оформить>");
        }
        text
    }
}

impl View for BasketView {
    fn topics(&self) -> Vec<Topic<EventKind>> {
        vec![Topic::Kind(EventKind::BasketChanged)]
    }

    fn render(&self, event: &StorefrontEvent) -> Option<String> {
        match event {
            StorefrontEvent::BasketChanged {
                items,
                total,
                checkout_enabled,
            } => Some(Self::render_basket(items, *total, *checkout_enabled)),
            _ => None,
        }
    }
}

/// Delivery and contact forms
#[derive(Debug, Clone, Copy, Default)]
pub struct CheckoutView;

impl CheckoutView {
    fn render_errors(errors: &FormErrors) -> Option<String> {
        if errors.is_empty() {
            return None;
        }

        Some(
            errors
                .iter()
                .map(|(_, message)| format!("! {message}"))
                .collect::<Vec<_>>()
                .join("\n"),
        )
    }

    fn render_delivery_ready(order: &OrderDraft) -> String {
        format!(
            "Доставка: {} | {}\nДалее: email <адрес>, phone <номер>",
            order.payment, order.address
        )
    }

    fn render_contact_ready(order: &OrderDraft) -> String {
        format!(
            "Контакты: {} | {}\nК оплате {} синапсов. Введите submit",
            order.email, order.phone, order.total
        )
    }
}

impl View for CheckoutView {
    fn topics(&self) -> Vec<Topic<EventKind>> {
        vec![Topic::matching(|kind: &EventKind| {
            matches!(
                kind,
                EventKind::FormErrorsChanged | EventKind::DeliveryReady | EventKind::ContactReady
            )
        })]
    }

    fn render(&self, event: &StorefrontEvent) -> Option<String> {
        match event {
            StorefrontEvent::FormErrorsChanged { errors } => Self::render_errors(errors),
            StorefrontEvent::DeliveryReady { order } => Some(Self::render_delivery_ready(order)),
            StorefrontEvent::ContactReady { order } => Some(Self::render_contact_ready(order)),
            _ => None,
        }
    }
}

/// Order confirmation
#[derive(Debug, Clone, Copy, Default)]
pub struct SuccessView;

impl SuccessView {
    /// Render an order confirmation
    #[must_use]
    pub fn render_receipt(receipt: &OrderReceipt) -> String {
        format!(
            "Заказ оформлен\nСписано {} синапсов\nНомер заказа: {}",
            receipt.total, receipt.id
        )
    }
}

impl View for SuccessView {
    fn topics(&self) -> Vec<Topic<EventKind>> {
        vec![Topic::Kind(EventKind::OrderPlaced)]
    }

    fn render(&self, event: &StorefrontEvent) -> Option<String> {
        match event {
            StorefrontEvent::OrderPlaced { receipt } => Some(Self::render_receipt(receipt)),
            _ => None,
        }
    }
}
