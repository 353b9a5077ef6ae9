//! Synchronous publish/subscribe bus for state-change notifications.
//!
//! The [`EventBus`] connects the application state to the views that render it.
//! Every notification is a value of a closed event enum implementing
//! [`BusEvent`]; subscribers register for a [`Topic`] and receive the events
//! whose kind matches it.
//!
//! # Delivery
//!
//! ```text
//! ┌─────────────┐   emit(&event)   ┌──────────────┐
//! │   Runtime   │ ───────────────► │   EventBus   │
//! └─────────────┘                  └──────┬───────┘
//!                                         │ in registration order
//!                              ┌──────────┼──────────┐
//!                              ▼          ▼          ▼
//!                          handler 1  handler 2  handler 3
//! ```
//!
//! - **Synchronous**: `emit` returns after every matching handler has run
//! - **Ordered**: handlers run in the order they were registered
//! - **Re-entrant**: a handler may call `emit` or `subscribe` on the same bus
//! - **No isolation**: a panicking handler propagates out of `emit` and the
//!   remaining handlers of that emission are skipped
//!
//! The registry is snapshotted before delivery, so a handler registered during an
//! emission is first invoked on the next one, and a handler removed during an
//! emission still receives the event currently being delivered.
//!
//! # Example
//!
//! ```
//! use storefront_core::event_bus::{BusEvent, EventBus, Topic};
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use std::sync::Arc;
//!
//! #[derive(Debug, Clone, Copy, PartialEq, Eq)]
//! enum Kind { Added, Removed }
//!
//! #[derive(Debug)]
//! enum Notice { Added(u32), Removed(u32) }
//!
//! impl BusEvent for Notice {
//!     type Kind = Kind;
//!     fn kind(&self) -> Kind {
//!         match self {
//!             Notice::Added(_) => Kind::Added,
//!             Notice::Removed(_) => Kind::Removed,
//!         }
//!     }
//! }
//!
//! let bus = EventBus::new();
//! let seen = Arc::new(AtomicUsize::new(0));
//! let counter = Arc::clone(&seen);
//! bus.subscribe(Topic::Kind(Kind::Added), move |_: &Notice| {
//!     counter.fetch_add(1, Ordering::SeqCst);
//! });
//!
//! assert_eq!(bus.emit(&Notice::Added(1)), 1);
//! assert_eq!(bus.emit(&Notice::Removed(1)), 0);
//! assert_eq!(seen.load(Ordering::SeqCst), 1);
//! ```

use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

/// A notification that can travel through an [`EventBus`].
///
/// The kind is a cheap discriminant used for topic matching; the event itself
/// carries the typed payload.
pub trait BusEvent {
    /// Discriminant of the event enum
    type Kind: Copy + Eq + fmt::Debug + Send + Sync + 'static;

    /// The kind of this event
    fn kind(&self) -> Self::Kind;
}

/// What a subscription listens to.
pub enum Topic<K> {
    /// Exactly one event kind
    Kind(K),

    /// Every event emitted on the bus
    Any,

    /// Every event whose kind satisfies the predicate
    Matching(Arc<dyn Fn(&K) -> bool + Send + Sync>),
}

impl<K: Copy + Eq> Topic<K> {
    /// Build a pattern topic from a predicate over kinds
    pub fn matching<F>(predicate: F) -> Self
    where
        F: Fn(&K) -> bool + Send + Sync + 'static,
    {
        Self::Matching(Arc::new(predicate))
    }

    /// Whether an event of `kind` is delivered to this topic
    #[must_use]
    pub fn matches(&self, kind: &K) -> bool {
        match self {
            Self::Kind(expected) => expected == kind,
            Self::Any => true,
            Self::Matching(predicate) => predicate(kind),
        }
    }
}

impl<K: Clone> Clone for Topic<K> {
    fn clone(&self) -> Self {
        match self {
            Self::Kind(kind) => Self::Kind(kind.clone()),
            Self::Any => Self::Any,
            Self::Matching(predicate) => Self::Matching(Arc::clone(predicate)),
        }
    }
}

impl<K: fmt::Debug> fmt::Debug for Topic<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Kind(kind) => f.debug_tuple("Topic::Kind").field(kind).finish(),
            Self::Any => write!(f, "Topic::Any"),
            Self::Matching(_) => write!(f, "Topic::Matching(<predicate>)"),
        }
    }
}

/// Identifies one registration, returned by [`EventBus::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

type Handler<E> = Arc<dyn Fn(&E) + Send + Sync>;

struct Subscription<E: BusEvent> {
    id: SubscriptionId,
    topic: Topic<E::Kind>,
    handler: Handler<E>,
}

struct Registry<E: BusEvent> {
    next_id: u64,
    subscriptions: Vec<Subscription<E>>,
}

/// In-process, synchronous publish/subscribe bus.
///
/// Cloning an `EventBus` yields another handle to the same registry.
pub struct EventBus<E: BusEvent> {
    registry: Arc<RwLock<Registry<E>>>,
}

impl<E: BusEvent> EventBus<E> {
    /// Create a bus with no subscribers
    #[must_use]
    pub fn new() -> Self {
        Self {
            registry: Arc::new(RwLock::new(Registry {
                next_id: 0,
                subscriptions: Vec::new(),
            })),
        }
    }

    /// Register `handler` for `topic`.
    ///
    /// The same handler may be registered any number of times; each
    /// registration is delivered independently.
    pub fn subscribe<F>(&self, topic: Topic<E::Kind>, handler: F) -> SubscriptionId
    where
        F: Fn(&E) + Send + Sync + 'static,
    {
        self.subscribe_shared(topic, Arc::new(handler))
    }

    /// Register an already shared handler for `topic`.
    pub fn subscribe_shared(
        &self,
        topic: Topic<E::Kind>,
        handler: Arc<dyn Fn(&E) + Send + Sync>,
    ) -> SubscriptionId {
        let mut registry = self
            .registry
            .write()
            .unwrap_or_else(PoisonError::into_inner);

        let id = SubscriptionId(registry.next_id);
        registry.next_id += 1;

        tracing::trace!(subscription = id.0, topic = ?topic, "Subscribed");
        registry.subscriptions.push(Subscription { id, topic, handler });

        id
    }

    /// Deliver `event` to every matching handler, in registration order.
    ///
    /// Returns the number of handlers invoked.
    pub fn emit(&self, event: &E) -> usize {
        let kind = event.kind();

        let handlers: Vec<Handler<E>> = {
            let registry = self
                .registry
                .read()
                .unwrap_or_else(PoisonError::into_inner);
            registry
                .subscriptions
                .iter()
                .filter(|subscription| subscription.topic.matches(&kind))
                .map(|subscription| Arc::clone(&subscription.handler))
                .collect()
        };

        tracing::trace!(kind = ?kind, handlers = handlers.len(), "Emitting event");

        for handler in &handlers {
            handler(event);
        }

        handlers.len()
    }

    /// Remove one registration. Returns `false` if it was not present.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut registry = self
            .registry
            .write()
            .unwrap_or_else(PoisonError::into_inner);

        let before = registry.subscriptions.len();
        registry.subscriptions.retain(|subscription| subscription.id != id);
        before != registry.subscriptions.len()
    }

    /// Remove every registration made with `Topic::Kind(kind)`.
    ///
    /// `Any` and pattern subscriptions are left in place. Returns the number of
    /// registrations removed.
    pub fn unsubscribe_kind(&self, kind: E::Kind) -> usize {
        let mut registry = self
            .registry
            .write()
            .unwrap_or_else(PoisonError::into_inner);

        let before = registry.subscriptions.len();
        registry
            .subscriptions
            .retain(|subscription| !matches!(subscription.topic, Topic::Kind(k) if k == kind));
        before - registry.subscriptions.len()
    }

    /// Remove every registration
    pub fn clear(&self) {
        self.registry
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .subscriptions
            .clear();
    }

    /// Number of registrations
    #[must_use]
    pub fn len(&self) -> usize {
        self.registry
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .subscriptions
            .len()
    }

    /// Whether the bus has no registrations
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<E: BusEvent> Default for EventBus<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: BusEvent> Clone for EventBus<E> {
    fn clone(&self) -> Self {
        Self {
            registry: Arc::clone(&self.registry),
        }
    }
}

impl<E: BusEvent> fmt::Debug for EventBus<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriptions", &self.len())
            .finish_non_exhaustive()
    }
}
