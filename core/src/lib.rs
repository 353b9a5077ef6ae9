//! # Storefront Core
//!
//! Core traits and types for the storefront state architecture.
//!
//! The storefront keeps its application state behind a single reducer. Views never
//! touch state directly: they send actions, and they learn about changes through
//! notifications delivered by the [`event_bus::EventBus`].
//!
//! ## Core Concepts
//!
//! - **State**: The session state (catalog, basket, order draft, form errors)
//! - **Action**: All possible inputs to a reducer (user intents and async results)
//! - **Event**: Notifications broadcast to views after a state transition
//! - **Reducer**: Pure function `(State, Action, Environment) → (State, Effects)`
//! - **Effect**: Side effect descriptions (notifications to emit, async work)
//! - **Environment**: Injected dependencies via traits
//!
//! ## Architecture Principles
//!
//! - Functional Core, Imperative Shell
//! - Unidirectional Data Flow
//! - Explicit Effects (no hidden I/O, no hidden emission)
//! - Dependency Injection via Environment
//!
//! ## Example
//!
//! ```ignore
//! use storefront_core::*;
//!
//! impl Reducer for BasketReducer {
//!     type State = BasketState;
//!     type Action = BasketAction;
//!     type Event = BasketEvent;
//!     type Environment = BasketEnvironment;
//!
//!     fn reduce(
//!         &self,
//!         state: &mut BasketState,
//!         action: BasketAction,
//!         env: &BasketEnvironment,
//!     ) -> SmallVec<[Effect<BasketAction, BasketEvent>; 4]> {
//!         match action {
//!             BasketAction::Clear => {
//!                 state.items.clear();
//!                 smallvec![Effect::Emit(BasketEvent::Changed { items: vec![] })]
//!             }
//!         }
//!     }
//! }
//! ```

// Re-export commonly used types
pub use chrono::{DateTime, Utc};
pub use serde::{Deserialize, Serialize};
pub use smallvec::{SmallVec, smallvec};

/// Synchronous in-process publish/subscribe bus
pub mod event_bus;

/// Reducer module - The core trait for business logic
///
/// Reducers are pure functions: `(State, Action, Environment) → (State, Effects)`
///
/// They contain all business logic and are deterministic and testable.
/// A reducer never emits notifications itself; it describes them with
/// [`Effect::Emit`](crate::effect::Effect::Emit) and the runtime delivers them.
pub mod reducer {
    use super::SmallVec;
    use super::effect::Effect;

    /// The Reducer trait - core abstraction for business logic
    ///
    /// # Type Parameters
    ///
    /// - `State`: The domain state this reducer operates on
    /// - `Action`: The action type this reducer processes
    /// - `Event`: The notification type this reducer asks the runtime to emit
    /// - `Environment`: The injected dependencies this reducer needs
    ///
    /// # Example
    ///
    /// ```ignore
    /// impl Reducer for CatalogReducer {
    ///     type State = CatalogState;
    ///     type Action = CatalogAction;
    ///     type Event = CatalogEvent;
    ///     type Environment = CatalogEnvironment;
    ///
    ///     fn reduce(
    ///         &self,
    ///         state: &mut CatalogState,
    ///         action: CatalogAction,
    ///         env: &CatalogEnvironment,
    ///     ) -> SmallVec<[Effect<CatalogAction, CatalogEvent>; 4]> {
    ///         match action {
    ///             CatalogAction::Load { products } => {
    ///                 state.products = products.clone();
    ///                 smallvec![Effect::Emit(CatalogEvent::Changed { products })]
    ///             }
    ///         }
    ///     }
    /// }
    /// ```
    pub trait Reducer {
        /// The state type this reducer operates on
        type State;

        /// The action type this reducer processes
        type Action;

        /// The notification type emitted after state transitions
        type Event;

        /// The environment type with injected dependencies
        type Environment;

        /// Reduce an action into state changes and effects
        ///
        /// This is a pure function that:
        /// 1. Validates the action
        /// 2. Updates state in place
        /// 3. Returns effect descriptions to be executed, in order
        ///
        /// # Arguments
        ///
        /// - `state`: Mutable reference to current state
        /// - `action`: The action to process
        /// - `env`: Reference to injected dependencies
        ///
        /// # Returns
        ///
        /// The effects to be executed by the runtime
        fn reduce(
            &self,
            state: &mut Self::State,
            action: Self::Action,
            env: &Self::Environment,
        ) -> SmallVec<[Effect<Self::Action, Self::Event>; 4]>;
    }
}

/// Effect module - Side effect descriptions
///
/// Effects describe side effects to be performed by the runtime.
/// They are values (not execution).
pub mod effect {
    use std::future::Future;
    use std::pin::Pin;

    /// Effect type - describes a side effect to be executed
    ///
    /// Effects are NOT executed immediately. They are descriptions of what should happen,
    /// returned from reducers and executed by the Store runtime.
    ///
    /// # Type Parameters
    ///
    /// - `Action`: The action type that effects can produce (feedback loop)
    /// - `Event`: The notification type delivered through the event bus
    pub enum Effect<Action, Event> {
        /// No-op effect
        None,

        /// Emit a notification to every matching bus subscriber
        ///
        /// Emission is synchronous: the runtime delivers it before `send` returns,
        /// in the order the reducer returned it.
        Emit(Event),

        /// Arbitrary async computation
        ///
        /// Returns `Option<Action>` - if Some, the action is fed back into the reducer
        Future(Pin<Box<dyn Future<Output = Option<Action>> + Send>>),
    }

    // Manual Debug implementation since Future doesn't implement Debug
    impl<Action, Event> std::fmt::Debug for Effect<Action, Event>
    where
        Event: std::fmt::Debug,
    {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            match self {
                Effect::None => write!(f, "Effect::None"),
                Effect::Emit(event) => f.debug_tuple("Effect::Emit").field(event).finish(),
                Effect::Future(_) => write!(f, "Effect::Future(<future>)"),
            }
        }
    }

    impl<Action, Event> Effect<Action, Event> {
        /// Wrap an async computation as an effect
        #[must_use]
        pub fn future<F>(fut: F) -> Self
        where
            F: Future<Output = Option<Action>> + Send + 'static,
        {
            Effect::Future(Box::pin(fut))
        }

        /// The emitted notification, if this is an `Emit` effect
        #[must_use]
        pub const fn as_event(&self) -> Option<&Event> {
            match self {
                Effect::Emit(event) => Some(event),
                Effect::None | Effect::Future(_) => None,
            }
        }
    }
}

/// Environment module - Dependency injection traits
///
/// All external dependencies are abstracted behind traits and injected
/// via the Environment parameter.
pub mod environment {
    use chrono::{DateTime, Utc};

    /// Clock trait - abstracts time operations for testability
    ///
    /// # Examples
    ///
    /// ```
    /// use storefront_core::environment::{Clock, SystemClock};
    ///
    /// let clock = SystemClock;
    /// let _now = clock.now();
    /// ```
    pub trait Clock: Send + Sync {
        /// Get the current time
        fn now(&self) -> DateTime<Utc>;
    }

    /// Wall-clock time
    #[derive(Debug, Clone, Copy, Default)]
    pub struct SystemClock;

    impl Clock for SystemClock {
        fn now(&self) -> DateTime<Utc> {
            Utc::now()
        }
    }
}
