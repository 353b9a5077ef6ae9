//! # Storefront Runtime
//!
//! Runtime for the storefront state architecture.
//!
//! This crate provides the Store that owns application state, runs the reducer,
//! delivers emitted notifications through the event bus and executes async effects.
//!
//! ## Core Components
//!
//! - **Store**: Owns state and serializes every transition through the reducer
//! - **Event Bus**: Receives `Effect::Emit` notifications synchronously, in order
//! - **Effect Executor**: Spawns `Effect::Future` work and feeds results back
//!
//! ## Example
//!
//! ```ignore
//! use storefront_runtime::Store;
//! use storefront_core::event_bus::Topic;
//!
//! let store = Store::new(initial_state, my_reducer, environment);
//!
//! store.events().subscribe(Topic::Kind(EventKind::BasketChanged), |event| {
//!     println!("{event:?}");
//! });
//!
//! // Subscribers have already run when send() returns
//! store.send(Action::AddToBasket { id }).await?;
//!
//! let count = store.state(|s| s.basket.len()).await;
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;
use storefront_core::{effect::Effect, event_bus::BusEvent, event_bus::EventBus, reducer::Reducer};
use tokio::sync::{Mutex, RwLock, broadcast, watch};

/// Error types for the Store runtime
pub mod error {
    use thiserror::Error;

    /// Errors that can occur during Store operations
    #[derive(Error, Debug, Clone, PartialEq, Eq)]
    pub enum StoreError {
        /// Store is shutting down and not accepting new actions
        ///
        /// This error is returned when `send()` is called after shutdown initiated.
        #[error("Store is shutting down")]
        ShutdownInProgress,

        /// Shutdown timed out waiting for effects to complete
        #[error("Shutdown timed out with {0} effects still running")]
        ShutdownTimeout(usize),

        /// Timeout waiting for effects or for a terminal action
        #[error("Timeout waiting for action")]
        Timeout,

        /// Action broadcast channel closed
        #[error("Action broadcast channel closed")]
        ChannelClosed,
    }
}

pub use error::StoreError;

/// Default capacity of the action broadcast channel
pub const DEFAULT_BROADCAST_CAPACITY: usize = 16;

/// Handle for tracking effect completion
///
/// Returned by [`Store::send()`]. Awaiting it waits for every `Effect::Future`
/// the action produced, including the reduction of the action each one fed back.
///
/// # Example
///
/// ```ignore
/// let mut handle = store.send(Action::SubmitOrder).await?;
/// handle.wait_with_timeout(Duration::from_secs(5)).await?;
/// // OrderPlaced or OrderFailed has been reduced by now
/// ```
#[derive(Clone)]
pub struct EffectHandle {
    effects: Arc<AtomicUsize>,
    completion: watch::Receiver<()>,
}

impl EffectHandle {
    fn new() -> (Self, EffectTracking) {
        let counter = Arc::new(AtomicUsize::new(0));
        let (tx, rx) = watch::channel(());

        let handle = Self {
            effects: Arc::clone(&counter),
            completion: rx,
        };

        (handle, EffectTracking { counter, notifier: tx })
    }

    /// Create a handle that's already complete
    #[must_use]
    pub fn completed() -> Self {
        let (tx, rx) = watch::channel(());
        let _ = tx.send(());

        Self {
            effects: Arc::new(AtomicUsize::new(0)),
            completion: rx,
        }
    }

    /// Number of effects still running
    #[must_use]
    pub fn pending(&self) -> usize {
        self.effects.load(Ordering::SeqCst)
    }

    /// Wait for all effects to complete
    pub async fn wait(&mut self) {
        while self.effects.load(Ordering::SeqCst) > 0 {
            if self.completion.changed().await.is_err() {
                break;
            }
        }
    }

    /// Wait for all effects to complete with a timeout
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Timeout`] if the timeout expires before all effects complete.
    pub async fn wait_with_timeout(&mut self, timeout: Duration) -> Result<(), StoreError> {
        tokio::time::timeout(timeout, self.wait())
            .await
            .map_err(|_| StoreError::Timeout)
    }
}

impl std::fmt::Debug for EffectHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EffectHandle")
            .field("pending_effects", &self.effects.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}

/// Internal: completion counter shared between a handle and its effects
#[derive(Clone)]
struct EffectTracking {
    counter: Arc<AtomicUsize>,
    notifier: watch::Sender<()>,
}

impl EffectTracking {
    fn increment(&self) {
        self.counter.fetch_add(1, Ordering::SeqCst);
    }

    fn decrement(&self) {
        if self.counter.fetch_sub(1, Ordering::SeqCst) == 1 {
            let _ = self.notifier.send(());
        }
    }
}

/// Internal: decrements the effect counter on drop, even if the effect panics
struct DecrementGuard(EffectTracking);

impl Drop for DecrementGuard {
    fn drop(&mut self) {
        self.0.decrement();
    }
}

/// Internal: decrements the store-wide pending counter on drop
struct AtomicCounterGuard(Arc<AtomicUsize>);

impl Drop for AtomicCounterGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Store module - The runtime for reducers
pub mod store {
    use super::{
        Arc, AtomicBool, AtomicCounterGuard, AtomicUsize, BusEvent, DEFAULT_BROADCAST_CAPACITY,
        DecrementGuard, Duration, Effect, EffectHandle, EffectTracking, EventBus, Mutex,
        Ordering, Reducer, RwLock, StoreError, broadcast,
    };

    /// The Store - runtime coordinator for a reducer
    ///
    /// The Store manages:
    /// 1. State (behind `RwLock` for concurrent access)
    /// 2. Reducer (business logic)
    /// 3. Environment (injected dependencies)
    /// 4. The event bus that receives emitted notifications
    /// 5. Effect execution (with feedback loop)
    ///
    /// # Type Parameters
    ///
    /// - `S`: State type
    /// - `A`: Action type
    /// - `E`: Environment type
    /// - `R`: Reducer implementation
    pub struct Store<S, A, E, R>
    where
        R: Reducer<State = S, Action = A, Environment = E>,
        R::Event: BusEvent,
    {
        state: Arc<RwLock<S>>,
        reducer: R,
        environment: E,
        events: EventBus<R::Event>,
        /// Held from reduction until the emitted notifications are delivered
        emission: Arc<Mutex<()>>,
        shutdown: Arc<AtomicBool>,
        pending_effects: Arc<AtomicUsize>,
        /// Actions produced by effects, for observers waiting on async results
        action_broadcast: broadcast::Sender<A>,
    }

    impl<S, A, E, R> Store<S, A, E, R>
    where
        R: Reducer<State = S, Action = A, Environment = E> + Clone + Send + Sync + 'static,
        R::Event: BusEvent + Send + 'static,
        A: Send + Clone + 'static,
        S: Send + Sync + 'static,
        E: Clone + Send + Sync + 'static,
    {
        /// Create a new store with initial state, reducer, and environment
        ///
        /// The store starts with an empty event bus; subscribe through
        /// [`Store::events`].
        #[must_use]
        pub fn new(initial_state: S, reducer: R, environment: E) -> Self {
            Self::with_event_bus(initial_state, reducer, environment, EventBus::new())
        }

        /// Create a store that emits into an existing bus
        ///
        /// Useful when views subscribe before the store exists.
        #[must_use]
        pub fn with_event_bus(
            initial_state: S,
            reducer: R,
            environment: E,
            events: EventBus<R::Event>,
        ) -> Self {
            let (action_broadcast, _) = broadcast::channel(DEFAULT_BROADCAST_CAPACITY);

            Self {
                state: Arc::new(RwLock::new(initial_state)),
                reducer,
                environment,
                events,
                emission: Arc::new(Mutex::new(())),
                shutdown: Arc::new(AtomicBool::new(false)),
                pending_effects: Arc::new(AtomicUsize::new(0)),
                action_broadcast,
            }
        }

        /// Set the action broadcast capacity
        ///
        /// Increase if observers frequently lag. Existing receivers are dropped.
        #[must_use]
        pub fn with_broadcast_capacity(mut self, capacity: usize) -> Self {
            let (action_broadcast, _) = broadcast::channel(capacity);
            self.action_broadcast = action_broadcast;
            self
        }

        /// The bus that receives every emitted notification
        #[must_use]
        pub const fn events(&self) -> &EventBus<R::Event> {
            &self.events
        }

        /// Initiate graceful shutdown of the store
        ///
        /// Rejects new actions, then waits for in-flight effects to finish.
        ///
        /// # Errors
        ///
        /// Returns [`StoreError::ShutdownTimeout`] if the timeout expires before all
        /// pending effects complete.
        pub async fn shutdown(&self, timeout: Duration) -> Result<(), StoreError> {
            tracing::info!("Initiating graceful shutdown");
            metrics::counter!("store.shutdown.initiated").increment(1);

            self.shutdown.store(true, Ordering::Release);

            let start = std::time::Instant::now();
            let poll_interval = Duration::from_millis(20);

            loop {
                let pending = self.pending_effects.load(Ordering::Acquire);

                if pending == 0 {
                    tracing::info!("All effects completed, shutdown successful");
                    metrics::counter!("store.shutdown.completed").increment(1);
                    return Ok(());
                }

                if start.elapsed() >= timeout {
                    tracing::error!(pending_effects = pending, "Shutdown timed out");
                    metrics::counter!("store.shutdown.timeout").increment(1);
                    return Err(StoreError::ShutdownTimeout(pending));
                }

                tokio::time::sleep(poll_interval).await;
            }
        }

        /// Send an action to the store
        ///
        /// 1. Acquires write lock on state
        /// 2. Calls reducer with (state, action, environment)
        /// 3. Releases the lock, then executes the returned effects in order
        ///
        /// `Effect::Emit` notifications are delivered synchronously, so every
        /// subscriber has run by the time `send()` returns. Concurrent sends
        /// deliver their notifications in the order their actions were reduced.
        /// `Effect::Future` work is spawned; track it through the returned
        /// [`EffectHandle`].
        ///
        /// # Errors
        ///
        /// Returns [`StoreError::ShutdownInProgress`] if the store is shutting down.
        ///
        /// # Panics
        ///
        /// A panicking reducer or subscriber propagates to the caller.
        pub async fn send(&self, action: A) -> Result<EffectHandle, StoreError> {
            self.send_and_read(action, |_| ())
                .await
                .map(|(handle, ())| handle)
        }

        /// Send an action and read the state it produced
        ///
        /// `read` runs under the same write lock as the reduction, so no other
        /// action can change the state in between.
        ///
        /// ```ignore
        /// let (_handle, rejected) = store
        ///     .send_and_read(Action::AddToBasket { id }, |s| s.last_error.clone())
        ///     .await?;
        /// ```
        ///
        /// # Errors
        ///
        /// Returns [`StoreError::ShutdownInProgress`] if the store is shutting down.
        #[tracing::instrument(skip(self, action, read), name = "store_send")]
        pub async fn send_and_read<F, T>(
            &self,
            action: A,
            read: F,
        ) -> Result<(EffectHandle, T), StoreError>
        where
            F: FnOnce(&S) -> T,
        {
            if self.shutdown.load(Ordering::Acquire) {
                tracing::warn!("Rejected action: store is shutting down");
                metrics::counter!("store.shutdown.rejected_actions").increment(1);
                return Err(StoreError::ShutdownInProgress);
            }

            metrics::counter!("store.actions.total").increment(1);

            let (handle, tracking) = EffectHandle::new();
            let _emission = self.emission.lock().await;

            let (effects, observed) = {
                let mut state = self.state.write().await;
                tracing::trace!("Acquired write lock on state");

                let start = std::time::Instant::now();
                let effects = self.reducer.reduce(&mut *state, action, &self.environment);
                metrics::histogram!("store.reducer.duration_seconds")
                    .record(start.elapsed().as_secs_f64());

                tracing::trace!("Reducer completed, returned {} effects", effects.len());
                (effects, read(&*state))
            };

            for effect in effects {
                self.execute_effect(effect, &tracking);
            }

            Ok((handle, observed))
        }

        /// Send an action and wait for a matching action produced by its effects
        ///
        /// Subscribes to the action broadcast before sending, so a fast effect
        /// cannot slip past.
        ///
        /// # Errors
        ///
        /// - [`StoreError::Timeout`]: Timeout expired before a matching action arrived
        /// - [`StoreError::ChannelClosed`]: Action broadcast channel closed
        /// - [`StoreError::ShutdownInProgress`]: Store is shutting down
        pub async fn send_and_wait_for<F>(
            &self,
            action: A,
            predicate: F,
            timeout: Duration,
        ) -> Result<A, StoreError>
        where
            F: Fn(&A) -> bool,
        {
            let mut rx = self.action_broadcast.subscribe();

            self.send(action).await?;

            tokio::time::timeout(timeout, async {
                loop {
                    match rx.recv().await {
                        Ok(action) if predicate(&action) => return Ok(action),
                        Ok(_) => {},
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            tracing::warn!(skipped, "Action observer lagged");
                        },
                        Err(broadcast::error::RecvError::Closed) => {
                            return Err(StoreError::ChannelClosed);
                        },
                    }
                }
            })
            .await
            .map_err(|_| StoreError::Timeout)?
        }

        /// Subscribe to actions produced by effects
        ///
        /// Actions passed to [`Store::send`] directly are not broadcast.
        #[must_use]
        pub fn subscribe_actions(&self) -> broadcast::Receiver<A> {
            self.action_broadcast.subscribe()
        }

        /// Read current state via a closure
        ///
        /// ```ignore
        /// let count = store.state(|s| s.basket.len()).await;
        /// ```
        pub async fn state<F, T>(&self, f: F) -> T
        where
            F: FnOnce(&S) -> T,
        {
            let state = self.state.read().await;
            f(&*state)
        }

        /// Execute one effect
        ///
        /// - `None`: No-op
        /// - `Emit`: Delivered to the bus before this returns
        /// - `Future`: Spawned; a produced action is broadcast, then fed back
        #[tracing::instrument(skip(self, effect, tracking), name = "execute_effect")]
        fn execute_effect(&self, effect: Effect<A, R::Event>, tracking: &EffectTracking) {
            match effect {
                Effect::None => {
                    tracing::trace!("Executing Effect::None (no-op)");
                },
                Effect::Emit(event) => {
                    let kind = event.kind();
                    let delivered = self.events.emit(&event);
                    tracing::debug!(kind = ?kind, delivered, "Emitted event");
                    metrics::counter!("store.events.emitted").increment(1);
                },
                Effect::Future(fut) => {
                    tracing::trace!("Executing Effect::Future");
                    metrics::counter!("store.effects.executed", "type" => "future").increment(1);

                    tracking.increment();
                    self.pending_effects.fetch_add(1, Ordering::SeqCst);
                    let pending_guard = AtomicCounterGuard(Arc::clone(&self.pending_effects));
                    let guard = DecrementGuard(tracking.clone());
                    let store = self.clone();

                    tokio::spawn(async move {
                        let _guard = guard;
                        let _pending_guard = pending_guard;
                        if let Some(action) = fut.await {
                            tracing::trace!("Effect::Future produced an action, sending to store");
                            let _ = store.action_broadcast.send(action.clone());
                            if let Err(error) = store.send(action).await {
                                tracing::warn!(%error, "Dropped action produced by effect");
                            }
                        } else {
                            tracing::trace!("Effect::Future completed with no action");
                        }
                    });
                },
            }
        }
    }

    impl<S, A, E, R> Clone for Store<S, A, E, R>
    where
        R: Reducer<State = S, Action = A, Environment = E> + Clone,
        R::Event: BusEvent,
        E: Clone,
    {
        fn clone(&self) -> Self {
            Self {
                state: Arc::clone(&self.state),
                reducer: self.reducer.clone(),
                environment: self.environment.clone(),
                events: self.events.clone(),
                emission: Arc::clone(&self.emission),
                shutdown: Arc::clone(&self.shutdown),
                pending_effects: Arc::clone(&self.pending_effects),
                action_broadcast: self.action_broadcast.clone(),
            }
        }
    }
}

pub use store::Store;

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use storefront_core::event_bus::Topic;
    use storefront_core::{SmallVec, smallvec};

    #[derive(Debug, Clone, Default)]
    struct TestState {
        value: i32,
    }

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum TestAction {
        Increment,
        Decrement,
        NoOp,
        IncrementLater,
        IncrementTwiceLater,
        Panicking,
    }

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum TestEvent {
        Changed(i32),
        Negative,
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum TestKind {
        Changed,
        Negative,
    }

    impl BusEvent for TestEvent {
        type Kind = TestKind;

        fn kind(&self) -> TestKind {
            match self {
                Self::Changed(_) => TestKind::Changed,
                Self::Negative => TestKind::Negative,
            }
        }
    }

    #[derive(Debug, Clone)]
    struct TestEnv;

    #[derive(Debug, Clone)]
    struct TestReducer;

    impl Reducer for TestReducer {
        type State = TestState;
        type Action = TestAction;
        type Event = TestEvent;
        type Environment = TestEnv;

        fn reduce(
            &self,
            state: &mut TestState,
            action: TestAction,
            _env: &TestEnv,
        ) -> SmallVec<[Effect<TestAction, TestEvent>; 4]> {
            match action {
                TestAction::Increment => {
                    state.value += 1;
                    smallvec![Effect::Emit(TestEvent::Changed(state.value))]
                },
                TestAction::Decrement => {
                    state.value -= 1;
                    if state.value < 0 {
                        smallvec![
                            Effect::Emit(TestEvent::Changed(state.value)),
                            Effect::Emit(TestEvent::Negative),
                        ]
                    } else {
                        smallvec![Effect::Emit(TestEvent::Changed(state.value))]
                    }
                },
                TestAction::NoOp => smallvec![Effect::None],
                TestAction::IncrementLater => {
                    smallvec![Effect::future(async { Some(TestAction::Increment) })]
                },
                TestAction::IncrementTwiceLater => smallvec![
                    Effect::future(async { Some(TestAction::Increment) }),
                    Effect::future(async {
                        tokio::time::sleep(Duration::from_millis(10)).await;
                        Some(TestAction::Increment)
                    }),
                ],
                TestAction::Panicking => {
                    smallvec![Effect::future(async {
                        panic!("Intentional panic in effect for testing");
                    })]
                },
            }
        }
    }

    fn store() -> Store<TestState, TestAction, TestEnv, TestReducer> {
        Store::new(TestState::default(), TestReducer, TestEnv)
    }

    fn record(store: &Store<TestState, TestAction, TestEnv, TestReducer>) -> Arc<Mutex<Vec<TestEvent>>> {
        let log = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&log);
        store.events().subscribe(Topic::Any, move |event: &TestEvent| {
            sink.lock().unwrap().push(event.clone());
        });
        log
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_overlapping_sends_emit_in_reduction_order() {
        let store = store();
        let log = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&log);
        let first = Arc::new(AtomicBool::new(true));
        store.events().subscribe(Topic::Any, move |event: &TestEvent| {
            if first.swap(false, Ordering::SeqCst) {
                std::thread::sleep(Duration::from_millis(300));
            }
            sink.lock().unwrap().push(event.clone());
        });

        let slow = {
            let store = store.clone();
            tokio::spawn(async move { store.send(TestAction::Increment).await.map(drop) })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;
        let fast = {
            let store = store.clone();
            tokio::spawn(async move { store.send(TestAction::Decrement).await.map(drop) })
        };
        slow.await.unwrap().unwrap();
        fast.await.unwrap().unwrap();

        assert_eq!(
            *log.lock().unwrap(),
            vec![TestEvent::Changed(1), TestEvent::Changed(0)]
        );
        assert_eq!(store.state(|s| s.value).await, 0);
    }

    #[tokio::test]
    async fn test_send_and_read_sees_reduced_state() {
        let store = store();
        let (mut handle, value) = store
            .send_and_read(TestAction::Increment, |s| s.value)
            .await
            .unwrap();

        assert_eq!(value, 1);
        assert_eq!(handle.pending(), 0);
        handle.wait().await;

        let (_, value) = store.send_and_read(TestAction::NoOp, |s| s.value).await.unwrap();
        assert_eq!(value, 1);
    }

    #[tokio::test]
    async fn test_store_creation() {
        let store = store();
        assert_eq!(store.state(|s| s.value).await, 0);
        assert!(store.events().is_empty());
    }

    #[tokio::test]
    async fn test_send_updates_state() {
        let store = store();
        let _ = store.send(TestAction::Increment).await.unwrap();
        let _ = store.send(TestAction::Increment).await.unwrap();
        let _ = store.send(TestAction::Decrement).await.unwrap();

        assert_eq!(store.state(|s| s.value).await, 1);
    }

    #[tokio::test]
    async fn test_emitted_events_delivered_before_send_returns() {
        let store = store();
        let log = record(&store);

        let _ = store.send(TestAction::Decrement).await.unwrap();

        assert_eq!(
            *log.lock().unwrap(),
            vec![TestEvent::Changed(-1), TestEvent::Negative]
        );
    }

    #[tokio::test]
    async fn test_no_op_emits_nothing() {
        let store = store();
        let log = record(&store);

        let _ = store.send(TestAction::NoOp).await.unwrap();

        assert!(log.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_kind_subscription_filters() {
        let store = store();
        let negatives = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&negatives);
        store
            .events()
            .subscribe(Topic::Kind(TestKind::Negative), move |_: &TestEvent| {
                counter.fetch_add(1, Ordering::SeqCst);
            });

        let _ = store.send(TestAction::Increment).await.unwrap();
        let _ = store.send(TestAction::Decrement).await.unwrap();
        let _ = store.send(TestAction::Decrement).await.unwrap();

        assert_eq!(negatives.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_future_effect_feeds_back() {
        let store = store();
        let log = record(&store);

        let mut handle = store.send(TestAction::IncrementLater).await.unwrap();
        handle.wait_with_timeout(Duration::from_secs(1)).await.unwrap();

        assert_eq!(store.state(|s| s.value).await, 1);
        assert_eq!(*log.lock().unwrap(), vec![TestEvent::Changed(1)]);
    }

    #[tokio::test]
    async fn test_handle_waits_for_every_future() {
        let store = store();

        let mut handle = store.send(TestAction::IncrementTwiceLater).await.unwrap();
        handle.wait_with_timeout(Duration::from_secs(1)).await.unwrap();

        assert_eq!(handle.pending(), 0);
        assert_eq!(store.state(|s| s.value).await, 2);
    }

    #[tokio::test]
    async fn test_completed_handle() {
        let mut handle = EffectHandle::completed();
        handle.wait_with_timeout(Duration::from_millis(10)).await.unwrap();
    }

    #[tokio::test]
    async fn test_panicking_effect_still_completes_handle() {
        let store = store();

        let mut handle = store.send(TestAction::Panicking).await.unwrap();
        handle.wait_with_timeout(Duration::from_secs(1)).await.unwrap();

        // The store keeps working
        let _ = store.send(TestAction::Increment).await.unwrap();
        assert_eq!(store.state(|s| s.value).await, 1);
    }

    #[tokio::test]
    async fn test_send_and_wait_for() {
        let store = store();

        let action = store
            .send_and_wait_for(
                TestAction::IncrementLater,
                |a| matches!(a, TestAction::Increment),
                Duration::from_secs(1),
            )
            .await
            .unwrap();

        assert_eq!(action, TestAction::Increment);
    }

    #[tokio::test]
    async fn test_send_and_wait_for_times_out() {
        let store = store();

        let result = store
            .send_and_wait_for(
                TestAction::NoOp,
                |a| matches!(a, TestAction::Increment),
                Duration::from_millis(20),
            )
            .await;

        assert_eq!(result.unwrap_err(), StoreError::Timeout);
    }

    #[tokio::test]
    async fn test_subscribe_actions_sees_feedback_only() {
        let store = store();
        let mut rx = store.subscribe_actions();

        let _ = store.send(TestAction::Increment).await.unwrap();
        let mut handle = store.send(TestAction::IncrementLater).await.unwrap();
        handle.wait().await;

        assert_eq!(rx.recv().await.unwrap(), TestAction::Increment);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_shutdown_rejects_new_actions() {
        let store = store();
        store.shutdown(Duration::from_secs(1)).await.unwrap();

        let result = store.send(TestAction::Increment).await;
        assert_eq!(result.unwrap_err(), StoreError::ShutdownInProgress);
    }

    #[tokio::test]
    async fn test_shutdown_waits_for_pending_effects() {
        let store = store();
        let _ = store.send(TestAction::IncrementTwiceLater).await.unwrap();

        store.shutdown(Duration::from_secs(1)).await.unwrap();

        // Feedback arriving after shutdown started is dropped
        assert!(store.state(|s| s.value).await <= 2);
    }

    #[tokio::test]
    async fn test_cloned_store_shares_state_and_bus() {
        let store = store();
        let clone = store.clone();
        let log = record(&clone);

        let _ = store.send(TestAction::Increment).await.unwrap();

        assert_eq!(clone.state(|s| s.value).await, 1);
        assert_eq!(log.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_with_event_bus_uses_existing_subscribers() {
        let bus = EventBus::<TestEvent>::new();
        let seen = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&seen);
        bus.subscribe(Topic::Any, move |_: &TestEvent| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        let store = Store::with_event_bus(TestState::default(), TestReducer, TestEnv, bus)
            .with_broadcast_capacity(64);
        let _ = store.send(TestAction::Increment).await.unwrap();

        assert_eq!(seen.load(Ordering::SeqCst), 1);
    }
}
