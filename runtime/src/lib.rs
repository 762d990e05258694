//! # Sabalitos Runtime
//!
//! Runtime implementation for the Sabalitos point-of-sale engine.
//!
//! This crate provides the Store runtime that coordinates reducer execution
//! and effect handling.
//!
//! ## Core Components
//!
//! - **Store**: Owns the state, runs the reducer, and executes effects
//! - **Effect Executor**: Spawns effect descriptions on tokio and feeds produced actions back
//! - **In-flight registry**: Tracks `Cancellable` effects by id so newer ones supersede older ones
//!
//! ## Example
//!
//! ```ignore
//! use sabalitos_runtime::Store;
//!
//! let store = Store::new(ShopState::new(), ShopReducer::new(), environment);
//!
//! // Send an action; state is updated before `send` returns
//! store.send(ShopAction::Load).await?;
//!
//! // Read state
//! let products = store.state(|s| s.catalog.len()).await;
//! ```

use futures::future::{self, BoxFuture};
use sabalitos_core::{
    effect::{Effect, EffectId},
    reducer::Reducer,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::{broadcast, watch, RwLock};
use tokio::task::{AbortHandle, JoinHandle};

/// Error types for the Store runtime
pub mod error {
    use thiserror::Error;

    /// Errors that can occur during Store operations
    #[derive(Error, Debug, Clone, PartialEq, Eq)]
    pub enum StoreError {
        /// Store is shutting down and not accepting new actions
        ///
        /// Returned when `send()` is called after shutdown was initiated.
        /// Effects already in flight keep feeding actions back until they finish.
        #[error("Store is shutting down")]
        ShutdownInProgress,

        /// Shutdown timed out waiting for effects to complete
        #[error("Shutdown timed out with {0} effects still running")]
        ShutdownTimeout(usize),

        /// Timeout waiting for effects tracked by an [`EffectHandle`](crate::EffectHandle)
        #[error("Timeout waiting for effects to complete")]
        Timeout,
    }
}

pub use error::StoreError;
pub use store::Store;

/// Handle for tracking effect completion
///
/// Returned by [`Store::send()`]. Tracking cascades: effects spawned by
/// actions that this action's effects fed back are counted too, so waiting
/// on the handle of a sale waits for the debounced flush it scheduled.
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

        let tracking = EffectTracking {
            counter,
            notifier: Arc::new(tx),
        };

        (handle, tracking)
    }

    /// Create a handle that's already complete
    #[must_use]
    pub fn completed() -> Self {
        let (handle, _tracking) = Self::new();
        handle
    }

    /// Number of tracked effects still running
    #[must_use]
    pub fn pending(&self) -> usize {
        self.effects.load(Ordering::SeqCst)
    }

    /// Wait for all tracked effects to complete
    ///
    /// Cancelled effects count as complete.
    pub async fn wait(&mut self) {
        while self.effects.load(Ordering::SeqCst) > 0 {
            if self.completion.changed().await.is_err() {
                // Every tracker is gone, nothing can still be running
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
            .field("pending_effects", &self.pending())
            .finish_non_exhaustive()
    }
}

/// Internal: effect tracking context passed through effect execution
#[derive(Clone)]
struct EffectTracking {
    counter: Arc<AtomicUsize>,
    notifier: Arc<watch::Sender<()>>,
}

impl EffectTracking {
    /// Count one more running effect; the returned guard un-counts it on drop
    fn guard(&self) -> DecrementGuard {
        self.counter.fetch_add(1, Ordering::SeqCst);
        DecrementGuard(self.clone())
    }

    fn decrement(&self) {
        if self.counter.fetch_sub(1, Ordering::SeqCst) == 1 {
            // Counter reached zero, notify waiters
            let _ = self.notifier.send(());
        }
    }
}

/// Internal: RAII guard that decrements effect counter on drop
///
/// Runs on completion, on panic, and when the task is aborted.
struct DecrementGuard(EffectTracking);

impl Drop for DecrementGuard {
    fn drop(&mut self) {
        self.0.decrement();
    }
}

/// Guard that decrements an atomic counter on drop (for shutdown tracking)
struct AtomicCounterGuard(Arc<AtomicUsize>);

impl AtomicCounterGuard {
    fn new(counter: &Arc<AtomicUsize>) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(Arc::clone(counter))
    }
}

impl Drop for AtomicCounterGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// An effect registered under an [`EffectId`]
struct InFlight {
    task: u64,
    abort: AbortHandle,
}

/// Store runtime for coordinating reducer execution and effect handling.
pub mod store {
    use super::{
        broadcast, future, Arc, AtomicBool, AtomicCounterGuard, AtomicU64, AtomicUsize,
        BoxFuture, Duration, Effect, EffectHandle, EffectId, EffectTracking, HashMap, InFlight,
        JoinHandle, Mutex, MutexGuard, Ordering, PoisonError, Reducer, RwLock, StoreError,
    };

    /// The Store - runtime coordinator for a reducer
    ///
    /// The Store manages:
    /// 1. State (behind `RwLock`; the reducer runs under the write lock)
    /// 2. Reducer (business logic)
    /// 3. Environment (injected dependencies)
    /// 4. Effect execution (with feedback loop and id-based cancellation)
    ///
    /// Cloning a Store is cheap and yields a handle to the same state.
    pub struct Store<S, A, E, R>
    where
        R: Reducer<State = S, Action = A, Environment = E>,
    {
        inner: Arc<StoreInner<S, A, E, R>>,
    }

    struct StoreInner<S, A, E, R> {
        state: RwLock<S>,
        reducer: R,
        environment: E,
        in_flight: Mutex<HashMap<EffectId, InFlight>>,
        next_task: AtomicU64,
        shutdown: AtomicBool,
        pending_effects: Arc<AtomicUsize>,
        /// Actions produced by effects, for observers (tests, UI bindings)
        action_broadcast: broadcast::Sender<A>,
    }

    impl<S, A, E, R> Clone for Store<S, A, E, R>
    where
        R: Reducer<State = S, Action = A, Environment = E>,
    {
        fn clone(&self) -> Self {
            Self {
                inner: Arc::clone(&self.inner),
            }
        }
    }

    impl<S, A, E, R> Store<S, A, E, R>
    where
        R: Reducer<State = S, Action = A, Environment = E> + Send + Sync + 'static,
        A: Send + Clone + 'static,
        S: Send + Sync + 'static,
        E: Send + Sync + 'static,
    {
        /// Create a new store with initial state, reducer, and environment
        ///
        /// The action broadcast channel buffers 16 actions; use
        /// [`Store::with_broadcast_capacity`] for chattier observers.
        #[must_use]
        pub fn new(initial_state: S, reducer: R, environment: E) -> Self {
            Self::with_broadcast_capacity(initial_state, reducer, environment, 16)
        }

        /// Create a new Store with custom action broadcast capacity
        #[must_use]
        pub fn with_broadcast_capacity(
            initial_state: S,
            reducer: R,
            environment: E,
            capacity: usize,
        ) -> Self {
            let (action_broadcast, _) = broadcast::channel(capacity.max(1));

            Self {
                inner: Arc::new(StoreInner {
                    state: RwLock::new(initial_state),
                    reducer,
                    environment,
                    in_flight: Mutex::new(HashMap::new()),
                    next_task: AtomicU64::new(0),
                    shutdown: AtomicBool::new(false),
                    pending_effects: Arc::new(AtomicUsize::new(0)),
                    action_broadcast,
                }),
            }
        }

        /// Send an action to the store
        ///
        /// 1. Acquires write lock on state
        /// 2. Calls reducer with (state, action, environment)
        /// 3. Spawns returned effects
        ///
        /// State changes are visible to readers as soon as this returns.
        /// Effects may still be running; use the returned [`EffectHandle`]
        /// to wait for them.
        ///
        /// # Errors
        ///
        /// Returns [`StoreError::ShutdownInProgress`] if the store is shutting down.
        #[tracing::instrument(skip(self, action), name = "store_send")]
        pub async fn send(&self, action: A) -> Result<EffectHandle, StoreError> {
            if self.inner.shutdown.load(Ordering::Acquire) {
                tracing::warn!("Rejected action: store is shutting down");
                return Err(StoreError::ShutdownInProgress);
            }

            let (handle, tracking) = EffectHandle::new();
            self.dispatch(action, &tracking).await;
            Ok(handle)
        }

        /// Read from the current state
        pub async fn state<F, T>(&self, f: F) -> T
        where
            F: FnOnce(&S) -> T,
        {
            let state = self.inner.state.read().await;
            f(&state)
        }

        /// Subscribe to actions produced by effects
        ///
        /// Actions sent directly through [`Store::send`] are not broadcast.
        #[must_use]
        pub fn subscribe_actions(&self) -> broadcast::Receiver<A> {
            self.inner.action_broadcast.subscribe()
        }

        /// Access the injected environment
        #[must_use]
        pub fn environment(&self) -> &E {
            &self.inner.environment
        }

        /// Number of effects currently running across all handles
        #[must_use]
        pub fn pending_effects(&self) -> usize {
            self.inner.pending_effects.load(Ordering::Acquire)
        }

        /// Whether a `Cancellable` effect with this id is still pending
        #[must_use]
        pub fn is_in_flight(&self, id: &EffectId) -> bool {
            self.lock_in_flight().contains_key(id)
        }

        /// Initiate graceful shutdown of the store
        ///
        /// New external actions are rejected immediately. Effects already
        /// running are allowed to finish, including pending debounced timers,
        /// so scheduled writes still land.
        ///
        /// # Errors
        ///
        /// Returns [`StoreError::ShutdownTimeout`] if the timeout expires before all
        /// pending effects complete.
        pub async fn shutdown(&self, timeout: Duration) -> Result<(), StoreError> {
            tracing::info!("Initiating graceful shutdown");
            metrics::counter!("store.shutdown.initiated").increment(1);

            self.inner.shutdown.store(true, Ordering::Release);

            let start = std::time::Instant::now();
            let poll_interval = Duration::from_millis(25);

            loop {
                let pending = self.pending_effects();

                if pending == 0 {
                    tracing::info!("All effects completed, shutdown successful");
                    return Ok(());
                }

                if start.elapsed() >= timeout {
                    tracing::error!(
                        pending_effects = pending,
                        "Shutdown timeout: {} effects still running", pending
                    );
                    metrics::counter!("store.shutdown.timeout").increment(1);
                    return Err(StoreError::ShutdownTimeout(pending));
                }

                tracing::debug!(
                    pending_effects = pending,
                    elapsed_ms = start.elapsed().as_millis(),
                    "Waiting for effects to complete"
                );

                tokio::time::sleep(poll_interval).await;
            }
        }

        /// Run the reducer and spawn its effects under `tracking`
        async fn dispatch(&self, action: A, tracking: &EffectTracking) {
            let effects = {
                let mut state = self.inner.state.write().await;
                self.inner
                    .reducer
                    .reduce(&mut state, action, &self.inner.environment)
            };
            metrics::counter!("store.actions.processed").increment(1);

            for effect in effects {
                self.execute(effect, tracking);
            }
        }

        /// Action produced by an effect: broadcast it, then reduce it
        ///
        /// Feedback bypasses the shutdown gate so in-flight work can finish.
        async fn feedback(&self, action: A, tracking: &EffectTracking) {
            let _ = self.inner.action_broadcast.send(action.clone());
            self.dispatch(action, tracking).await;
        }

        fn execute(&self, effect: Effect<A>, tracking: &EffectTracking) {
            match effect {
                Effect::None => {
                    tracing::trace!("Executing Effect::None (no-op)");
                },
                Effect::Cancellable { id, effect } => {
                    self.spawn_cancellable(id, *effect, tracking);
                },
                Effect::Cancel(id) => self.cancel(&id),
                other => {
                    let run = self.run(other, tracking.clone());
                    self.spawn_tracked(run, tracking);
                },
            }
        }

        /// Turn an effect description into a future that runs it to completion
        fn run(&self, effect: Effect<A>, tracking: EffectTracking) -> BoxFuture<'static, ()> {
            match effect {
                Effect::None => Box::pin(future::ready(())),
                Effect::Future(fut) => {
                    metrics::counter!("store.effects.executed", "type" => "future").increment(1);
                    let store = self.clone();
                    Box::pin(async move {
                        if let Some(action) = fut.await {
                            tracing::trace!("Effect::Future produced an action, sending to store");
                            store.feedback(action, &tracking).await;
                        } else {
                            tracing::trace!("Effect::Future completed with no action");
                        }
                    })
                },
                Effect::Delay { duration, action } => {
                    metrics::counter!("store.effects.executed", "type" => "delay").increment(1);
                    let store = self.clone();
                    Box::pin(async move {
                        tokio::time::sleep(duration).await;
                        tracing::trace!(?duration, "Effect::Delay elapsed, sending action");
                        store.feedback(*action, &tracking).await;
                    })
                },
                Effect::Parallel(effects) => {
                    metrics::counter!("store.effects.executed", "type" => "parallel").increment(1);
                    let runs: Vec<_> = effects
                        .into_iter()
                        .map(|effect| self.run(effect, tracking.clone()))
                        .collect();
                    Box::pin(async move {
                        future::join_all(runs).await;
                    })
                },
                Effect::Sequential(effects) => {
                    metrics::counter!("store.effects.executed", "type" => "sequential").increment(1);
                    let store = self.clone();
                    Box::pin(async move {
                        for effect in effects {
                            store.run(effect, tracking.clone()).await;
                        }
                    })
                },
                Effect::Cancellable { id, effect } => {
                    // Registered now; runs detached from the enclosing group
                    self.spawn_cancellable(id, *effect, &tracking);
                    Box::pin(future::ready(()))
                },
                Effect::Cancel(id) => {
                    self.cancel(&id);
                    Box::pin(future::ready(()))
                },
            }
        }

        fn spawn_tracked(
            &self,
            run: BoxFuture<'static, ()>,
            tracking: &EffectTracking,
        ) -> JoinHandle<()> {
            // Guards are moved into the task so they drop even if it is aborted before its first poll
            let guard = tracking.guard();
            let pending = AtomicCounterGuard::new(&self.inner.pending_effects);

            tokio::spawn(async move {
                let _guard = guard;
                let _pending = pending;
                run.await;
            })
        }

        fn spawn_cancellable(&self, id: EffectId, effect: Effect<A>, tracking: &EffectTracking) {
            let task = self.inner.next_task.fetch_add(1, Ordering::Relaxed);
            let run = self.run(effect, tracking.clone());
            let store = self.clone();
            let key = id.clone();

            // Hold the registry lock across spawn + insert so the task cannot
            // deregister itself before it is registered
            let mut in_flight = self.lock_in_flight();
            let handle = self.spawn_tracked(
                Box::pin(async move {
                    run.await;
                    store.finish(&key, task);
                }),
                tracking,
            );

            let entry = InFlight {
                task,
                abort: handle.abort_handle(),
            };
            if let Some(previous) = in_flight.insert(id.clone(), entry) {
                previous.abort.abort();
                metrics::counter!("store.effects.cancelled").increment(1);
                tracing::debug!(effect_id = %id, "Superseded in-flight effect");
            }
        }

        fn cancel(&self, id: &EffectId) {
            if let Some(entry) = self.lock_in_flight().remove(id) {
                entry.abort.abort();
                metrics::counter!("store.effects.cancelled").increment(1);
                tracing::debug!(effect_id = %id, "Cancelled in-flight effect");
            }
        }

        /// Deregister a finished cancellable effect unless a newer one took its id
        fn finish(&self, id: &EffectId, task: u64) {
            let mut in_flight = self.lock_in_flight();
            if in_flight.get(id).is_some_and(|entry| entry.task == task) {
                in_flight.remove(id);
            }
        }

        fn lock_in_flight(&self) -> MutexGuard<'_, HashMap<EffectId, InFlight>> {
            // The map stays consistent even if a holder panicked
            self.inner
                .in_flight
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use sabalitos_core::{debounce, effect::Effect, reducer::Reducer, smallvec, SmallVec};

    #[derive(Debug, Clone, Default)]
    struct TestState {
        value: i32,
        flushes: u32,
    }

    #[derive(Debug, Clone)]
    enum TestAction {
        Increment,
        Decrement,
        ProduceEffect,
        ProduceDelayedAction,
        ProduceParallelEffects,
        ProduceSequentialEffects,
        ScheduleFlush,
        CancelFlush,
        Flush,
    }

    #[derive(Debug, Clone)]
    struct TestReducer;

    const FLUSH_DELAY: Duration = Duration::from_millis(200);

    impl Reducer for TestReducer {
        type State = TestState;
        type Action = TestAction;
        type Environment = ();

        fn reduce(
            &self,
            state: &mut Self::State,
            action: Self::Action,
            _env: &Self::Environment,
        ) -> SmallVec<[Effect<Self::Action>; 4]> {
            match action {
                TestAction::Increment => {
                    state.value += 1;
                    smallvec![Effect::None]
                },
                TestAction::Decrement => {
                    state.value -= 1;
                    smallvec![Effect::None]
                },
                TestAction::ProduceEffect => {
                    smallvec![Effect::Future(Box::pin(async { Some(TestAction::Increment) }))]
                },
                TestAction::ProduceDelayedAction => smallvec![Effect::Delay {
                    duration: Duration::from_millis(10),
                    action: Box::new(TestAction::Increment),
                }],
                TestAction::ProduceParallelEffects => smallvec![Effect::Parallel(vec![
                    Effect::Future(Box::pin(async { Some(TestAction::Increment) })),
                    Effect::Future(Box::pin(async { Some(TestAction::Increment) })),
                    Effect::Future(Box::pin(async { Some(TestAction::Increment) })),
                ])],
                TestAction::ProduceSequentialEffects => smallvec![Effect::Sequential(vec![
                    Effect::Future(Box::pin(async { Some(TestAction::Increment) })),
                    Effect::Future(Box::pin(async { Some(TestAction::Increment) })),
                    Effect::Future(Box::pin(async { Some(TestAction::Decrement) })),
                ])],
                TestAction::ScheduleFlush => smallvec![debounce! {
                    id: "flush",
                    duration: FLUSH_DELAY,
                    action: TestAction::Flush
                }],
                TestAction::CancelFlush => {
                    smallvec![Effect::Cancel(EffectId::from_static("flush"))]
                },
                TestAction::Flush => {
                    state.flushes += 1;
                    SmallVec::new()
                },
            }
        }
    }

    fn store() -> Store<TestState, TestAction, (), TestReducer> {
        Store::new(TestState::default(), TestReducer, ())
    }

    #[tokio::test]
    async fn test_send_updates_state_before_returning() {
        let store = store();

        store.send(TestAction::Increment).await.unwrap();
        store.send(TestAction::Increment).await.unwrap();
        store.send(TestAction::Decrement).await.unwrap();

        assert_eq!(store.state(|s| s.value).await, 1);
    }

    #[tokio::test]
    async fn test_effect_future_feeds_back() {
        let store = store();
        let mut rx = store.subscribe_actions();

        let mut handle = store.send(TestAction::ProduceEffect).await.unwrap();
        handle.wait_with_timeout(Duration::from_secs(1)).await.unwrap();

        assert_eq!(store.state(|s| s.value).await, 1);
        assert!(matches!(rx.recv().await.unwrap(), TestAction::Increment));
    }

    #[tokio::test]
    async fn test_effect_delay() {
        let store = store();

        let mut handle = store.send(TestAction::ProduceDelayedAction).await.unwrap();
        assert_eq!(store.state(|s| s.value).await, 0);

        handle.wait_with_timeout(Duration::from_secs(1)).await.unwrap();
        assert_eq!(store.state(|s| s.value).await, 1);
    }

    #[tokio::test]
    async fn test_effect_parallel_and_sequential() {
        let store = store();

        let mut parallel = store.send(TestAction::ProduceParallelEffects).await.unwrap();
        parallel.wait_with_timeout(Duration::from_secs(1)).await.unwrap();
        assert_eq!(store.state(|s| s.value).await, 3);

        let mut sequential = store.send(TestAction::ProduceSequentialEffects).await.unwrap();
        sequential.wait_with_timeout(Duration::from_secs(1)).await.unwrap();
        assert_eq!(store.state(|s| s.value).await, 4);
    }

    #[tokio::test]
    async fn test_cancellable_effects_supersede_by_id() {
        let store = store();

        let mut first = store.send(TestAction::ScheduleFlush).await.unwrap();
        store.send(TestAction::ScheduleFlush).await.unwrap();
        let mut last = store.send(TestAction::ScheduleFlush).await.unwrap();
        assert!(store.is_in_flight(&EffectId::from_static("flush")));

        // The superseded handle completes once its task is aborted
        first.wait_with_timeout(Duration::from_secs(1)).await.unwrap();
        last.wait_with_timeout(Duration::from_secs(2)).await.unwrap();

        assert_eq!(store.state(|s| s.flushes).await, 1);
        assert!(!store.is_in_flight(&EffectId::from_static("flush")));
    }

    #[tokio::test]
    async fn test_cancel_aborts_pending_effect() {
        let store = store();

        let mut scheduled = store.send(TestAction::ScheduleFlush).await.unwrap();
        store.send(TestAction::CancelFlush).await.unwrap();

        scheduled.wait_with_timeout(Duration::from_secs(1)).await.unwrap();
        tokio::time::sleep(FLUSH_DELAY + Duration::from_millis(50)).await;

        assert_eq!(store.state(|s| s.flushes).await, 0);
        assert_eq!(store.pending_effects(), 0);
    }

    #[tokio::test]
    async fn test_shutdown_lets_pending_effects_finish() {
        let store = store();

        store.send(TestAction::ScheduleFlush).await.unwrap();
        store.shutdown(Duration::from_secs(2)).await.unwrap();

        assert_eq!(store.state(|s| s.flushes).await, 1);
        assert_eq!(
            store.send(TestAction::Increment).await.unwrap_err(),
            StoreError::ShutdownInProgress
        );
    }

    #[tokio::test]
    async fn test_shutdown_times_out_with_pending_effects() {
        let store = store();

        store.send(TestAction::ScheduleFlush).await.unwrap();
        let result = store.shutdown(Duration::from_millis(10)).await;

        assert_eq!(result, Err(StoreError::ShutdownTimeout(1)));
    }

    #[tokio::test]
    async fn test_completed_handle() {
        let mut handle = EffectHandle::completed();
        assert_eq!(handle.pending(), 0);
        handle.wait_with_timeout(Duration::from_millis(10)).await.unwrap();
    }

    #[tokio::test]
    #[allow(clippy::panic)]
    async fn test_concurrent_sends() {
        let store = store();

        let handles: Vec<_> = (0..10)
            .map(|_| {
                let store = store.clone();
                tokio::spawn(async move {
                    let _ = store.send(TestAction::Increment).await;
                })
            })
            .collect();

        for handle in handles {
            if let Err(e) = handle.await {
                panic!("concurrent send task panicked: {e}");
            }
        }

        assert_eq!(store.state(|s| s.value).await, 10);
    }
}
