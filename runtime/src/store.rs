//! Store runtime for coordinating reducer execution and effect handling.

use crate::metrics::StoreMetrics;
use crate::timer::{RepeatingTimer, TimerHandle};
use crate::{EffectHandle, EffectTracking, StoreError};
use helpdesk_core::{effect::Effect, reducer::Reducer};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::{RwLock, broadcast};

/// Feedback actions buffered per subscriber before it starts lagging
const FEEDBACK_CAPACITY: usize = 16;

/// Decrements the store-wide in-flight counter when an effect task ends,
/// including by panic
struct InFlightGuard(Arc<AtomicUsize>);

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::AcqRel);
    }
}

/// The Store - runtime coordinator for a reducer
///
/// The Store manages:
/// 1. State (behind `RwLock` for concurrent access)
/// 2. Reducer (controller logic)
/// 3. Environment (injected dependencies)
/// 4. Effect execution (with feedback loop)
///
/// Once closed, the store rejects new actions, never starts an effect that
/// has not begun running, and drops actions produced by effects that were
/// already in flight.
pub struct Store<S, A, E, R>
where
    R: Reducer<State = S, Action = A, Environment = E>,
{
    state: Arc<RwLock<S>>,
    reducer: R,
    environment: E,
    closed: Arc<AtomicBool>,
    in_flight: Arc<AtomicUsize>,
    feedback: broadcast::Sender<A>,
}

impl<S, A, E, R> Store<S, A, E, R>
where
    R: Reducer<State = S, Action = A, Environment = E> + Clone + Send + Sync + 'static,
    A: Send + Sync + Clone + 'static,
    S: Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    /// Create a new store with initial state, reducer, and environment
    #[must_use]
    pub fn new(initial_state: S, reducer: R, environment: E) -> Self {
        let (feedback, _) = broadcast::channel(FEEDBACK_CAPACITY);

        Self {
            state: Arc::new(RwLock::new(initial_state)),
            reducer,
            environment,
            closed: Arc::new(AtomicBool::new(false)),
            in_flight: Arc::new(AtomicUsize::new(0)),
            feedback,
        }
    }

    /// Send an action to the store
    ///
    /// Runs the reducer under the state write lock, then spawns the effects
    /// it returned. Returns once they are spawned, not completed.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownInProgress`] if the store is closed,
    /// including when it closed while this call waited for the lock.
    #[tracing::instrument(skip(self, action), name = "store_send")]
    pub async fn send(&self, action: A) -> Result<EffectHandle, StoreError> {
        if self.is_closed() {
            return Err(self.rejected());
        }

        let effects = {
            let mut state = self.state.write().await;
            if self.is_closed() {
                return Err(self.rejected());
            }

            let start = std::time::Instant::now();
            let effects = self.reducer.reduce(&mut *state, action, &self.environment);
            StoreMetrics::record_action(start.elapsed());
            effects
        };

        tracing::trace!(effects = effects.len(), "Reducer completed");

        let (handle, tracking) = EffectHandle::new();
        for effect in effects {
            self.spawn_effect(effect, tracking.clone());
        }

        Ok(handle)
    }

    fn rejected(&self) -> StoreError {
        tracing::debug!("Rejected action: store is closed");
        StoreMetrics::record_rejected();
        StoreError::ShutdownInProgress
    }

    /// Read current state via a closure
    ///
    /// ```ignore
    /// let ticket_count = store.state(|s| s.tickets().len()).await;
    /// ```
    pub async fn state<F, T>(&self, f: F) -> T
    where
        F: FnOnce(&S) -> T,
    {
        let state = self.state.read().await;
        f(&*state)
    }

    /// Subscribe to actions produced by effects
    ///
    /// An action is published after the reducer has applied it, so state read
    /// on receipt already reflects it. Actions passed to `send()` directly are
    /// not published.
    #[must_use]
    pub fn subscribe_actions(&self) -> broadcast::Receiver<A> {
        self.feedback.subscribe()
    }

    /// Dispatch `action` every `period`, starting one period from now
    ///
    /// The timer stops on its own once the store is closed.
    #[must_use]
    pub fn schedule_repeating(&self, period: Duration, action: A) -> TimerHandle {
        let store = self.clone();
        RepeatingTimer::new(period).start(move || {
            let store = store.clone();
            let action = action.clone();
            async move { store.send(action).await.is_ok() }
        })
    }

    /// Whether the store has been closed
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Number of effects currently running
    #[must_use]
    pub fn pending_effects(&self) -> usize {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Close the store without waiting for in-flight effects
    ///
    /// New actions are rejected and effects not yet started never run.
    /// Effects already running are left to finish, but any action they
    /// produce is dropped. Idempotent.
    pub fn close(&self) {
        if !self.closed.swap(true, Ordering::AcqRel) {
            tracing::debug!(
                pending_effects = self.pending_effects(),
                "Store closed, discarding in-flight results"
            );
        }
    }

    fn spawn_effect(&self, effect: Effect<A>, tracking: EffectTracking) {
        let Some(fut) = effect.into_future() else {
            StoreMetrics::record_effect("none");
            return;
        };

        tracking.start();
        self.in_flight.fetch_add(1, Ordering::AcqRel);
        let in_flight = InFlightGuard(Arc::clone(&self.in_flight));
        let store = self.clone();

        tokio::spawn(async move {
            let _done = tracking.finish_on_drop();
            let _in_flight = in_flight;

            if store.is_closed() {
                tracing::trace!("Store closed before effect started, skipping it");
                StoreMetrics::record_dropped();
                return;
            }

            StoreMetrics::record_effect("future");
            match fut.await {
                Some(action) => store.feed_back(action).await,
                None => tracing::trace!("Effect completed with no action"),
            }
        });
    }

    async fn feed_back(&self, action: A) {
        if self.is_closed() {
            tracing::trace!("Dropping effect result: store is closed");
            StoreMetrics::record_dropped();
            return;
        }

        match self.send(action.clone()).await {
            Ok(_) => {
                let _ = self.feedback.send(action);
            },
            Err(error) => tracing::trace!(%error, "Effect result rejected by store"),
        }
    }
}

impl<S, A, E, R> Clone for Store<S, A, E, R>
where
    R: Reducer<State = S, Action = A, Environment = E> + Clone,
    E: Clone,
{
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
            reducer: self.reducer.clone(),
            environment: self.environment.clone(),
            closed: Arc::clone(&self.closed),
            in_flight: Arc::clone(&self.in_flight),
            feedback: self.feedback.clone(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use helpdesk_core::{SmallVec, async_effect, smallvec};

    #[derive(Debug, Clone, Default)]
    struct CounterState {
        value: i32,
    }

    #[derive(Debug, Clone, PartialEq)]
    enum CounterAction {
        Increment,
        Fetch,
        FetchSlowly,
    }

    #[derive(Debug, Clone, Default)]
    struct CounterEnv {
        fetches_started: Arc<AtomicUsize>,
    }

    #[derive(Debug, Clone)]
    struct CounterReducer;

    impl Reducer for CounterReducer {
        type State = CounterState;
        type Action = CounterAction;
        type Environment = CounterEnv;

        fn reduce(
            &self,
            state: &mut Self::State,
            action: Self::Action,
            env: &Self::Environment,
        ) -> SmallVec<[Effect<Self::Action>; 4]> {
            match action {
                CounterAction::Increment => {
                    state.value += 1;
                    SmallVec::new()
                },
                CounterAction::Fetch => {
                    let started = Arc::clone(&env.fetches_started);
                    smallvec![async_effect! {
                        started.fetch_add(1, Ordering::SeqCst);
                        Some(CounterAction::Increment)
                    }]
                },
                CounterAction::FetchSlowly => {
                    let started = Arc::clone(&env.fetches_started);
                    smallvec![async_effect! {
                        started.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_secs(5)).await;
                        Some(CounterAction::Increment)
                    }]
                },
            }
        }
    }

    type CounterStore = Store<CounterState, CounterAction, CounterEnv, CounterReducer>;

    fn store() -> (CounterStore, Arc<AtomicUsize>) {
        let env = CounterEnv::default();
        let started = Arc::clone(&env.fetches_started);
        (Store::new(CounterState::default(), CounterReducer, env), started)
    }

    #[tokio::test]
    async fn send_applies_reducer() {
        let (store, _) = store();
        store.send(CounterAction::Increment).await.unwrap();
        assert_eq!(store.state(|s| s.value).await, 1);
    }

    #[tokio::test]
    async fn future_effect_feeds_action_back() {
        let (store, started) = store();
        let mut handle = store.send(CounterAction::Fetch).await.unwrap();
        handle.wait().await;

        assert_eq!(store.state(|s| s.value).await, 1);
        assert_eq!(started.load(Ordering::SeqCst), 1);
        assert_eq!(store.pending_effects(), 0);
    }

    #[tokio::test]
    async fn closed_store_rejects_actions() {
        let (store, _) = store();
        store.close();
        assert!(matches!(
            store.send(CounterAction::Increment).await,
            Err(StoreError::ShutdownInProgress)
        ));
    }

    #[tokio::test]
    async fn close_while_waiting_for_the_lock_rejects_the_action() {
        let (store, _) = store();
        let guard = store.state.write().await;
        let sender = {
            let store = store.clone();
            tokio::spawn(async move { store.send(CounterAction::Increment).await })
        };

        // Let the sender pass the first check and queue on the lock
        tokio::task::yield_now().await;
        store.close();
        drop(guard);

        assert!(matches!(sender.await.unwrap(), Err(StoreError::ShutdownInProgress)));
        assert_eq!(store.state(|s| s.value).await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn effect_spawned_before_close_never_starts() {
        let (store, started) = store();

        // The spawned task cannot run before this task yields
        store.send(CounterAction::Fetch).await.unwrap();
        store.close();
        tokio::time::sleep(Duration::from_secs(1)).await;

        assert_eq!(started.load(Ordering::SeqCst), 0);
        assert_eq!(store.state(|s| s.value).await, 0);
        assert_eq!(store.pending_effects(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn results_arriving_after_close_are_dropped() {
        let (store, started) = store();
        let mut observer = store.subscribe_actions();
        store.send(CounterAction::FetchSlowly).await.unwrap();

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(started.load(Ordering::SeqCst), 1);
        store.close();
        tokio::time::sleep(Duration::from_secs(10)).await;

        assert_eq!(store.state(|s| s.value).await, 0);
        assert!(observer.try_recv().is_err());
        assert_eq!(store.pending_effects(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn broadcast_feedback_is_already_applied() {
        let (store, _) = store();
        let mut observer = store.subscribe_actions();

        for expected in 1..=50 {
            store.send(CounterAction::Fetch).await.unwrap();
            assert_eq!(observer.recv().await.unwrap(), CounterAction::Increment);
            assert_eq!(store.state(|s| s.value).await, expected);
        }
    }
}
