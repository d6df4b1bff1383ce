//! # Helpdesk Runtime
//!
//! Runtime for the helpdesk controllers.
//!
//! This crate provides the Store runtime that coordinates reducer execution
//! and effect handling, plus the repeating timer that drives polling.
//!
//! ## Core Components
//!
//! - **Store**: Manages state and executes effects
//! - **Repeating Timer**: Cancellable scheduled task that dispatches an action on a fixed period
//! - **Health Check**: Readiness report for a dependency
//!
//! ## Example
//!
//! ```ignore
//! use helpdesk_runtime::Store;
//! use std::time::Duration;
//!
//! let store = Store::new(initial_state, my_reducer, environment);
//!
//! // Send an action
//! store.send(Action::DoSomething).await?;
//!
//! // Dispatch `Tick` every ten seconds until the handle is cancelled
//! let mut timer = store.schedule_repeating(Duration::from_secs(10), Action::Tick);
//!
//! // Read state
//! let value = store.state(|s| s.some_field).await;
//! timer.cancel();
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::watch;

/// Readiness reporting
pub mod health;

/// Prometheus metrics for observability
pub mod metrics;

/// The Store and its effect feedback loop
pub mod store;

/// Cancellable repeating timers
pub mod timer;

pub use health::{HealthCheck, HealthStatus};
pub use store::Store;
pub use timer::{RepeatingTimer, TimerHandle};

/// Error types for the Store runtime
pub mod error {
    use thiserror::Error;

    /// Errors that can occur during Store operations
    #[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
    pub enum StoreError {
        /// Store is closed and not accepting new actions
        ///
        /// Returned by `send()` after `close()`.
        #[error("Store is shutting down")]
        ShutdownInProgress,
    }
}

pub use error::StoreError;

/// Handle for tracking effect completion
///
/// Returned by [`Store::send()`]. Completes once every effect produced by
/// that action has finished, including applying any resulting action.
/// Effects of those follow-up actions are not tracked.
///
/// ```ignore
/// let mut handle = store.send(Action::Start).await?;
/// handle.wait().await;
/// ```
#[derive(Clone)]
pub struct EffectHandle {
    remaining: Arc<AtomicUsize>,
    done: watch::Receiver<()>,
}

impl EffectHandle {
    pub(crate) fn new() -> (Self, EffectTracking) {
        let remaining = Arc::new(AtomicUsize::new(0));
        let (notifier, done) = watch::channel(());

        let handle = Self {
            remaining: Arc::clone(&remaining),
            done,
        };
        let tracking = EffectTracking {
            remaining,
            notifier: Arc::new(notifier),
        };

        (handle, tracking)
    }

    /// Wait for all effects to complete
    pub async fn wait(&mut self) {
        while self.remaining.load(Ordering::Acquire) > 0 {
            if self.done.changed().await.is_err() {
                break;
            }
        }
    }
}

impl std::fmt::Debug for EffectHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EffectHandle")
            .field("pending_effects", &self.remaining.load(Ordering::Acquire))
            .finish_non_exhaustive()
    }
}

/// Per-action completion counter shared with the spawned effects
#[derive(Clone)]
pub(crate) struct EffectTracking {
    remaining: Arc<AtomicUsize>,
    notifier: Arc<watch::Sender<()>>,
}

impl EffectTracking {
    pub(crate) fn start(&self) {
        self.remaining.fetch_add(1, Ordering::AcqRel);
    }

    /// Guard that marks one effect finished when dropped, including by panic
    pub(crate) fn finish_on_drop(self) -> EffectFinished {
        EffectFinished(self)
    }
}

pub(crate) struct EffectFinished(EffectTracking);

impl Drop for EffectFinished {
    fn drop(&mut self) {
        if self.0.remaining.fetch_sub(1, Ordering::AcqRel) == 1 {
            let _ = self.0.notifier.send(());
        }
    }
}
