//! Polling ticket list.
//!
//! Shows a snapshot of the owner's tickets and replaces it with a fresh one
//! on a fixed interval. At most one poll is in flight; a tick that arrives
//! while one is running is dropped, not queued.
//!
//! ```text
//!            Tick                    TicketsLoaded
//!   Idle ───────────▶ Refreshing ─────────────────▶ Idle
//!    ▲                    │
//!    │ Tick               │ LoadFailed
//!    └──── Error ◀────────┘
//! ```

use crate::api::TicketApi;
use crate::config::PollingConfig;
use crate::types::Ticket;
use helpdesk_core::{SmallVec, async_effect, effect::Effect, reducer::Reducer, smallvec};
use helpdesk_runtime::{Store, StoreError, TimerHandle};
use std::sync::Arc;
use tokio::sync::broadcast;

/// Banner shown after a failed poll
pub const POLL_FAILURE_MESSAGE: &str = "Failed to load latest tickets. Please refresh the page.";

/// What the list currently shows
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollingListState {
    /// Showing a snapshot, no poll running
    Idle {
        /// Current snapshot
        tickets: Vec<Ticket>,
    },
    /// A poll is in flight; the previous snapshot stays visible
    Refreshing {
        /// Current snapshot
        tickets: Vec<Ticket>,
    },
    /// The last poll failed; the previous snapshot stays visible
    Error {
        /// Current snapshot
        tickets: Vec<Ticket>,
        /// Banner text
        message: String,
    },
}

impl PollingListState {
    /// Idle with `tickets`
    #[must_use]
    pub const fn new(tickets: Vec<Ticket>) -> Self {
        Self::Idle { tickets }
    }

    /// The snapshot on display
    #[must_use]
    pub fn tickets(&self) -> &[Ticket] {
        match self {
            Self::Idle { tickets } | Self::Refreshing { tickets } | Self::Error { tickets, .. } => {
                tickets
            },
        }
    }

    /// Whether a poll is in flight
    #[must_use]
    pub const fn is_refreshing(&self) -> bool {
        matches!(self, Self::Refreshing { .. })
    }

    /// Banner text, if the last poll failed
    #[must_use]
    pub fn error_message(&self) -> Option<&str> {
        match self {
            Self::Error { message, .. } => Some(message),
            _ => None,
        }
    }

    fn tickets_mut(&mut self) -> &mut Vec<Ticket> {
        match self {
            Self::Idle { tickets } | Self::Refreshing { tickets } | Self::Error { tickets, .. } => {
                tickets
            },
        }
    }

    fn take_tickets(&mut self) -> Vec<Ticket> {
        std::mem::take(self.tickets_mut())
    }
}

impl Default for PollingListState {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

/// Inputs of the polling list
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollingListAction {
    /// The poll timer fired
    Tick,
    /// A poll returned a fresh snapshot
    TicketsLoaded {
        /// The new snapshot
        tickets: Vec<Ticket>,
    },
    /// A poll failed
    LoadFailed {
        /// Error detail, for logs only
        message: String,
    },
    /// The parent supplied a new snapshot (e.g. after a full re-render)
    SnapshotReset {
        /// The new snapshot
        tickets: Vec<Ticket>,
    },
}

/// Dependencies of the polling list
#[derive(Clone)]
pub struct PollingListEnvironment {
    /// Where snapshots come from
    pub api: Arc<dyn TicketApi>,
}

impl PollingListEnvironment {
    /// Environment polling `api`
    #[must_use]
    pub fn new(api: Arc<dyn TicketApi>) -> Self {
        Self { api }
    }
}

/// State machine of the polling list
#[derive(Debug, Clone, Copy, Default)]
pub struct PollingListReducer;

impl Reducer for PollingListReducer {
    type State = PollingListState;
    type Action = PollingListAction;
    type Environment = PollingListEnvironment;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        match action {
            PollingListAction::Tick => {
                if state.is_refreshing() {
                    tracing::trace!("Poll still in flight, tick dropped");
                    return SmallVec::new();
                }

                let tickets = state.take_tickets();
                *state = PollingListState::Refreshing { tickets };

                let api = Arc::clone(&env.api);
                smallvec![async_effect! {
                    match api.list_tickets().await {
                        Ok(tickets) => Some(PollingListAction::TicketsLoaded { tickets }),
                        Err(error) => Some(PollingListAction::LoadFailed {
                            message: error.to_string(),
                        }),
                    }
                }]
            },

            PollingListAction::TicketsLoaded { tickets } => {
                tracing::debug!(count = tickets.len(), "Ticket snapshot refreshed");
                *state = PollingListState::Idle { tickets };
                SmallVec::new()
            },

            PollingListAction::LoadFailed { message } => {
                tracing::warn!(error = %message, "Failed to poll tickets");
                let tickets = state.take_tickets();
                *state = PollingListState::Error {
                    tickets,
                    message: POLL_FAILURE_MESSAGE.to_string(),
                };
                SmallVec::new()
            },

            // Phase is kept; a poll in flight still overwrites this when it lands
            PollingListAction::SnapshotReset { tickets } => {
                *state.tickets_mut() = tickets;
                SmallVec::new()
            },
        }
    }
}

/// Store running the polling list
pub type PollingListStore =
    Store<PollingListState, PollingListAction, PollingListEnvironment, PollingListReducer>;

/// A mounted polling list
///
/// Mounting starts the poll timer; the first poll happens one interval after
/// mount. Unmounting (or dropping) stops the timer and discards any poll
/// result that arrives afterwards.
pub struct PollingListController {
    store: PollingListStore,
    timer: Option<TimerHandle>,
}

impl PollingListController {
    /// Show `initial` and start polling through `env`
    ///
    /// Must be called inside a tokio runtime.
    #[must_use]
    pub fn mount(initial: Vec<Ticket>, env: PollingListEnvironment, config: PollingConfig) -> Self {
        let store = Store::new(PollingListState::new(initial), PollingListReducer, env);
        let timer = store.schedule_repeating(config.interval, PollingListAction::Tick);
        tracing::debug!(interval = ?config.interval, "Polling list mounted");

        Self {
            store,
            timer: Some(timer),
        }
    }

    /// Copy of the current state
    pub async fn state(&self) -> PollingListState {
        self.store.state(Clone::clone).await
    }

    /// The snapshot on display
    pub async fn tickets(&self) -> Vec<Ticket> {
        self.store.state(|s| s.tickets().to_vec()).await
    }

    /// Whether a poll is in flight
    pub async fn is_refreshing(&self) -> bool {
        self.store.state(PollingListState::is_refreshing).await
    }

    /// Banner text, if the last poll failed
    pub async fn error_message(&self) -> Option<String> {
        self.store
            .state(|s| s.error_message().map(str::to_string))
            .await
    }

    /// Replace the snapshot with one supplied by the parent
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownInProgress`] after unmount.
    pub async fn reset_snapshot(&self, tickets: Vec<Ticket>) -> Result<(), StoreError> {
        self.store
            .send(PollingListAction::SnapshotReset { tickets })
            .await
            .map(|_| ())
    }

    /// Poll results as they are applied
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<PollingListAction> {
        self.store.subscribe_actions()
    }

    /// Whether the controller is still mounted
    #[must_use]
    pub fn is_mounted(&self) -> bool {
        !self.store.is_closed()
    }

    /// Stop polling and ignore any result still in flight. Idempotent.
    pub fn unmount(&mut self) {
        if let Some(mut timer) = self.timer.take() {
            timer.cancel();
        }
        if !self.store.is_closed() {
            self.store.close();
            tracing::debug!("Polling list unmounted");
        }
    }
}

impl Drop for PollingListController {
    fn drop(&mut self) {
        self.unmount();
    }
}
