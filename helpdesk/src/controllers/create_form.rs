//! Create-ticket form.
//!
//! Submits the form through [`TicketApi`], suppresses duplicate submits while
//! one is in flight and navigates back to the list once the ticket exists.

use crate::api::TicketApi;
use crate::services::CreateTicketOutcome;
use crate::types::{FieldErrors, TicketForm};
use helpdesk_core::{SmallVec, async_effect, effect::Effect, reducer::Reducer, smallvec};
use helpdesk_runtime::{EffectHandle, Store, StoreError};
use std::sync::Arc;
use std::time::Duration;

/// Where the form can send the user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    /// The ticket list
    TicketList,
    /// Wherever the user came from
    Back,
}

impl Route {
    /// Dashboard path of the route, if it has a fixed one
    #[must_use]
    pub const fn path(self) -> Option<&'static str> {
        match self {
            Self::TicketList => Some("/dashboard/tickets"),
            Self::Back => None,
        }
    }
}

/// Performs navigation requested by the form
pub trait Navigator: Send + Sync {
    /// Open `route`
    fn navigate(&self, route: Route);
}

/// Phase of the form
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum CreateFormState {
    /// Waiting for input
    #[default]
    Editing,
    /// A create call is in flight
    Submitting,
    /// The ticket was created
    Succeeded,
    /// The server rejected some fields
    FailedValidation {
        /// Messages per field
        field_errors: FieldErrors,
        /// Summary message
        message: String,
    },
    /// Not signed in, or the server failed
    FailedOther {
        /// Message to show
        message: String,
    },
}

impl CreateFormState {
    /// Whether the submit button is active
    #[must_use]
    pub const fn is_submit_enabled(&self) -> bool {
        !matches!(self, Self::Submitting | Self::Succeeded)
    }

    /// Whether a create call is in flight
    #[must_use]
    pub const fn is_submitting(&self) -> bool {
        matches!(self, Self::Submitting)
    }

    /// Message of a failed submission
    #[must_use]
    pub fn message(&self) -> Option<&str> {
        match self {
            Self::FailedValidation { message, .. } | Self::FailedOther { message } => Some(message),
            _ => None,
        }
    }

    /// Messages shown next to `field`
    #[must_use]
    pub fn field_errors(&self, field: &str) -> &[String] {
        match self {
            Self::FailedValidation { field_errors, .. } => {
                field_errors.get(field).unwrap_or_default()
            },
            _ => &[],
        }
    }
}

/// Inputs of the form
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CreateFormAction {
    /// The user pressed submit
    Submit {
        /// Form contents
        form: TicketForm,
    },
    /// The user pressed cancel
    Cancel,
    /// The create call returned
    SubmissionCompleted {
        /// What the server did
        outcome: CreateTicketOutcome,
    },
}

/// Dependencies of the form
#[derive(Clone)]
pub struct CreateFormEnvironment {
    /// Where tickets are created
    pub api: Arc<dyn TicketApi>,
    /// Where navigation goes
    pub navigator: Arc<dyn Navigator>,
}

impl CreateFormEnvironment {
    /// Environment creating through `api` and navigating with `navigator`
    #[must_use]
    pub fn new(api: Arc<dyn TicketApi>, navigator: Arc<dyn Navigator>) -> Self {
        Self { api, navigator }
    }
}

fn navigate(navigator: &Arc<dyn Navigator>, route: Route) -> Effect<CreateFormAction> {
    let navigator = Arc::clone(navigator);
    async_effect! {
        navigator.navigate(route);
        None
    }
}

/// State machine of the form
#[derive(Debug, Clone, Copy, Default)]
pub struct CreateFormReducer;

impl Reducer for CreateFormReducer {
    type State = CreateFormState;
    type Action = CreateFormAction;
    type Environment = CreateFormEnvironment;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        match action {
            CreateFormAction::Submit { form } => {
                if !state.is_submit_enabled() {
                    tracing::debug!(?state, "Duplicate submit ignored");
                    return SmallVec::new();
                }

                *state = CreateFormState::Submitting;
                let api = Arc::clone(&env.api);
                smallvec![async_effect! {
                    let outcome = api.create_ticket(form).await;
                    Some(CreateFormAction::SubmissionCompleted { outcome })
                }]
            },

            CreateFormAction::Cancel => {
                if state.is_submitting() {
                    tracing::debug!("Cancel ignored while submitting");
                    return SmallVec::new();
                }
                smallvec![navigate(&env.navigator, Route::Back)]
            },

            CreateFormAction::SubmissionCompleted { outcome } => match outcome {
                CreateTicketOutcome::Created { ticket, .. } => {
                    tracing::info!(ticket_id = %ticket.id, "Ticket created");
                    *state = CreateFormState::Succeeded;
                    smallvec![navigate(&env.navigator, Route::TicketList)]
                },
                CreateTicketOutcome::Invalid { errors, message } => {
                    *state = CreateFormState::FailedValidation {
                        field_errors: errors,
                        message,
                    };
                    SmallVec::new()
                },
                CreateTicketOutcome::Unauthenticated { message }
                | CreateTicketOutcome::Failed { message } => {
                    tracing::warn!(%message, "Ticket creation failed");
                    *state = CreateFormState::FailedOther { message };
                    SmallVec::new()
                },
            },
        }
    }
}

/// Store running the form
pub type CreateFormStore =
    Store<CreateFormState, CreateFormAction, CreateFormEnvironment, CreateFormReducer>;

/// A mounted create-ticket form
///
/// Dropping the controller discards the result of a submission still in
/// flight; the create call itself is not aborted.
pub struct CreateFormController {
    store: CreateFormStore,
}

impl CreateFormController {
    /// Empty form working against `env`
    #[must_use]
    pub fn new(env: CreateFormEnvironment) -> Self {
        Self {
            store: Store::new(CreateFormState::default(), CreateFormReducer, env),
        }
    }

    /// Submit `form`
    ///
    /// The returned handle completes once the outcome has been applied.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownInProgress`] after the form was closed.
    pub async fn submit(&self, form: TicketForm) -> Result<EffectHandle, StoreError> {
        self.store.send(CreateFormAction::Submit { form }).await
    }

    /// Leave the form
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownInProgress`] after the form was closed.
    pub async fn cancel(&self) -> Result<EffectHandle, StoreError> {
        self.store.send(CreateFormAction::Cancel).await
    }

    /// Copy of the current state
    pub async fn state(&self) -> CreateFormState {
        self.store.state(Clone::clone).await
    }

    /// Whether the submit button is active
    pub async fn is_submit_enabled(&self) -> bool {
        self.store.state(CreateFormState::is_submit_enabled).await
    }

    /// Wait until no effect of the form is running, navigation included
    pub async fn settled(&self) {
        while self.store.pending_effects() > 0 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }

    /// Stop accepting input and drop any late outcome. Idempotent.
    pub fn close(&self) {
        self.store.close();
    }
}

impl Drop for CreateFormController {
    fn drop(&mut self) {
        self.close();
    }
}
