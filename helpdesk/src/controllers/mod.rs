//! Client-side controllers.
//!
//! Each controller is a reducer run by a [`helpdesk_runtime::Store`]; all
//! remote work goes through [`crate::api::TicketApi`] in the environment.

pub mod create_form;
pub mod polling;

pub use create_form::{
    CreateFormAction, CreateFormController, CreateFormEnvironment, CreateFormReducer,
    CreateFormState, Navigator, Route,
};
pub use polling::{
    POLL_FAILURE_MESSAGE, PollingListAction, PollingListController, PollingListEnvironment,
    PollingListReducer, PollingListState,
};
