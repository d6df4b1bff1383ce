//! Server-side ticket services.

pub mod create;
pub mod query;

pub use create::{
    CreateTicketOutcome, ListInvalidator, MutationOutcome, NoopInvalidator, TicketCreationService,
};
pub use query::TicketQueryService;
