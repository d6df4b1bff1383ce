//! Write side: validate and persist new tickets.
//!
//! Every failure on this path is a [`CreateTicketOutcome`] value rather than
//! an `Err`, so callers can render it directly.

use crate::metrics::TicketMetrics;
use crate::store::TicketStore;
use crate::types::{FieldErrors, NewTicket, OwnerId, Ticket, TicketForm, TicketId, TicketStatus};
use helpdesk_core::environment::Clock;
use std::sync::Arc;

/// Message for a persisted ticket
pub const CREATED_MESSAGE: &str = "Ticket created successfully!";
/// Message for a form with field errors
pub const INVALID_MESSAGE: &str = "Missing Fields. Failed to Create Ticket.";
/// Message when nobody is signed in
pub const UNAUTHENTICATED_MESSAGE: &str = "Authentication Error: User not logged in.";
/// Message when the insert fails
pub const FAILED_MESSAGE: &str = "Database Error: Failed to Create Ticket. Please try again.";
/// Field error for a missing or empty subject
pub const SUBJECT_REQUIRED: &str = "Subject cannot be empty.";
/// Field error for a missing or empty description
pub const DESCRIPTION_REQUIRED: &str = "Description cannot be empty.";
/// Field error for a status outside the enumeration
pub const INVALID_STATUS: &str = "Please select a valid status for the ticket.";
/// Message returned by `update_ticket`
pub const UPDATE_UNSUPPORTED_MESSAGE: &str = "Update ticket functionality not yet implemented.";
/// Message returned by `delete_ticket`
pub const DELETE_UNSUPPORTED_MESSAGE: &str = "Delete ticket functionality not yet implemented.";

/// Result of a create-ticket submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CreateTicketOutcome {
    /// The ticket was persisted
    Created {
        /// The stored ticket
        ticket: Ticket,
        /// Success message
        message: String,
    },
    /// The form failed validation; nothing was written
    Invalid {
        /// Messages for exactly the failing fields
        errors: FieldErrors,
        /// Summary message
        message: String,
    },
    /// Nobody is signed in; nothing was written
    Unauthenticated {
        /// Summary message
        message: String,
    },
    /// The insert failed; nothing was written
    Failed {
        /// Summary message
        message: String,
    },
}

impl CreateTicketOutcome {
    /// Human-readable summary
    #[must_use]
    pub fn message(&self) -> &str {
        match self {
            Self::Created { message, .. }
            | Self::Invalid { message, .. }
            | Self::Unauthenticated { message }
            | Self::Failed { message } => message,
        }
    }

    /// Field errors, empty unless validation failed
    #[must_use]
    pub fn field_errors(&self) -> FieldErrors {
        match self {
            Self::Invalid { errors, .. } => errors.clone(),
            _ => FieldErrors::new(),
        }
    }

    /// Whether a ticket was persisted
    #[must_use]
    pub const fn is_created(&self) -> bool {
        matches!(self, Self::Created { .. })
    }

    pub(crate) fn unauthenticated() -> Self {
        Self::Unauthenticated {
            message: UNAUTHENTICATED_MESSAGE.to_string(),
        }
    }

    pub(crate) fn failed() -> Self {
        Self::Failed {
            message: FAILED_MESSAGE.to_string(),
        }
    }
}

/// Result of an update or delete request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MutationOutcome {
    /// The operation exists in the interface but does nothing yet
    NotSupported {
        /// Explanation for the caller
        message: String,
    },
}

impl MutationOutcome {
    /// Human-readable summary
    #[must_use]
    pub fn message(&self) -> &str {
        match self {
            Self::NotSupported { message } => message,
        }
    }
}

/// Drops an owner's cached list rendering after a write
pub trait ListInvalidator: Send + Sync {
    /// Forget anything cached for `owner`
    fn invalidate(&self, owner: &OwnerId);
}

/// Invalidator for callers with no cache
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopInvalidator;

impl ListInvalidator for NoopInvalidator {
    fn invalidate(&self, _owner: &OwnerId) {}
}

struct ValidTicket {
    subject: String,
    description: String,
}

/// Check a submission field by field
///
/// Text fields are taken as submitted: only absent or empty values fail.
/// A status, when given, must name a [`TicketStatus`].
fn validate(form: TicketForm) -> Result<ValidTicket, FieldErrors> {
    let mut errors = FieldErrors::new();

    let subject = form.subject.filter(|s| !s.is_empty());
    if subject.is_none() {
        errors.add("subject", SUBJECT_REQUIRED);
    }

    let description = form.description.filter(|s| !s.is_empty());
    if description.is_none() {
        errors.add("description", DESCRIPTION_REQUIRED);
    }

    let status_valid = form
        .status
        .as_deref()
        .is_none_or(|status| status.parse::<TicketStatus>().is_ok());
    if !status_valid {
        errors.add("status", INVALID_STATUS);
    }

    match (subject, description) {
        (Some(subject), Some(description)) if errors.is_empty() => {
            Ok(ValidTicket { subject, description })
        },
        _ => Err(errors),
    }
}

/// Validates and persists new tickets
#[derive(Clone)]
pub struct TicketCreationService {
    store: Arc<dyn TicketStore>,
    clock: Arc<dyn Clock>,
    invalidator: Arc<dyn ListInvalidator>,
}

impl TicketCreationService {
    /// Creation service writing to `store`, stamping times from `clock`
    #[must_use]
    pub fn new(
        store: Arc<dyn TicketStore>,
        clock: Arc<dyn Clock>,
        invalidator: Arc<dyn ListInvalidator>,
    ) -> Self {
        Self {
            store,
            clock,
            invalidator,
        }
    }

    /// Validate `form` and persist it for `owner`
    ///
    /// The owner is checked before the form. New tickets always start
    /// [`TicketStatus::Open`], whatever status was submitted. On success the
    /// owner's cached list is invalidated.
    #[tracing::instrument(skip(self, form))]
    pub async fn create_ticket(&self, owner: Option<OwnerId>, form: TicketForm) -> CreateTicketOutcome {
        let Some(owner) = owner else {
            tracing::warn!("Create ticket attempted without a session");
            TicketMetrics::record_rejected("unauthenticated");
            return CreateTicketOutcome::unauthenticated();
        };

        let valid = match validate(form) {
            Ok(valid) => valid,
            Err(errors) => {
                tracing::info!(fields = ?errors.fields().collect::<Vec<_>>(), "Ticket form rejected");
                TicketMetrics::record_rejected("invalid");
                return CreateTicketOutcome::Invalid {
                    errors,
                    message: INVALID_MESSAGE.to_string(),
                };
            },
        };

        let now = self.clock.now();
        let new_ticket = NewTicket {
            owner_id: owner,
            subject: valid.subject,
            description: valid.description,
            status: TicketStatus::Open,
            created_at: now,
            updated_at: now,
        };

        match self.store.insert(new_ticket).await {
            Ok(ticket) => {
                self.invalidator.invalidate(&owner);
                TicketMetrics::record_created();
                tracing::info!(ticket_id = %ticket.id, "Ticket created");
                CreateTicketOutcome::Created {
                    ticket,
                    message: CREATED_MESSAGE.to_string(),
                }
            },
            Err(error) => {
                tracing::error!(%error, "Failed to insert ticket");
                TicketMetrics::record_rejected("storage");
                CreateTicketOutcome::failed()
            },
        }
    }

    /// Change an existing ticket (not supported yet)
    #[allow(clippy::unused_async)] // async so callers don't change once it is implemented
    pub async fn update_ticket(
        &self,
        owner: Option<OwnerId>,
        id: TicketId,
        _form: TicketForm,
    ) -> MutationOutcome {
        tracing::info!(?owner, ticket_id = %id, "Update ticket requested");
        TicketMetrics::record_unsupported("update");
        MutationOutcome::NotSupported {
            message: UPDATE_UNSUPPORTED_MESSAGE.to_string(),
        }
    }

    /// Remove a ticket (not supported yet)
    #[allow(clippy::unused_async)] // async so callers don't change once it is implemented
    pub async fn delete_ticket(&self, owner: Option<OwnerId>, id: TicketId) -> MutationOutcome {
        tracing::info!(?owner, ticket_id = %id, "Delete ticket requested");
        TicketMetrics::record_unsupported("delete");
        MutationOutcome::NotSupported {
            message: DELETE_UNSUPPORTED_MESSAGE.to_string(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::mocks::{FailingTicketStore, RecordingInvalidator};
    use crate::store::InMemoryTicketStore;
    use crate::services::TicketQueryService;
    use helpdesk_testing::{stepping_clock, test_clock, test_epoch};

    struct Fixture {
        store: Arc<InMemoryTicketStore>,
        invalidator: Arc<RecordingInvalidator>,
        service: TicketCreationService,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(InMemoryTicketStore::new());
        let invalidator = Arc::new(RecordingInvalidator::default());
        let service = TicketCreationService::new(
            store.clone(),
            Arc::new(test_clock()),
            invalidator.clone(),
        );
        Fixture {
            store,
            invalidator,
            service,
        }
    }

    #[tokio::test]
    async fn valid_form_creates_open_ticket() {
        let f = fixture();
        let owner = OwnerId::new();

        let outcome = f
            .service
            .create_ticket(Some(owner), TicketForm::new("Printer jam", "Tray 2 stuck"))
            .await;

        let CreateTicketOutcome::Created { ticket, message } = outcome else {
            panic!("expected Created, got {outcome:?}");
        };
        assert_eq!(message, CREATED_MESSAGE);
        assert_eq!(ticket.owner_id, owner);
        assert_eq!(ticket.status, TicketStatus::Open);
        assert_eq!(ticket.created_at, test_epoch());
        assert_eq!(ticket.created_at, ticket.updated_at);
        assert_eq!(f.store.len().await, 1);
        assert_eq!(f.invalidator.invalidated(), vec![owner]);
    }

    #[tokio::test]
    async fn submitted_status_is_ignored() {
        let f = fixture();
        let outcome = f
            .service
            .create_ticket(
                Some(OwnerId::new()),
                TicketForm::new("VPN", "Drops hourly").with_status("Closed"),
            )
            .await;

        let CreateTicketOutcome::Created { ticket, .. } = outcome else {
            panic!("expected Created, got {outcome:?}");
        };
        assert_eq!(ticket.status, TicketStatus::Open);
    }

    #[tokio::test]
    async fn empty_subject_reports_only_subject() {
        let f = fixture();
        let outcome = f
            .service
            .create_ticket(Some(OwnerId::new()), TicketForm::new("", "Something broke"))
            .await;

        let CreateTicketOutcome::Invalid { errors, message } = outcome else {
            panic!("expected Invalid, got {outcome:?}");
        };
        assert_eq!(message, INVALID_MESSAGE);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors.get("subject").unwrap(), [SUBJECT_REQUIRED]);
        assert!(f.store.is_empty().await);
        assert!(f.invalidator.invalidated().is_empty());
    }

    #[tokio::test]
    async fn missing_fields_and_bogus_status_are_all_reported() {
        let f = fixture();
        let form = TicketForm {
            subject: None,
            description: Some(String::new()),
            status: Some("Pending".to_string()),
        };

        let outcome = f.service.create_ticket(Some(OwnerId::new()), form).await;
        let errors = outcome.field_errors();
        assert_eq!(errors.get("subject").unwrap(), [SUBJECT_REQUIRED]);
        assert_eq!(errors.get("description").unwrap(), [DESCRIPTION_REQUIRED]);
        assert_eq!(errors.get("status").unwrap(), [INVALID_STATUS]);
    }

    #[tokio::test]
    async fn whitespace_only_text_is_accepted() {
        let f = fixture();
        let outcome = f
            .service
            .create_ticket(Some(OwnerId::new()), TicketForm::new(" ", " "))
            .await;
        assert!(outcome.is_created());
    }

    #[tokio::test]
    async fn missing_owner_is_checked_before_the_form() {
        let f = fixture();
        let outcome = f.service.create_ticket(None, TicketForm::default()).await;

        assert_eq!(outcome, CreateTicketOutcome::unauthenticated());
        assert_eq!(outcome.message(), UNAUTHENTICATED_MESSAGE);
        assert!(f.store.is_empty().await);
    }

    #[tokio::test]
    async fn storage_failure_is_reported_without_invalidation() {
        let invalidator = Arc::new(RecordingInvalidator::default());
        let service = TicketCreationService::new(
            Arc::new(FailingTicketStore::unavailable()),
            Arc::new(test_clock()),
            invalidator.clone(),
        );

        let outcome = service
            .create_ticket(Some(OwnerId::new()), TicketForm::new("Email", "Bounces"))
            .await;

        assert_eq!(outcome.message(), FAILED_MESSAGE);
        assert!(matches!(outcome, CreateTicketOutcome::Failed { .. }));
        assert!(invalidator.invalidated().is_empty());
    }

    #[tokio::test]
    async fn update_and_delete_are_not_supported() {
        let f = fixture();
        let owner = Some(OwnerId::new());
        let id = TicketId::new();

        assert_eq!(
            f.service.update_ticket(owner, id, TicketForm::default()).await.message(),
            UPDATE_UNSUPPORTED_MESSAGE
        );
        assert_eq!(
            f.service.delete_ticket(owner, id).await,
            MutationOutcome::NotSupported {
                message: DELETE_UNSUPPORTED_MESSAGE.to_string()
            }
        );
    }

    #[tokio::test]
    async fn later_submissions_list_first() {
        let store = Arc::new(InMemoryTicketStore::new());
        let service = TicketCreationService::new(
            store.clone(),
            Arc::new(stepping_clock()),
            Arc::new(RecordingInvalidator::default()),
        );
        let owner = OwnerId::new();

        for subject in ["first", "second", "third"] {
            let outcome = service
                .create_ticket(Some(owner), TicketForm::new(subject, "details"))
                .await;
            assert!(outcome.is_created());
        }

        let listed = TicketQueryService::new(store)
            .list_tickets_for_owner(Some(&owner))
            .await
            .unwrap();
        let subjects: Vec<&str> = listed.iter().map(|t| t.subject.as_str()).collect();
        assert_eq!(subjects, ["third", "second", "first"]);
        assert!(listed[0].created_at > listed[1].created_at);
    }
}
