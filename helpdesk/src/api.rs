//! Remote-call boundary used by the client controllers.
//!
//! [`TicketApi`] is what the polling and form controllers call.
//! [`LocalTicketApi`] runs the services in-process; [`HttpTicketApi`] calls
//! the HTTP routes of a running server.

use crate::services::create::FAILED_MESSAGE;
use crate::services::{CreateTicketOutcome, TicketCreationService, TicketQueryService};
use crate::session::SessionProvider;
use crate::store::StorageError;
use crate::types::{MutationResponse, Ticket, TicketForm};
use reqwest::StatusCode;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Errors from the list call
#[derive(Error, Debug)]
pub enum ApiError {
    /// The server-side store failed
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// The request never got a response
    #[error("Request failed: {0}")]
    Transport(String),

    /// The server answered with a non-success status
    #[error("Server returned {status}: {message}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Body text or error message
        message: String,
    },

    /// The response body could not be decoded
    #[error("Invalid response body: {0}")]
    Decode(String),
}

/// Boxed future returned by [`TicketApi`] operations
pub type ApiFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Ticket operations as seen by a client
pub trait TicketApi: Send + Sync {
    /// The signed-in user's tickets, newest first
    ///
    /// Anonymous callers get an empty list.
    fn list_tickets(&self) -> ApiFuture<'_, Result<Vec<Ticket>, ApiError>>;

    /// Submit the create-ticket form
    fn create_ticket(&self, form: TicketForm) -> ApiFuture<'_, CreateTicketOutcome>;
}

/// [`TicketApi`] that calls the services in-process
#[derive(Clone)]
pub struct LocalTicketApi {
    query: TicketQueryService,
    creation: TicketCreationService,
    session: Arc<dyn SessionProvider>,
}

impl LocalTicketApi {
    /// API acting as whoever `session` reports
    #[must_use]
    pub fn new(
        query: TicketQueryService,
        creation: TicketCreationService,
        session: Arc<dyn SessionProvider>,
    ) -> Self {
        Self {
            query,
            creation,
            session,
        }
    }
}

impl TicketApi for LocalTicketApi {
    fn list_tickets(&self) -> ApiFuture<'_, Result<Vec<Ticket>, ApiError>> {
        Box::pin(async move {
            let owner = self.session.current_owner_id();
            Ok(self.query.list_tickets_for_owner(owner.as_ref()).await?)
        })
    }

    fn create_ticket(&self, form: TicketForm) -> ApiFuture<'_, CreateTicketOutcome> {
        Box::pin(async move {
            let owner = self.session.current_owner_id();
            self.creation.create_ticket(owner, form).await
        })
    }
}

/// [`TicketApi`] over the server's HTTP routes
#[derive(Debug, Clone)]
pub struct HttpTicketApi {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl HttpTicketApi {
    /// Client for the server at `base_url`, authenticating with `token`
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Transport`] if the HTTP client cannot be built.
    pub fn new(base_url: impl Into<String>, token: Option<String>) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| ApiError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token,
        })
    }

    fn tickets_url(&self) -> String {
        format!("{}/api/tickets", self.base_url)
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn post_form(&self, form: &TicketForm) -> Result<(StatusCode, MutationResponse), ApiError> {
        let response = self
            .authorize(self.client.post(self.tickets_url()))
            .form(form)
            .send()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;

        let status = response.status();
        let body = response
            .json::<MutationResponse>()
            .await
            .map_err(|e| ApiError::Decode(e.to_string()))?;
        Ok((status, body))
    }
}

/// Map a create response back into the outcome the server produced
fn outcome_from_response(status: StatusCode, body: MutationResponse) -> CreateTicketOutcome {
    match status {
        StatusCode::CREATED => match body.ticket {
            Some(ticket) => CreateTicketOutcome::Created {
                ticket,
                message: body.message,
            },
            None => {
                tracing::warn!("Created response without a ticket");
                CreateTicketOutcome::failed()
            },
        },
        StatusCode::UNPROCESSABLE_ENTITY => CreateTicketOutcome::Invalid {
            errors: body.errors,
            message: body.message,
        },
        StatusCode::UNAUTHORIZED => CreateTicketOutcome::Unauthenticated {
            message: body.message,
        },
        _ => CreateTicketOutcome::Failed {
            message: if body.message.is_empty() {
                FAILED_MESSAGE.to_string()
            } else {
                body.message
            },
        },
    }
}

impl TicketApi for HttpTicketApi {
    fn list_tickets(&self) -> ApiFuture<'_, Result<Vec<Ticket>, ApiError>> {
        Box::pin(async move {
            let response = self
                .authorize(self.client.get(self.tickets_url()))
                .send()
                .await
                .map_err(|e| ApiError::Transport(e.to_string()))?;

            let status = response.status();
            if !status.is_success() {
                let message = response.text().await.unwrap_or_default();
                return Err(ApiError::Status {
                    status: status.as_u16(),
                    message,
                });
            }

            response
                .json::<Vec<Ticket>>()
                .await
                .map_err(|e| ApiError::Decode(e.to_string()))
        })
    }

    fn create_ticket(&self, form: TicketForm) -> ApiFuture<'_, CreateTicketOutcome> {
        Box::pin(async move {
            match self.post_form(&form).await {
                Ok((status, body)) => outcome_from_response(status, body),
                Err(error) => {
                    tracing::error!(%error, "Create ticket request failed");
                    CreateTicketOutcome::failed()
                },
            }
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::services::create::{CREATED_MESSAGE, INVALID_MESSAGE, SUBJECT_REQUIRED};
    use crate::services::NoopInvalidator;
    use crate::session::FixedSession;
    use crate::store::InMemoryTicketStore;
    use crate::types::{FieldErrors, OwnerId};
    use helpdesk_testing::test_clock;

    fn local_api(session: FixedSession) -> LocalTicketApi {
        let store = Arc::new(InMemoryTicketStore::new());
        LocalTicketApi::new(
            TicketQueryService::new(store.clone()),
            TicketCreationService::new(store, Arc::new(test_clock()), Arc::new(NoopInvalidator)),
            Arc::new(session),
        )
    }

    #[tokio::test]
    async fn local_api_creates_then_lists() {
        let api = local_api(FixedSession::signed_in(OwnerId::new()));

        let outcome = api.create_ticket(TicketForm::new("Mouse", "Double clicks")).await;
        assert_eq!(outcome.message(), CREATED_MESSAGE);

        let tickets = api.list_tickets().await.unwrap();
        assert_eq!(tickets.len(), 1);
        assert_eq!(tickets[0].subject, "Mouse");
    }

    #[tokio::test]
    async fn local_api_anonymous_lists_nothing() {
        let api = local_api(FixedSession::anonymous());
        assert!(api.list_tickets().await.unwrap().is_empty());
        assert!(matches!(
            api.create_ticket(TicketForm::new("a", "b")).await,
            CreateTicketOutcome::Unauthenticated { .. }
        ));
    }

    #[test]
    fn unprocessable_response_maps_to_invalid() {
        let mut errors = FieldErrors::new();
        errors.add("subject", SUBJECT_REQUIRED);
        let outcome = outcome_from_response(
            StatusCode::UNPROCESSABLE_ENTITY,
            MutationResponse {
                message: INVALID_MESSAGE.to_string(),
                errors: errors.clone(),
                ticket: None,
            },
        );
        assert_eq!(
            outcome,
            CreateTicketOutcome::Invalid {
                errors,
                message: INVALID_MESSAGE.to_string()
            }
        );
    }

    #[test]
    fn unexpected_status_maps_to_failed() {
        let outcome = outcome_from_response(
            StatusCode::BAD_GATEWAY,
            MutationResponse {
                message: String::new(),
                errors: FieldErrors::new(),
                ticket: None,
            },
        );
        assert_eq!(outcome.message(), FAILED_MESSAGE);
    }

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let api = HttpTicketApi::new("http://localhost:8080/", None).unwrap();
        assert_eq!(api.tickets_url(), "http://localhost:8080/api/tickets");
    }
}
