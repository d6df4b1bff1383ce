//! Ticket JSON API.
//!
//! - `GET /api/tickets`: the caller's tickets, newest first
//! - `GET /api/tickets/:id`: one of the caller's tickets
//! - `POST /api/tickets`: create from a form-encoded body
//! - `PUT /api/tickets/:id`, `DELETE /api/tickets/:id`: not supported yet

use crate::server::error::AppError;
use crate::server::extractors::{CorrelationId, CurrentOwner};
use crate::server::state::AppState;
use crate::services::{CreateTicketOutcome, MutationOutcome};
use crate::types::{FieldErrors, MutationResponse, Ticket, TicketForm, TicketId};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Form, Json,
};

/// List the caller's tickets
///
/// Anonymous callers get `200 []`.
///
/// ```bash
/// curl -H "Authorization: Bearer <token>" http://localhost:8080/api/tickets
/// ```
pub async fn list_tickets(
    State(state): State<AppState>,
    CurrentOwner(owner): CurrentOwner,
) -> Result<Json<Vec<Ticket>>, AppError> {
    let tickets = state.query.list_tickets_for_owner(owner.as_ref()).await?;
    Ok(Json(tickets))
}

/// Fetch one of the caller's tickets
///
/// Tickets of other owners are reported as missing.
pub async fn get_ticket(
    State(state): State<AppState>,
    CurrentOwner(owner): CurrentOwner,
    Path(id): Path<TicketId>,
) -> Result<Json<Ticket>, AppError> {
    state
        .query
        .get_ticket(owner.as_ref(), id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::not_found("Ticket", id))
}

/// Status and body for a create outcome
fn create_response(outcome: CreateTicketOutcome) -> (StatusCode, Json<MutationResponse>) {
    let (status, response) = match outcome {
        CreateTicketOutcome::Created { ticket, message } => (
            StatusCode::CREATED,
            MutationResponse {
                message,
                errors: FieldErrors::new(),
                ticket: Some(ticket),
            },
        ),
        CreateTicketOutcome::Invalid { errors, message } => (
            StatusCode::UNPROCESSABLE_ENTITY,
            MutationResponse {
                message,
                errors,
                ticket: None,
            },
        ),
        CreateTicketOutcome::Unauthenticated { message } => (
            StatusCode::UNAUTHORIZED,
            MutationResponse {
                message,
                errors: FieldErrors::new(),
                ticket: None,
            },
        ),
        CreateTicketOutcome::Failed { message } => (
            StatusCode::INTERNAL_SERVER_ERROR,
            MutationResponse {
                message,
                errors: FieldErrors::new(),
                ticket: None,
            },
        ),
    };
    (status, Json(response))
}

fn not_supported(outcome: MutationOutcome) -> (StatusCode, Json<MutationResponse>) {
    (
        StatusCode::NOT_IMPLEMENTED,
        Json(MutationResponse {
            message: outcome.message().to_string(),
            errors: FieldErrors::new(),
            ticket: None,
        }),
    )
}

/// Create a ticket for the caller
///
/// ```bash
/// curl -X POST http://localhost:8080/api/tickets \
///   -H "Authorization: Bearer <token>" \
///   -d subject=Printer -d description=Jammed -d status=Open
/// ```
pub async fn create_ticket(
    State(state): State<AppState>,
    CurrentOwner(owner): CurrentOwner,
    correlation_id: CorrelationId,
    Form(form): Form<TicketForm>,
) -> (StatusCode, Json<MutationResponse>) {
    tracing::debug!(correlation_id = %correlation_id.0, "Create ticket request");
    create_response(state.creation.create_ticket(owner, form).await)
}

/// Update a ticket (always `501`)
pub async fn update_ticket(
    State(state): State<AppState>,
    CurrentOwner(owner): CurrentOwner,
    Path(id): Path<TicketId>,
    Form(form): Form<TicketForm>,
) -> (StatusCode, Json<MutationResponse>) {
    not_supported(state.creation.update_ticket(owner, id, form).await)
}

/// Delete a ticket (always `501`)
pub async fn delete_ticket(
    State(state): State<AppState>,
    CurrentOwner(owner): CurrentOwner,
    Path(id): Path<TicketId>,
) -> (StatusCode, Json<MutationResponse>) {
    not_supported(state.creation.delete_ticket(owner, id).await)
}
