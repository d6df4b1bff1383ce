//! Server-rendered dashboard pages.

use crate::render::{LOAD_FAILED_MESSAGE, LOGIN_REQUIRED_MESSAGE, NOT_FOUND_MESSAGE};
use crate::server::error::AppError;
use crate::server::extractors::CurrentOwner;
use crate::server::state::AppState;
use crate::types::TicketId;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Html,
};

type Page = Result<(StatusCode, Html<String>), AppError>;

fn message(state: &AppState, status: StatusCode, text: &str) -> Page {
    Ok((status, Html(state.pages.message(text)?)))
}

/// `GET /dashboard/tickets`: the initial snapshot of the caller's tickets
///
/// The rendered page is cached per owner until the owner creates a ticket.
/// A page rendered from a snapshot that a create overtook is served but not
/// cached.
pub async fn ticket_list(State(state): State<AppState>, CurrentOwner(owner): CurrentOwner) -> Page {
    let Some(owner) = owner else {
        return message(&state, StatusCode::OK, LOGIN_REQUIRED_MESSAGE);
    };

    if let Some(page) = state.render_cache.get(&owner) {
        tracing::trace!(owner_id = %owner, "Serving cached ticket list");
        return Ok((StatusCode::OK, Html(page)));
    }

    let generation = state.render_cache.generation(&owner);
    match state.query.list_tickets_for_owner(Some(&owner)).await {
        Ok(tickets) => {
            let page = state.pages.ticket_list(&tickets)?;
            state.render_cache.insert(owner, generation, page.clone());
            Ok((StatusCode::OK, Html(page)))
        },
        Err(error) => {
            tracing::error!(%error, owner_id = %owner, "Failed to render ticket list");
            message(&state, StatusCode::SERVICE_UNAVAILABLE, LOAD_FAILED_MESSAGE)
        },
    }
}

/// `GET /dashboard/tickets/:id`: one of the caller's tickets
pub async fn ticket_detail(
    State(state): State<AppState>,
    CurrentOwner(owner): CurrentOwner,
    Path(id): Path<TicketId>,
) -> Page {
    if owner.is_none() {
        return message(&state, StatusCode::OK, LOGIN_REQUIRED_MESSAGE);
    }

    match state.query.get_ticket(owner.as_ref(), id).await {
        Ok(Some(ticket)) => Ok((StatusCode::OK, Html(state.pages.ticket(&ticket)?))),
        Ok(None) => message(&state, StatusCode::NOT_FOUND, NOT_FOUND_MESSAGE),
        Err(error) => {
            tracing::error!(%error, ticket_id = %id, "Failed to render ticket");
            message(&state, StatusCode::SERVICE_UNAVAILABLE, LOAD_FAILED_MESSAGE)
        },
    }
}

/// `GET /dashboard/tickets/create`: the create-ticket form
#[allow(clippy::unused_async)]
pub async fn create_form(State(state): State<AppState>) -> Result<Html<String>, AppError> {
    Ok(Html(state.pages.create_form()?))
}
