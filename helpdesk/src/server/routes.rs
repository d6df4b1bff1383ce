//! Router of the helpdesk server.

use super::handlers::{dashboard, health, tickets};
use super::middleware::correlation_id_layer;
use super::state::AppState;
use axum::{routing::get, Router};
use tower_http::trace::TraceLayer;

/// Build the complete router
///
/// - `/health`, `/health/ready`
/// - `/api/tickets`, `/api/tickets/:id`
/// - `/dashboard/tickets`, `/dashboard/tickets/create`, `/dashboard/tickets/:id`
pub fn build_router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/tickets", get(tickets::list_tickets).post(tickets::create_ticket))
        .route(
            "/tickets/:id",
            get(tickets::get_ticket)
                .put(tickets::update_ticket)
                .delete(tickets::delete_ticket),
        );

    let dashboard_routes = Router::new()
        .route("/tickets", get(dashboard::ticket_list))
        .route("/tickets/create", get(dashboard::create_form))
        .route("/tickets/:id", get(dashboard::ticket_detail));

    Router::new()
        .route("/health", get(health::health_check))
        .route("/health/ready", get(health::readiness_check))
        .nest("/api", api_routes)
        .nest("/dashboard", dashboard_routes)
        .layer(TraceLayer::new_for_http())
        .layer(correlation_id_layer())
        .with_state(state)
}
