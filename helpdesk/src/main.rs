//! Helpdesk HTTP server.
//!
//! Serves the ticket JSON API, the dashboard pages and health checks.
//! Tickets live in `PostgreSQL` when `DATABASE_URL` is set, in memory otherwise.

use anyhow::Context;
use axum::{routing::get, Router};
use helpdesk::config::Config;
use helpdesk::metrics::register_ticket_metrics;
use helpdesk::server::{build_router, AppState};
use helpdesk::store::{InMemoryTicketStore, PostgresTicketStore, TicketStore};
use helpdesk_core::environment::SystemClock;
use helpdesk_runtime::metrics::MetricsServer;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Missing .env is fine
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "helpdesk=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting helpdesk server");

    let config = Config::from_env().context("Invalid configuration")?;
    info!(
        postgres = config.database.is_some(),
        sessions = config.sessions.len(),
        "Configuration loaded"
    );

    if let Some(addr) = config.server.metrics_addr()? {
        let mut metrics = MetricsServer::new(addr);
        metrics.start()?;
        register_ticket_metrics();
        spawn_metrics_endpoint(Arc::new(metrics)).await?;
    }

    let (store, postgres): (Arc<dyn TicketStore>, Option<Arc<PostgresTicketStore>>) =
        match &config.database {
            Some(database) => {
                info!("Connecting to ticket database...");
                let postgres = Arc::new(PostgresTicketStore::connect(database).await?);
                postgres.migrate().await?;
                info!("Ticket database ready");
                (postgres.clone(), Some(postgres))
            },
            None => {
                warn!("DATABASE_URL not set, tickets are kept in memory");
                (Arc::new(InMemoryTicketStore::new()), None)
            },
        };

    let state = AppState::new(store, Arc::new(config.sessions.clone()), Arc::new(SystemClock))?;
    let app = build_router(state);

    let addr = config.server.bind_addr()?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!(address = %addr, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(postgres) = postgres {
        let timeout = Duration::from_secs(config.server.shutdown_timeout);
        if tokio::time::timeout(timeout, postgres.close()).await.is_err() {
            warn!(timeout_secs = timeout.as_secs(), "Timed out closing the database pool");
        }
    }

    info!("Server stopped");
    Ok(())
}

/// Serve `GET /metrics` on the metrics address
async fn spawn_metrics_endpoint(metrics: Arc<MetricsServer>) -> anyhow::Result<()> {
    let addr = metrics.addr();
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind metrics address {addr}"))?;

    let app = Router::new().route(
        "/metrics",
        get(move || {
            let metrics = Arc::clone(&metrics);
            async move { metrics.render().unwrap_or_default() }
        }),
    );

    tokio::spawn(async move {
        if let Err(error) = axum::serve(listener, app).await {
            tracing::error!(%error, "Metrics endpoint stopped");
        }
    });
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(error) = signal::ctrl_c().await {
            warn!(%error, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            },
            Err(error) => {
                warn!(%error, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            },
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("Received Ctrl+C, shutting down"),
        () = terminate => info!("Received SIGTERM, shutting down"),
    }
}
