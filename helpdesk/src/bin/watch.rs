//! Watch your tickets from the terminal.
//!
//! Mounts the polling ticket list against a running helpdesk server and
//! prints every refreshed snapshot.
//!
//! ```bash
//! helpdesk-watch --url http://localhost:8080 --token alice-token --interval 5
//! ```

use anyhow::Context;
use clap::Parser;
use helpdesk::api::{HttpTicketApi, TicketApi};
use helpdesk::config::{PollingConfig, DEFAULT_POLL_INTERVAL};
use helpdesk::controllers::{PollingListAction, PollingListController, PollingListEnvironment};
use helpdesk::types::Ticket;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "helpdesk-watch")]
#[command(about = "Print your tickets and keep them up to date", long_about = None)]
struct Cli {
    /// Server base URL
    #[arg(long, env = "HELPDESK_URL", default_value = "http://localhost:8080")]
    url: String,

    /// Bearer token of your session
    #[arg(long, env = "HELPDESK_TOKEN")]
    token: Option<String>,

    /// Seconds between refreshes
    #[arg(long, env = "POLL_INTERVAL_SECS", default_value_t = DEFAULT_POLL_INTERVAL.as_secs())]
    interval: u64,

    /// Stop after this many refreshes
    #[arg(long)]
    count: Option<usize>,
}

fn print_snapshot(tickets: &[Ticket], banner: Option<&str>) {
    println!();
    if let Some(banner) = banner {
        println!("! {banner}");
    }
    if tickets.is_empty() {
        println!("No tickets found.");
        return;
    }
    println!("{:<17} {:<12} SUBJECT", "CREATED", "STATUS");
    for ticket in tickets {
        println!(
            "{:<17} {:<12} {}",
            ticket.created_at.format("%Y-%m-%d %H:%M"),
            ticket.status.as_str(),
            ticket.subject
        );
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "helpdesk=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let api = Arc::new(HttpTicketApi::new(&cli.url, cli.token).context("Failed to build HTTP client")?);

    let initial = match api.list_tickets().await {
        Ok(tickets) => tickets,
        Err(error) => {
            tracing::warn!(%error, "Initial load failed, starting empty");
            Vec::new()
        },
    };
    print_snapshot(&initial, None);

    let config = PollingConfig {
        interval: Duration::from_secs(cli.interval.max(1)),
    };
    let mut controller = PollingListController::mount(initial, PollingListEnvironment::new(api), config);
    let mut updates = controller.subscribe();
    let mut refreshes = 0;

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            update = updates.recv() => match update {
                Ok(PollingListAction::TicketsLoaded { .. } | PollingListAction::LoadFailed { .. }) => {
                    let state = controller.state().await;
                    print_snapshot(state.tickets(), state.error_message());
                    refreshes += 1;
                    if cli.count.is_some_and(|count| refreshes >= count) {
                        break;
                    }
                },
                Ok(_) | Err(RecvError::Lagged(_)) => {},
                Err(RecvError::Closed) => break,
            },
        }
    }

    controller.unmount();
    Ok(())
}
