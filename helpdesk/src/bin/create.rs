//! File a ticket from the terminal.
//!
//! Drives the create-ticket form against a running helpdesk server.
//!
//! ```bash
//! helpdesk-create --token alice-token --subject "VPN down" --description "Since 9am"
//! ```

use anyhow::{bail, Context};
use clap::Parser;
use helpdesk::api::HttpTicketApi;
use helpdesk::controllers::{
    CreateFormController, CreateFormEnvironment, CreateFormState, Navigator, Route,
};
use helpdesk::types::TicketForm;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "helpdesk-create")]
#[command(about = "Create a support ticket", long_about = None)]
struct Cli {
    /// Server base URL
    #[arg(long, env = "HELPDESK_URL", default_value = "http://localhost:8080")]
    url: String,

    /// Bearer token of your session
    #[arg(long, env = "HELPDESK_TOKEN")]
    token: Option<String>,

    /// Short summary
    #[arg(long, short)]
    subject: String,

    /// Details
    #[arg(long, short)]
    description: String,

    /// Requested status; new tickets always start Open
    #[arg(long, default_value = "Open")]
    status: String,
}

/// Prints where the form would navigate next
struct PrintNavigator {
    base_url: String,
}

impl Navigator for PrintNavigator {
    fn navigate(&self, route: Route) {
        if let Some(path) = route.path() {
            println!("View your tickets at {}{path}", self.base_url.trim_end_matches('/'));
        }
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
    let api = HttpTicketApi::new(&cli.url, cli.token).context("Failed to build HTTP client")?;
    let navigator = PrintNavigator { base_url: cli.url };
    let form = CreateFormController::new(CreateFormEnvironment::new(Arc::new(api), Arc::new(navigator)));

    let mut handle = form
        .submit(TicketForm::new(cli.subject, cli.description).with_status(cli.status))
        .await?;
    handle.wait().await;
    form.settled().await;

    match form.state().await {
        CreateFormState::Succeeded => {
            println!("Ticket created successfully!");
            Ok(())
        },
        CreateFormState::FailedValidation {
            field_errors,
            message,
        } => {
            for field in field_errors.fields() {
                for error in field_errors.get(field).unwrap_or_default() {
                    eprintln!("{field}: {error}");
                }
            }
            bail!(message)
        },
        CreateFormState::FailedOther { message } => bail!(message),
        other => bail!("Submission did not complete (state: {other:?})"),
    }
}
