//! Helpdesk: a support-ticket dashboard.
//!
//! Signed-in users see their own tickets, newest first, in a list that
//! refreshes itself on a fixed interval, and file new tickets through a form.
//!
//! # Architecture
//!
//! ```text
//!  Client side                               Server side
//! ┌──────────────────────┐                 ┌─────────────────────────┐
//! │ PollingListController│── list ───┐     │ TicketQueryService      │
//! │ CreateFormController │── create ─┤     │ TicketCreationService   │
//! └──────────────────────┘           │     └───────────┬─────────────┘
//!                                    ▼                 │
//!                     TicketApi (LocalTicketApi |      ▼
//!                                HttpTicketApi)   TicketStore
//!                                                 (in-memory | PostgreSQL)
//! ```
//!
//! The controllers are reducers run by a `helpdesk_runtime::Store`; every
//! remote call is an effect, and results come back in as actions.
//!
//! # Modules
//!
//! - [`types`]: tickets, statuses, form and response shapes
//! - [`store`]: ticket persistence
//! - [`services`]: query and creation services
//! - [`session`]: who is signed in
//! - [`api`]: the client-side remote boundary
//! - [`controllers`]: polling list and create form
//! - [`render`]: server-rendered dashboard pages
//! - [`server`]: axum routes
//! - [`config`]: environment configuration
//! - [`metrics`]: ticket metrics
//! - `mocks`: test doubles, behind the `test-utils` feature

pub mod api;
pub mod config;
pub mod controllers;
pub mod metrics;
#[cfg(any(test, feature = "test-utils"))]
pub mod mocks;
pub mod render;
pub mod server;
pub mod services;
pub mod session;
pub mod store;
pub mod types;

pub use api::{ApiError, HttpTicketApi, LocalTicketApi, TicketApi};
pub use config::{Config, ConfigError, PollingConfig};
pub use types::{OwnerId, Ticket, TicketForm, TicketId, TicketStatus};
