//! Server-rendered ticket dashboard.
//!
//! Pages are tera templates compiled into the binary. Template names end in
//! `.html`, so every interpolated value is HTML-escaped.
//!
//! The rendered list of each owner is cached until a create for that owner
//! invalidates it. Every invalidation bumps the owner's generation; a page
//! rendered from a snapshot taken under an older generation is never cached.

use crate::services::ListInvalidator;
use crate::types::{OwnerId, Ticket, TicketStatus};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};
use tera::{Context, Tera};
use thiserror::Error;

/// Shown when nobody is signed in
pub const LOGIN_REQUIRED_MESSAGE: &str = "Please log in to view your tickets.";
/// Shown when the initial snapshot cannot be loaded
pub const LOAD_FAILED_MESSAGE: &str = "Failed to load tickets. Please try again later.";
/// Shown for an owner without tickets
pub const EMPTY_MESSAGE: &str = "No tickets found.";
/// Shown when the ticket does not exist or belongs to someone else
pub const NOT_FOUND_MESSAGE: &str = "Ticket not found.";

const TEMPLATES: [(&str, &str); 5] = [
    ("base.html", include_str!("../templates/base.html")),
    ("ticket_list.html", include_str!("../templates/ticket_list.html")),
    ("ticket.html", include_str!("../templates/ticket.html")),
    ("create_form.html", include_str!("../templates/create_form.html")),
    ("message.html", include_str!("../templates/message.html")),
];

/// Failure to compile or render a page template
#[derive(Error, Debug)]
#[error("Failed to render {template}: {source}")]
pub struct RenderError {
    template: &'static str,
    #[source]
    source: tera::Error,
}

/// CSS classes of the status badge
#[must_use]
pub const fn status_badge_class(status: TicketStatus) -> &'static str {
    match status {
        TicketStatus::Open => "bg-blue-100 text-blue-800",
        TicketStatus::InProgress => "bg-yellow-100 text-yellow-800",
        TicketStatus::OnHold => "bg-orange-100 text-orange-800",
        TicketStatus::Resolved => "bg-green-100 text-green-800",
        TicketStatus::Closed => "bg-red-100 text-red-800",
    }
}

/// A ticket with its display fields already formatted
#[derive(Serialize)]
struct TicketView<'a> {
    id: String,
    subject: &'a str,
    description: &'a str,
    status: &'static str,
    badge: &'static str,
    created_date: String,
    updated_date: String,
    created_time: String,
    updated_time: String,
}

impl<'a> From<&'a Ticket> for TicketView<'a> {
    fn from(ticket: &'a Ticket) -> Self {
        Self {
            id: ticket.id.to_string(),
            subject: &ticket.subject,
            description: &ticket.description,
            status: ticket.status.as_str(),
            badge: status_badge_class(ticket.status),
            created_date: ticket.created_at.format("%Y-%m-%d").to_string(),
            updated_date: ticket.updated_at.format("%Y-%m-%d").to_string(),
            created_time: ticket.created_at.format("%Y-%m-%d %H:%M").to_string(),
            updated_time: ticket.updated_at.format("%Y-%m-%d %H:%M").to_string(),
        }
    }
}

/// The compiled dashboard templates
#[derive(Debug)]
pub struct Pages {
    tera: Tera,
}

impl Pages {
    /// Compile every page template
    ///
    /// # Errors
    ///
    /// Returns [`RenderError`] if a template does not parse.
    pub fn new() -> Result<Self, RenderError> {
        let mut tera = Tera::default();
        tera.add_raw_templates(TEMPLATES)
            .map_err(|source| RenderError {
                template: "dashboard templates",
                source,
            })?;
        Ok(Self { tera })
    }

    fn render(&self, template: &'static str, context: &Context) -> Result<String, RenderError> {
        self.tera
            .render(template, context)
            .map_err(|source| RenderError { template, source })
    }

    /// Full page with the ticket table, or the empty-state message
    ///
    /// # Errors
    ///
    /// Returns [`RenderError`] if the template fails to render.
    pub fn ticket_list(&self, tickets: &[Ticket]) -> Result<String, RenderError> {
        let rows: Vec<TicketView<'_>> = tickets.iter().map(TicketView::from).collect();
        let mut context = Context::new();
        context.insert("tickets", &rows);
        context.insert("empty_message", EMPTY_MESSAGE);
        self.render("ticket_list.html", &context)
    }

    /// Detail page of one ticket
    ///
    /// # Errors
    ///
    /// Returns [`RenderError`] if the template fails to render.
    pub fn ticket(&self, ticket: &Ticket) -> Result<String, RenderError> {
        let mut context = Context::new();
        context.insert("ticket", &TicketView::from(ticket));
        self.render("ticket.html", &context)
    }

    /// The create-ticket form, posting to the JSON API
    ///
    /// # Errors
    ///
    /// Returns [`RenderError`] if the template fails to render.
    pub fn create_form(&self) -> Result<String, RenderError> {
        let statuses = TicketStatus::ALL.map(TicketStatus::as_str);
        let mut context = Context::new();
        context.insert("statuses", &statuses);
        self.render("create_form.html", &context)
    }

    /// Page with a single message instead of the table
    ///
    /// # Errors
    ///
    /// Returns [`RenderError`] if the template fails to render.
    pub fn message(&self, message: &str) -> Result<String, RenderError> {
        let mut context = Context::new();
        context.insert("message", message);
        self.render("message.html", &context)
    }
}

/// Invalidation count of one owner's list
///
/// Read before querying the store and passed back to
/// [`RenderCache::insert`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Generation(u64);

#[derive(Debug, Default)]
struct CacheEntries {
    pages: HashMap<OwnerId, String>,
    generations: HashMap<OwnerId, u64>,
}

impl CacheEntries {
    fn generation(&self, owner: &OwnerId) -> Generation {
        Generation(self.generations.get(owner).copied().unwrap_or_default())
    }
}

/// Rendered dashboard pages keyed by owner
#[derive(Debug, Default)]
pub struct RenderCache {
    entries: RwLock<CacheEntries>,
}

impl RenderCache {
    /// Empty cache
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The cached page of `owner`
    #[must_use]
    pub fn get(&self, owner: &OwnerId) -> Option<String> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries.pages.get(owner).cloned()
    }

    /// Current generation of `owner`, to be read before loading the tickets
    #[must_use]
    pub fn generation(&self, owner: &OwnerId) -> Generation {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries.generation(owner)
    }

    /// Cache `page` for `owner` unless the list was invalidated since
    /// `generation` was read
    ///
    /// Returns whether the page was stored.
    pub fn insert(&self, owner: OwnerId, generation: Generation, page: String) -> bool {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        if entries.generation(&owner) != generation {
            tracing::debug!(owner_id = %owner, "Discarding ticket list rendered before a create");
            return false;
        }
        entries.pages.insert(owner, page);
        true
    }

    /// Number of cached pages
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(PoisonError::into_inner).pages.len()
    }

    /// Whether nothing is cached
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ListInvalidator for RenderCache {
    fn invalidate(&self, owner: &OwnerId) {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        *entries.generations.entry(*owner).or_default() += 1;
        if entries.pages.remove(owner).is_some() {
            tracing::debug!(owner_id = %owner, "Invalidated cached ticket list");
        }
    }
}
