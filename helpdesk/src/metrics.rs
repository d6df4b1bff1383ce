//! Business metrics for the helpdesk.
//!
//! # Exported Metrics
//!
//! ## Counters
//! - `tickets.created` - Tickets persisted
//! - `tickets.create.rejected{reason}` - Create attempts that persisted nothing
//!   (`invalid`, `unauthenticated`, `storage`)
//! - `tickets.listed` - Owner list queries served
//! - `tickets.mutation.unsupported{operation}` - Update/delete calls
//!
//! ## Histograms
//! - `tickets.list.size` - Tickets returned per list query

use metrics::{counter, describe_counter, describe_histogram, histogram};

/// Register all business metric descriptions.
///
/// Call once at startup, after the recorder is installed.
pub fn register_ticket_metrics() {
    describe_counter!("tickets.created", "Total number of tickets persisted");
    describe_counter!(
        "tickets.create.rejected",
        "Create attempts that persisted nothing, by reason (invalid, unauthenticated, storage)"
    );
    describe_counter!("tickets.listed", "Owner ticket list queries served");
    describe_histogram!("tickets.list.size", "Number of tickets returned per list query");
    describe_counter!(
        "tickets.mutation.unsupported",
        "Calls to update or delete, which are not supported yet"
    );
}

/// Ticket metrics recorder.
pub struct TicketMetrics;

impl TicketMetrics {
    /// Record a persisted ticket.
    pub fn record_created() {
        counter!("tickets.created").increment(1);
    }

    /// Record a create attempt that persisted nothing.
    pub fn record_rejected(reason: &'static str) {
        counter!("tickets.create.rejected", "reason" => reason).increment(1);
    }

    /// Record a served list query.
    #[allow(clippy::cast_precision_loss)] // list sizes are far below f64 precision limits
    pub fn record_listed(count: usize) {
        counter!("tickets.listed").increment(1);
        histogram!("tickets.list.size").record(count as f64);
    }

    /// Record a call to an unsupported mutation.
    pub fn record_unsupported(operation: &'static str) {
        counter!("tickets.mutation.unsupported", "operation" => operation).increment(1);
    }
}
