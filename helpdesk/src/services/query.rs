//! Read side: the tickets of one owner.

use crate::metrics::TicketMetrics;
use crate::store::{StorageError, TicketStore};
use crate::types::{OwnerId, Ticket, TicketId};
use std::sync::Arc;

/// Lists tickets for an owner, newest first
///
/// Never caches: every call reaches the store.
#[derive(Clone)]
pub struct TicketQueryService {
    store: Arc<dyn TicketStore>,
}

impl TicketQueryService {
    /// Query service over `store`
    #[must_use]
    pub fn new(store: Arc<dyn TicketStore>) -> Self {
        Self { store }
    }

    /// All tickets of `owner`, ordered by `created_at` descending
    ///
    /// Without an owner the result is empty and the store is not called.
    /// Tickets with equal timestamps keep the order the store returned.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the store read fails.
    #[tracing::instrument(skip(self))]
    pub async fn list_tickets_for_owner(
        &self,
        owner: Option<&OwnerId>,
    ) -> Result<Vec<Ticket>, StorageError> {
        let Some(owner) = owner else {
            tracing::debug!("No owner, returning empty ticket list");
            return Ok(Vec::new());
        };

        let mut tickets = self.store.list_by_owner(*owner).await.map_err(|error| {
            tracing::error!(%error, "Failed to fetch tickets for owner");
            error
        })?;

        tickets.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        TicketMetrics::record_listed(tickets.len());
        tracing::debug!(count = tickets.len(), "Listed tickets");
        Ok(tickets)
    }

    /// One ticket of `owner`, or `None` if it doesn't exist or isn't theirs
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the store read fails.
    #[tracing::instrument(skip(self))]
    pub async fn get_ticket(
        &self,
        owner: Option<&OwnerId>,
        id: TicketId,
    ) -> Result<Option<Ticket>, StorageError> {
        let Some(owner) = owner else {
            return Ok(None);
        };

        self.store.get(*owner, id).await.map_err(|error| {
            tracing::error!(%error, ticket_id = %id, "Failed to fetch ticket");
            error
        })
    }

    /// Check that the backing store is reachable
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Unavailable`] if it is not.
    pub async fn ping(&self) -> Result<(), StorageError> {
        self.store.ping().await
    }
}
