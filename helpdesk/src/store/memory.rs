//! In-memory ticket store, used when no database is configured and in tests.

use super::{StorageError, StoreFuture, TicketStore};
use crate::types::{NewTicket, OwnerId, Ticket, TicketId};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Ticket store backed by a vector behind a `RwLock`
#[derive(Debug, Clone, Default)]
pub struct InMemoryTicketStore {
    tickets: Arc<RwLock<Vec<Ticket>>>,
}

impl InMemoryTicketStore {
    /// Empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-populated with `tickets`
    #[must_use]
    pub fn with_tickets(tickets: Vec<Ticket>) -> Self {
        Self {
            tickets: Arc::new(RwLock::new(tickets)),
        }
    }

    /// Number of stored tickets across all owners
    pub async fn len(&self) -> usize {
        self.tickets.read().await.len()
    }

    /// Whether no ticket is stored
    pub async fn is_empty(&self) -> bool {
        self.tickets.read().await.is_empty()
    }
}

impl TicketStore for InMemoryTicketStore {
    fn insert(&self, ticket: NewTicket) -> StoreFuture<'_, Ticket> {
        Box::pin(async move {
            if ticket.subject.is_empty() || ticket.description.is_empty() {
                return Err(StorageError::Query(
                    "subject and description must not be empty".to_string(),
                ));
            }

            let ticket = ticket.into_ticket(TicketId::new());
            self.tickets.write().await.push(ticket.clone());
            Ok(ticket)
        })
    }

    fn list_by_owner(&self, owner: OwnerId) -> StoreFuture<'_, Vec<Ticket>> {
        Box::pin(async move {
            let tickets = self.tickets.read().await;
            // Newest insert first, so equal timestamps keep that order after the stable sort
            let mut owned: Vec<Ticket> = tickets
                .iter()
                .rev()
                .filter(|ticket| ticket.owner_id == owner)
                .cloned()
                .collect();
            owned.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            Ok(owned)
        })
    }

    fn get(&self, owner: OwnerId, id: TicketId) -> StoreFuture<'_, Option<Ticket>> {
        Box::pin(async move {
            let tickets = self.tickets.read().await;
            Ok(tickets
                .iter()
                .find(|ticket| ticket.id == id && ticket.owner_id == owner)
                .cloned())
        })
    }

    fn ping(&self) -> StoreFuture<'_, ()> {
        Box::pin(async { Ok(()) })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::types::TicketStatus;
    use chrono::{Duration, Utc};

    fn new_ticket(owner: OwnerId, subject: &str, minutes_ago: i64) -> NewTicket {
        let at = Utc::now() - Duration::minutes(minutes_ago);
        NewTicket {
            owner_id: owner,
            subject: subject.to_string(),
            description: "details".to_string(),
            status: TicketStatus::Open,
            created_at: at,
            updated_at: at,
        }
    }

    #[tokio::test]
    async fn lists_only_owner_tickets_newest_first() {
        let store = InMemoryTicketStore::new();
        let alice = OwnerId::new();
        let bob = OwnerId::new();

        store.insert(new_ticket(alice, "old", 30)).await.unwrap();
        store.insert(new_ticket(bob, "other", 10)).await.unwrap();
        store.insert(new_ticket(alice, "new", 5)).await.unwrap();

        let listed = store.list_by_owner(alice).await.unwrap();
        let subjects: Vec<_> = listed.iter().map(|t| t.subject.as_str()).collect();
        assert_eq!(subjects, ["new", "old"]);
    }

    #[tokio::test]
    async fn get_is_scoped_to_owner() {
        let store = InMemoryTicketStore::new();
        let alice = OwnerId::new();
        let ticket = store.insert(new_ticket(alice, "mine", 0)).await.unwrap();

        assert!(store.get(alice, ticket.id).await.unwrap().is_some());
        assert!(store.get(OwnerId::new(), ticket.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn rejects_empty_subject() {
        let store = InMemoryTicketStore::new();
        let result = store.insert(new_ticket(OwnerId::new(), "", 0)).await;
        assert!(matches!(result, Err(StorageError::Query(_))));
        assert!(store.is_empty().await);
    }
}
