//! Ticket persistence.
//!
//! [`TicketStore`] is the only shared mutable resource in the system. Each
//! create is a single insert; reads are scoped to one owner.

use crate::types::{NewTicket, OwnerId, Ticket, TicketId};
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

mod memory;
mod postgres;

pub use memory::InMemoryTicketStore;
pub use postgres::PostgresTicketStore;

/// Errors from ticket storage
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    /// The backing store could not be reached
    #[error("Ticket storage unavailable: {0}")]
    Unavailable(String),

    /// A statement was rejected or failed
    #[error("Ticket query failed: {0}")]
    Query(String),

    /// A stored row cannot be turned into a ticket
    #[error("Corrupt ticket row: {0}")]
    Corrupt(String),
}

/// Boxed future returned by [`TicketStore`] operations
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StorageError>> + Send + 'a>>;

/// Persistent ticket storage
///
/// Uses explicit boxed futures so the store can be shared as
/// `Arc<dyn TicketStore>` between services and HTTP handlers.
pub trait TicketStore: Send + Sync {
    /// Insert a ticket and return it with its assigned ID
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the write fails. Nothing is persisted then.
    fn insert(&self, ticket: NewTicket) -> StoreFuture<'_, Ticket>;

    /// All tickets of `owner`, newest `created_at` first
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the read fails.
    fn list_by_owner(&self, owner: OwnerId) -> StoreFuture<'_, Vec<Ticket>>;

    /// One ticket, only if it belongs to `owner`
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the read fails.
    fn get(&self, owner: OwnerId, id: TicketId) -> StoreFuture<'_, Option<Ticket>>;

    /// Check the store is reachable
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Unavailable`] if it is not.
    fn ping(&self) -> StoreFuture<'_, ()>;
}
