//! Test doubles for the environment traits.
//!
//! - `MockTicketApi`: scripted list results, recorded create calls
//! - `FailingTicketStore`: store where every operation fails
//! - `RecordingNavigator`: captures navigation requests
//! - `RecordingInvalidator`: captures list invalidations

use crate::api::{ApiError, ApiFuture, TicketApi};
use crate::controllers::create_form::{Navigator, Route};
use crate::services::{CreateTicketOutcome, ListInvalidator};
use crate::store::{StorageError, StoreFuture, TicketStore};
use crate::types::{NewTicket, OwnerId, Ticket, TicketForm, TicketId};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// One scripted response of [`MockTicketApi::list_tickets`]
#[derive(Debug, Clone)]
pub enum ListResponse {
    /// Succeed with these tickets
    Tickets(Vec<Ticket>),
    /// Fail with this message
    Failure(String),
}

/// Scripted [`TicketApi`]
///
/// List responses are served in order; once the script runs out the last
/// response repeats. Each call can be delayed to simulate latency.
#[derive(Debug, Clone)]
pub struct MockTicketApi {
    list_script: Arc<Mutex<VecDeque<ListResponse>>>,
    last_list: Arc<Mutex<ListResponse>>,
    list_calls: Arc<AtomicUsize>,
    latency: Arc<Mutex<Duration>>,
    create_outcome: Arc<Mutex<CreateTicketOutcome>>,
    submitted: Arc<Mutex<Vec<TicketForm>>>,
}

impl Default for MockTicketApi {
    fn default() -> Self {
        Self::new()
    }
}

impl MockTicketApi {
    /// Mock returning no tickets and failing creates
    #[must_use]
    pub fn new() -> Self {
        Self {
            list_script: Arc::new(Mutex::new(VecDeque::new())),
            last_list: Arc::new(Mutex::new(ListResponse::Tickets(Vec::new()))),
            list_calls: Arc::new(AtomicUsize::new(0)),
            latency: Arc::new(Mutex::new(Duration::ZERO)),
            create_outcome: Arc::new(Mutex::new(CreateTicketOutcome::failed())),
            submitted: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Queue a successful list response
    #[must_use]
    pub fn then_tickets(self, tickets: Vec<Ticket>) -> Self {
        lock(&self.list_script).push_back(ListResponse::Tickets(tickets));
        self
    }

    /// Queue a failing list response
    #[must_use]
    pub fn then_failure(self, message: impl Into<String>) -> Self {
        lock(&self.list_script).push_back(ListResponse::Failure(message.into()));
        self
    }

    /// Delay every call by `latency`
    #[must_use]
    pub fn with_latency(self, latency: Duration) -> Self {
        *lock(&self.latency) = latency;
        self
    }

    /// Outcome returned by every create call
    #[must_use]
    pub fn with_create_outcome(self, outcome: CreateTicketOutcome) -> Self {
        *lock(&self.create_outcome) = outcome;
        self
    }

    /// Number of list calls started so far
    #[must_use]
    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    /// Forms passed to create, in call order
    #[must_use]
    pub fn submitted(&self) -> Vec<TicketForm> {
        lock(&self.submitted).clone()
    }

    fn next_list_response(&self) -> ListResponse {
        let mut script = lock(&self.list_script);
        let mut last = lock(&self.last_list);
        if let Some(next) = script.pop_front() {
            *last = next;
        }
        last.clone()
    }
}

impl TicketApi for MockTicketApi {
    fn list_tickets(&self) -> ApiFuture<'_, Result<Vec<Ticket>, ApiError>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        let response = self.next_list_response();
        let latency = *lock(&self.latency);

        Box::pin(async move {
            if !latency.is_zero() {
                tokio::time::sleep(latency).await;
            }
            match response {
                ListResponse::Tickets(tickets) => Ok(tickets),
                ListResponse::Failure(message) => Err(ApiError::Transport(message)),
            }
        })
    }

    fn create_ticket(&self, form: TicketForm) -> ApiFuture<'_, CreateTicketOutcome> {
        lock(&self.submitted).push(form);
        let outcome = lock(&self.create_outcome).clone();
        let latency = *lock(&self.latency);

        Box::pin(async move {
            if !latency.is_zero() {
                tokio::time::sleep(latency).await;
            }
            outcome
        })
    }
}

/// [`TicketStore`] where every operation fails with the same error
#[derive(Debug, Clone)]
pub struct FailingTicketStore {
    error: StorageError,
}

impl FailingTicketStore {
    /// Store failing with `error`
    #[must_use]
    pub const fn new(error: StorageError) -> Self {
        Self { error }
    }

    /// Store failing as if the database were down
    #[must_use]
    pub fn unavailable() -> Self {
        Self::new(StorageError::Unavailable("connection refused".to_string()))
    }
}

impl TicketStore for FailingTicketStore {
    fn insert(&self, _ticket: NewTicket) -> StoreFuture<'_, Ticket> {
        let error = self.error.clone();
        Box::pin(async move { Err(error) })
    }

    fn list_by_owner(&self, _owner: OwnerId) -> StoreFuture<'_, Vec<Ticket>> {
        let error = self.error.clone();
        Box::pin(async move { Err(error) })
    }

    fn get(&self, _owner: OwnerId, _id: TicketId) -> StoreFuture<'_, Option<Ticket>> {
        let error = self.error.clone();
        Box::pin(async move { Err(error) })
    }

    fn ping(&self) -> StoreFuture<'_, ()> {
        let error = self.error.clone();
        Box::pin(async move { Err(error) })
    }
}

/// [`Navigator`] that records every route it is asked to open
#[derive(Debug, Clone, Default)]
pub struct RecordingNavigator {
    routes: Arc<Mutex<Vec<Route>>>,
}

impl RecordingNavigator {
    /// Routes navigated to, in order
    #[must_use]
    pub fn routes(&self) -> Vec<Route> {
        lock(&self.routes).clone()
    }
}

impl Navigator for RecordingNavigator {
    fn navigate(&self, route: Route) {
        lock(&self.routes).push(route);
    }
}

/// [`ListInvalidator`] that records every owner it invalidates
#[derive(Debug, Clone, Default)]
pub struct RecordingInvalidator {
    owners: Arc<Mutex<Vec<OwnerId>>>,
}

impl RecordingInvalidator {
    /// Owners invalidated, in order
    #[must_use]
    pub fn invalidated(&self) -> Vec<OwnerId> {
        lock(&self.owners).clone()
    }
}

impl ListInvalidator for RecordingInvalidator {
    fn invalidate(&self, owner: &OwnerId) {
        lock(&self.owners).push(*owner);
    }
}
