//! Shared state of the HTTP handlers.

use crate::render::{Pages, RenderCache, RenderError};
use crate::services::{TicketCreationService, TicketQueryService};
use crate::session::SessionResolver;
use crate::store::TicketStore;
use helpdesk_core::environment::Clock;
use std::sync::Arc;

/// Everything the handlers need, cloned per request
#[derive(Clone)]
pub struct AppState {
    /// Read side
    pub query: TicketQueryService,
    /// Write side; invalidates `render_cache` on create
    pub creation: TicketCreationService,
    /// Bearer token lookup
    pub sessions: Arc<dyn SessionResolver>,
    /// Compiled dashboard templates
    pub pages: Arc<Pages>,
    /// Rendered dashboard pages per owner
    pub render_cache: Arc<RenderCache>,
}

impl AppState {
    /// Wire the services over `store` and compile the dashboard templates
    ///
    /// # Errors
    ///
    /// Returns [`RenderError`] if a template does not compile.
    pub fn new(
        store: Arc<dyn TicketStore>,
        sessions: Arc<dyn SessionResolver>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, RenderError> {
        let pages = Arc::new(Pages::new()?);
        let render_cache = Arc::new(RenderCache::new());
        let query = TicketQueryService::new(Arc::clone(&store));
        let creation = TicketCreationService::new(store, clock, render_cache.clone());

        Ok(Self {
            query,
            creation,
            sessions,
            pages,
            render_cache,
        })
    }
}
