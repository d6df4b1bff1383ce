//! Integration tests for the HTTP routes, driven through `tower::ServiceExt::oneshot`.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)] // Test code can use unwrap/expect/panic

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    response::Response,
    Router,
};
use helpdesk::mocks::FailingTicketStore;
use helpdesk::render::{
    EMPTY_MESSAGE, LOAD_FAILED_MESSAGE, LOGIN_REQUIRED_MESSAGE, NOT_FOUND_MESSAGE,
};
use helpdesk::server::middleware::CORRELATION_ID_HEADER;
use helpdesk::server::{build_router, AppState};
use helpdesk::services::create::{
    CREATED_MESSAGE, DELETE_UNSUPPORTED_MESSAGE, INVALID_MESSAGE, INVALID_STATUS,
    SUBJECT_REQUIRED, UNAUTHENTICATED_MESSAGE, UPDATE_UNSUPPORTED_MESSAGE,
};
use helpdesk::session::StaticSessionResolver;
use helpdesk::store::{InMemoryTicketStore, StoreFuture, TicketStore};
use helpdesk::types::{NewTicket, OwnerId, Ticket, TicketId};
use helpdesk_testing::test_clock;
use serde_json::Value;
use std::sync::{Arc, Mutex};
use tokio::sync::oneshot;
use tower::ServiceExt;

// ============================================================================
// Test Fixtures
// ============================================================================

const ALICE: &str = "alice-token";
const BOB: &str = "bob-token";

#[derive(Clone)]
struct TestApp {
    router: Router,
}

impl TestApp {
    fn with_store(store: Arc<dyn TicketStore>) -> Self {
        let sessions = StaticSessionResolver::new([
            (ALICE.to_string(), OwnerId::new()),
            (BOB.to_string(), OwnerId::new()),
        ]);
        let state = AppState::new(store, Arc::new(sessions), Arc::new(test_clock())).unwrap();
        Self {
            router: build_router(state),
        }
    }

    fn new() -> Self {
        Self::with_store(Arc::new(InMemoryTicketStore::new()))
    }

    async fn send(&self, request: Request<Body>) -> Response {
        self.router.clone().oneshot(request).await.unwrap()
    }

    async fn get(&self, uri: &str, token: Option<&str>) -> Response {
        let mut request = Request::builder().uri(uri);
        if let Some(token) = token {
            request = request.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        self.send(request.body(Body::empty()).unwrap()).await
    }

    async fn form(&self, method: Method, uri: &str, token: Option<&str>, body: &str) -> Response {
        let mut request = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
        if let Some(token) = token {
            request = request.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        self.send(request.body(Body::from(body.to_string())).unwrap()).await
    }

    async fn create(&self, token: Option<&str>, body: &str) -> Response {
        self.form(Method::POST, "/api/tickets", token, body).await
    }
}

/// In-memory store whose first owner listing stalls after reading its
/// snapshot until the test releases it
struct StalledListingStore {
    inner: InMemoryTicketStore,
    snapshot_taken: Mutex<Option<oneshot::Sender<()>>>,
    release: Mutex<Option<oneshot::Receiver<()>>>,
}

impl StalledListingStore {
    fn new() -> (Self, oneshot::Receiver<()>, oneshot::Sender<()>) {
        let (taken_tx, taken_rx) = oneshot::channel();
        let (release_tx, release_rx) = oneshot::channel();
        let store = Self {
            inner: InMemoryTicketStore::new(),
            snapshot_taken: Mutex::new(Some(taken_tx)),
            release: Mutex::new(Some(release_rx)),
        };
        (store, taken_rx, release_tx)
    }
}

impl TicketStore for StalledListingStore {
    fn insert(&self, ticket: NewTicket) -> StoreFuture<'_, Ticket> {
        self.inner.insert(ticket)
    }

    fn list_by_owner(&self, owner: OwnerId) -> StoreFuture<'_, Vec<Ticket>> {
        Box::pin(async move {
            let tickets = self.inner.list_by_owner(owner).await?;
            let taken = self.snapshot_taken.lock().unwrap().take();
            let release = self.release.lock().unwrap().take();
            if let (Some(taken), Some(release)) = (taken, release) {
                taken.send(()).unwrap();
                release.await.unwrap();
            }
            Ok(tickets)
        })
    }

    fn get(&self, owner: OwnerId, id: TicketId) -> StoreFuture<'_, Option<Ticket>> {
        self.inner.get(owner, id)
    }

    fn ping(&self) -> StoreFuture<'_, ()> {
        self.inner.ping()
    }
}

async fn body_text(response: Response) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

async fn body_json(response: Response) -> Value {
    serde_json::from_str(&body_text(response).await).unwrap()
}

// ============================================================================
// Health
// ============================================================================

#[tokio::test]
async fn liveness_is_ok_and_carries_correlation_id() {
    let app = TestApp::new();
    let response = app.get("/health", None).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key(CORRELATION_ID_HEADER));
    assert_eq!(body_text(response).await, "ok");
}

#[tokio::test]
async fn readiness_reflects_store_health() {
    let healthy = TestApp::new().get("/health/ready", None).await;
    assert_eq!(healthy.status(), StatusCode::OK);
    let body = body_json(healthy).await;
    assert_eq!(body["status"], "Healthy");
    assert_eq!(body["metadata"][0][0], "latency_ms");

    let failing = TestApp::with_store(Arc::new(FailingTicketStore::unavailable()));
    let unhealthy = failing.get("/health/ready", None).await;
    assert_eq!(unhealthy.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body_json(unhealthy).await["component"], "ticket_store");
}

// ============================================================================
// Ticket API
// ============================================================================

#[tokio::test]
async fn anonymous_list_is_empty() {
    let response = TestApp::new().get("/api/tickets", None).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, serde_json::json!([]));
}

#[tokio::test]
async fn created_ticket_is_listed_for_its_owner_only() {
    let app = TestApp::new();

    let response = app
        .create(Some(ALICE), "subject=Printer&description=Out+of+toner&status=In+Progress")
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = body_json(response).await;
    assert_eq!(body["message"], CREATED_MESSAGE);
    assert_eq!(body["errors"], serde_json::json!({}));
    assert_eq!(body["ticket"]["status"], "Open");

    let listed: Vec<Ticket> =
        serde_json::from_str(&body_text(app.get("/api/tickets", Some(ALICE)).await).await).unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].subject, "Printer");

    let other = body_json(app.get("/api/tickets", Some(BOB)).await).await;
    assert_eq!(other, serde_json::json!([]));
}

#[tokio::test]
async fn empty_subject_is_unprocessable() {
    let app = TestApp::new();
    let response = app.create(Some(ALICE), "subject=&description=Broken").await;

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = body_json(response).await;
    assert_eq!(body["message"], INVALID_MESSAGE);
    assert_eq!(body["errors"]["subject"][0], SUBJECT_REQUIRED);
    assert!(body["errors"].get("description").is_none());
}

#[tokio::test]
async fn unknown_status_is_unprocessable() {
    let app = TestApp::new();
    let response = app
        .create(Some(ALICE), "subject=VPN&description=Down&status=Escalated")
        .await;

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body_json(response).await["errors"]["status"][0], INVALID_STATUS);
}

#[tokio::test]
async fn create_without_session_is_unauthorized() {
    let app = TestApp::new();

    let anonymous = app.create(None, "subject=VPN&description=Down").await;
    assert_eq!(anonymous.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(anonymous).await["message"], UNAUTHENTICATED_MESSAGE);

    let unknown = app.create(Some("stolen-token"), "subject=VPN&description=Down").await;
    assert_eq!(unknown.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn storage_failure_on_create_is_500() {
    let app = TestApp::with_store(Arc::new(FailingTicketStore::unavailable()));
    let response = app.create(Some(ALICE), "subject=VPN&description=Down").await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn storage_failure_on_list_is_503() {
    let app = TestApp::with_store(Arc::new(FailingTicketStore::unavailable()));
    let response = app.get("/api/tickets", Some(ALICE)).await;

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body_json(response).await["code"], "SERVICE_UNAVAILABLE");
}

#[tokio::test]
async fn ticket_lookup_is_scoped_to_owner() {
    let app = TestApp::new();
    let created = body_json(app.create(Some(ALICE), "subject=Mouse&description=Laggy").await).await;
    let id = created["ticket"]["id"].as_str().unwrap().to_string();

    let own = app.get(&format!("/api/tickets/{id}"), Some(ALICE)).await;
    assert_eq!(own.status(), StatusCode::OK);
    assert_eq!(body_json(own).await["subject"], "Mouse");

    let foreign = app.get(&format!("/api/tickets/{id}"), Some(BOB)).await;
    assert_eq!(foreign.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn update_and_delete_are_not_implemented() {
    let app = TestApp::new();
    let id = TicketId::new();

    let update = app
        .form(Method::PUT, &format!("/api/tickets/{id}"), Some(ALICE), "subject=x")
        .await;
    assert_eq!(update.status(), StatusCode::NOT_IMPLEMENTED);
    let body = body_json(update).await;
    assert_eq!(body["message"], UPDATE_UNSUPPORTED_MESSAGE);
    assert_eq!(body["errors"], serde_json::json!({}));

    let delete = app
        .send(
            Request::builder()
                .method(Method::DELETE)
                .uri(format!("/api/tickets/{id}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(delete.status(), StatusCode::NOT_IMPLEMENTED);
    assert_eq!(body_json(delete).await["message"], DELETE_UNSUPPORTED_MESSAGE);
}

// ============================================================================
// Dashboard
// ============================================================================

#[tokio::test]
async fn dashboard_asks_anonymous_users_to_log_in() {
    let response = TestApp::new().get("/dashboard/tickets", None).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await.contains(LOGIN_REQUIRED_MESSAGE));
}

#[tokio::test]
async fn dashboard_cache_is_invalidated_by_create() {
    let app = TestApp::new();

    let before = body_text(app.get("/dashboard/tickets", Some(ALICE)).await).await;
    assert!(before.contains(EMPTY_MESSAGE));

    app.create(Some(ALICE), "subject=Keyboard&description=Sticky+keys").await;

    let after = body_text(app.get("/dashboard/tickets", Some(ALICE)).await).await;
    assert!(after.contains("Keyboard"));
    assert!(!after.contains(EMPTY_MESSAGE));
}

#[tokio::test]
async fn dashboard_read_overtaken_by_create_is_not_cached() {
    let (store, snapshot_taken, release) = StalledListingStore::new();
    let app = TestApp::with_store(Arc::new(store));

    let reader = {
        let app = app.clone();
        tokio::spawn(async move { body_text(app.get("/dashboard/tickets", Some(ALICE)).await).await })
    };
    snapshot_taken.await.unwrap();

    let created = app.create(Some(ALICE), "subject=Keyboard&description=Sticky+keys").await;
    assert_eq!(created.status(), StatusCode::CREATED);
    release.send(()).unwrap();

    // The stalled read still answers with the snapshot it took
    assert!(reader.await.unwrap().contains(EMPTY_MESSAGE));

    for _ in 0..2 {
        let page = body_text(app.get("/dashboard/tickets", Some(ALICE)).await).await;
        assert!(page.contains("Keyboard"));
        assert!(!page.contains(EMPTY_MESSAGE));
    }
}

#[tokio::test]
async fn dashboard_detail_of_unknown_ticket_is_404() {
    let uri = format!("/dashboard/tickets/{}", TicketId::new());
    let response = TestApp::new().get(&uri, Some(ALICE)).await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(body_text(response).await.contains(NOT_FOUND_MESSAGE));
}

#[tokio::test]
async fn dashboard_reports_load_failure() {
    let app = TestApp::with_store(Arc::new(FailingTicketStore::unavailable()));
    let response = app.get("/dashboard/tickets", Some(ALICE)).await;

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert!(body_text(response).await.contains(LOAD_FAILED_MESSAGE));
}

#[tokio::test]
async fn create_form_page_is_served() {
    let response = TestApp::new().get("/dashboard/tickets/create", None).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await.contains("action=\"/api/tickets\""));
}
