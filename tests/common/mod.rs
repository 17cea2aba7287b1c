//! Shared utilities for integration tests.

use std::collections::HashSet;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{post, put},
    Json, Router,
};
use tokio::net::TcpListener;

/// A request observed by the mock catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Seen {
    Post(String),
    Put(String),
    Delete(String),
}

#[derive(Clone, Default)]
struct CatalogState {
    seen: Arc<Mutex<Vec<Seen>>>,
    entries: Arc<Mutex<HashSet<String>>>,
    hang_deletes: Arc<AtomicBool>,
}

/// In-memory service catalog speaking the registration API under `/sc`.
#[derive(Clone)]
pub struct MockCatalog {
    pub addr: SocketAddr,
    state: CatalogState,
}

#[allow(dead_code)]
impl MockCatalog {
    /// Start on an ephemeral port.
    pub async fn start() -> Self {
        let state = CatalogState::default();
        let app = Router::new()
            .route("/sc/", post(add))
            .route("/sc/{*id}", put(update).delete(remove))
            .with_state(state.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Self { addr, state }
    }

    pub fn endpoint(&self) -> String {
        format!("http://{}/sc", self.addr)
    }

    pub fn seen(&self) -> Vec<Seen> {
        self.state.seen.lock().unwrap().clone()
    }

    pub fn count(&self, pred: impl Fn(&Seen) -> bool) -> usize {
        self.seen().iter().filter(|s| pred(s)).count()
    }

    pub fn is_registered(&self, id: &str) -> bool {
        self.state.entries.lock().unwrap().contains(id)
    }

    /// Insert an entry without recording a request.
    pub fn preload(&self, id: &str) {
        self.state.entries.lock().unwrap().insert(id.to_string());
    }

    /// Forget an entry as if its TTL had expired.
    pub fn expire(&self, id: &str) {
        self.state.entries.lock().unwrap().remove(id);
    }

    /// Make DELETE requests hang forever.
    pub fn hang_deletes(&self) {
        self.state.hang_deletes.store(true, Ordering::SeqCst);
    }
}

async fn add(State(state): State<CatalogState>, Json(body): Json<serde_json::Value>) -> StatusCode {
    let id = body["id"].as_str().unwrap_or_default().to_string();
    state.seen.lock().unwrap().push(Seen::Post(id.clone()));
    if state.entries.lock().unwrap().insert(id) {
        StatusCode::CREATED
    } else {
        StatusCode::CONFLICT
    }
}

async fn update(
    State(state): State<CatalogState>,
    Path(id): Path<String>,
    Json(_body): Json<serde_json::Value>,
) -> StatusCode {
    state.seen.lock().unwrap().push(Seen::Put(id.clone()));
    if state.entries.lock().unwrap().contains(&id) {
        StatusCode::OK
    } else {
        StatusCode::NOT_FOUND
    }
}

async fn remove(State(state): State<CatalogState>, Path(id): Path<String>) -> StatusCode {
    state.seen.lock().unwrap().push(Seen::Delete(id.clone()));
    if state.hang_deletes.load(Ordering::SeqCst) {
        tokio::time::sleep(Duration::from_secs(3600)).await;
    }
    if state.entries.lock().unwrap().remove(&id) {
        StatusCode::OK
    } else {
        StatusCode::NOT_FOUND
    }
}

/// An address nothing listens on.
#[allow(dead_code)]
pub async fn closed_endpoint() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}/sc", addr)
}
