//! Mock overlay HTTP server for integration tests.
//!
//! Serves `/submit` and `/lookup` over an in-memory ledger and can:
//! - Record the `X-Topics` header of every submission
//! - Replace lookup answers with a fixed JSON body

use std::net::SocketAddr;
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::routing::post;
use axum::{Json, Router};
use meter_overlay::{BroadcastResult, Broadcaster, LookupQuestion, LookupResolver, MemoryLedger};
use parking_lot::Mutex;
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::sync::mpsc;

#[derive(Clone)]
struct OverlayState {
    ledger: Arc<MemoryLedger>,
    topics: Arc<Mutex<Vec<String>>>,
    lookup_override: Arc<Mutex<Option<Value>>>,
}

/// A mock overlay server for testing.
pub struct MockOverlayServer {
    addr: SocketAddr,
    shutdown_tx: mpsc::Sender<()>,
    state: OverlayState,
}

impl MockOverlayServer {
    /// Start a new mock overlay on an available port.
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);

        let state = OverlayState {
            ledger: Arc::new(MemoryLedger::new()),
            topics: Arc::new(Mutex::new(Vec::new())),
            lookup_override: Arc::new(Mutex::new(None)),
        };
        let router = Router::new()
            .route("/submit", post(submit))
            .route("/lookup", post(lookup))
            .with_state(state.clone());

        tokio::spawn(async move {
            let _ = axum::serve(listener, router)
                .with_graceful_shutdown(async move {
                    let _ = shutdown_rx.recv().await;
                })
                .await;
        });

        Self {
            addr,
            shutdown_tx,
            state,
        }
    }

    /// Base URL of the overlay.
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn ledger(&self) -> Arc<MemoryLedger> {
        self.state.ledger.clone()
    }

    /// `X-Topics` header of every submission received.
    pub fn received_topics(&self) -> Vec<String> {
        self.state.topics.lock().clone()
    }

    /// Answer every following lookup with `answer`.
    pub fn set_lookup_answer(&self, answer: Value) {
        *self.state.lookup_override.lock() = Some(answer);
    }

    /// Shutdown the server.
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(()).await;
    }
}

async fn submit(
    State(state): State<OverlayState>,
    headers: HeaderMap,
    body: Bytes,
) -> Json<BroadcastResult> {
    let topics = headers
        .get("x-topics")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    state.topics.lock().push(topics);
    Json(state.ledger.submit(body.to_vec()).await)
}

async fn lookup(
    State(state): State<OverlayState>,
    Json(question): Json<LookupQuestion>,
) -> Json<Value> {
    let fixed = state.lookup_override.lock().clone();
    if let Some(answer) = fixed {
        return Json(answer);
    }
    match state.ledger.query(question).await {
        Ok(answer) => Json(answer.to_value()),
        Err(e) => Json(json!({ "type": "error", "description": e.to_string() })),
    }
}
