//! Mock notifications backend
//!
//! Serves the REST endpoints under `/api/notifications/` and the push channel
//! at `/ws/notifications/`. Each test gets its own server on a random port.

use super::constants::*;
use super::fixtures::seeded_notifications;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, patch, post};
use axum::{Json, Router};
use chrono::Utc;
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use social_notifications::client::messages::{msg_types, system, ServerMessage};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

/// Everything the mock backend knows, shared with the test.
#[derive(Default)]
pub struct BackendState {
    /// Rows returned by the list endpoint, newest first
    pub notifications: Mutex<Vec<Value>>,
    /// `limit` query of every list request
    pub requested_limits: Mutex<Vec<usize>>,
    pub mark_all_read_calls: AtomicUsize,
    pub mark_seen_calls: AtomicUsize,
    pub read_ids: Mutex<Vec<i64>>,
    /// Make every write fail with 500
    pub fail_writes: AtomicBool,
    /// Connected push sockets
    push_clients: Mutex<Vec<mpsc::UnboundedSender<String>>>,
    live_sockets: AtomicUsize,
}

impl BackendState {
    fn set_all_read(&self) {
        let mut rows = self.notifications.lock().unwrap();
        for row in rows.iter_mut() {
            row["is_read"] = json!(true);
        }
    }

    fn set_all_seen(&self) {
        let now = json!(Utc::now().to_rfc3339());
        let mut rows = self.notifications.lock().unwrap();
        for row in rows.iter_mut().filter(|row| row["seen_at"].is_null()) {
            row["seen_at"] = now.clone();
        }
    }

    fn set_read(&self, id: i64) -> bool {
        let mut rows = self.notifications.lock().unwrap();
        match rows.iter_mut().find(|row| row["id"] == json!(id)) {
            Some(row) => {
                row["is_read"] = json!(true);
                true
            }
            None => false,
        }
    }
}

fn is_authorized(headers: &HeaderMap) -> bool {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .map(|value| value == format!("Bearer {}", TEST_TOKEN))
        .unwrap_or(false)
}

/// Render a stored row the way the backend's list serializer does: nested
/// sender, bare post id, no recipient.
fn serialize_row(row: &Value) -> Value {
    let mut fields = Map::new();
    for key in ["id", "notification_type", "message", "is_read", "seen_at", "created_at"] {
        if let Some(value) = row.get(key) {
            fields.insert(key.to_string(), value.clone());
        }
    }
    fields.insert(
        "sender".to_string(),
        json!({ "id": row["sender_id"], "username": format!("user{}", row["sender_id"]) }),
    );
    fields.insert(
        "post".to_string(),
        row.get("post_id").cloned().unwrap_or(Value::Null),
    );
    fields.insert("time_ago".to_string(), json!("now"));
    fields.insert("post_thumbnail".to_string(), Value::Null);
    Value::Object(fields)
}

fn is_own(row: &Value) -> bool {
    row["recipient_id"] == json!(TEST_USER_ID)
}

#[derive(Deserialize)]
struct ListParams {
    limit: Option<usize>,
}

async fn list_notifications(
    State(state): State<Arc<BackendState>>,
    headers: HeaderMap,
    Query(params): Query<ListParams>,
) -> Response {
    if !is_authorized(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    // Backend default page size is 20
    let limit = params.limit.unwrap_or(20);
    state.requested_limits.lock().unwrap().push(limit);

    let rows: Vec<Value> = state
        .notifications
        .lock()
        .unwrap()
        .iter()
        .filter(|row| is_own(row))
        .take(limit)
        .map(serialize_row)
        .collect();
    Json(rows).into_response()
}

async fn unread_count(State(state): State<Arc<BackendState>>, headers: HeaderMap) -> Response {
    if !is_authorized(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    // Counts unseen rows, not unread ones
    let count = state
        .notifications
        .lock()
        .unwrap()
        .iter()
        .filter(|row| is_own(row) && row["seen_at"].is_null())
        .count();
    Json(json!({ "unread_count": count })).into_response()
}

async fn mark_all_read(State(state): State<Arc<BackendState>>, headers: HeaderMap) -> Response {
    if !is_authorized(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    state.mark_all_read_calls.fetch_add(1, Ordering::SeqCst);
    if state.fail_writes.load(Ordering::SeqCst) {
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }
    state.set_all_read();
    Json(json!({ "status": "ok" })).into_response()
}

async fn mark_seen(State(state): State<Arc<BackendState>>, headers: HeaderMap) -> Response {
    if !is_authorized(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    state.mark_seen_calls.fetch_add(1, Ordering::SeqCst);
    if state.fail_writes.load(Ordering::SeqCst) {
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }
    state.set_all_seen();
    Json(json!({ "message": "Notifications marked as seen" })).into_response()
}

async fn mark_read(
    State(state): State<Arc<BackendState>>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Response {
    if !is_authorized(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    state.read_ids.lock().unwrap().push(id);
    if state.fail_writes.load(Ordering::SeqCst) {
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }
    if !state.set_read(id) {
        return StatusCode::NOT_FOUND.into_response();
    }
    Json(json!({ "status": "ok" })).into_response()
}

#[derive(Deserialize)]
struct PushParams {
    recipient_id: i64,
}

async fn push_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<BackendState>>,
    headers: HeaderMap,
    Query(params): Query<PushParams>,
) -> Response {
    if !is_authorized(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    ws.on_upgrade(move |socket| handle_socket(socket, params.recipient_id, state))
}

/// Forward pushed frames to one socket until either side goes away.
async fn handle_socket(socket: WebSocket, recipient_id: i64, state: Arc<BackendState>) {
    let (outgoing_tx, mut outgoing_rx) = mpsc::unbounded_channel::<String>();
    state.live_sockets.fetch_add(1, Ordering::SeqCst);

    let (mut ws_sink, mut ws_stream) = socket.split();

    let connected = ServerMessage::new(msg_types::CONNECTED, system::Connected { recipient_id });
    let connected = serde_json::to_string(&connected).unwrap();
    if ws_sink.send(Message::Text(connected.into())).await.is_ok() {
        // Registered only once the greeting is out, so a push never overtakes it
        state.push_clients.lock().unwrap().push(outgoing_tx);

        loop {
            tokio::select! {
                outgoing = outgoing_rx.recv() => match outgoing {
                    Some(text) => {
                        if ws_sink.send(Message::Text(text.into())).await.is_err() {
                            break;
                        }
                    }
                    None => break,
                },
                incoming = ws_stream.next() => match incoming {
                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                    Some(Ok(_)) => {}
                },
            }
        }
    }

    drop(outgoing_rx);
    state
        .push_clients
        .lock()
        .unwrap()
        .retain(|client| !client.is_closed());
    state.live_sockets.fetch_sub(1, Ordering::SeqCst);
}

fn make_app(state: Arc<BackendState>) -> Router {
    Router::new()
        .route("/", get(|| async { "ok" }))
        .route("/api/notifications/", get(list_notifications))
        .route("/api/notifications/unread-count/", get(unread_count))
        .route("/api/notifications/mark-seen/", patch(mark_seen))
        .route("/api/notifications/mark-all-read/", post(mark_all_read))
        .route("/api/notifications/{id}/read/", post(mark_read))
        .route("/ws/notifications/", get(push_handler))
        .with_state(state)
}

/// Test server instance with its own backend state
///
/// When dropped, the server gracefully shuts down.
pub struct TestServer {
    /// Base URL for making requests (e.g., "http://127.0.0.1:12345")
    pub base_url: String,

    /// The port the server is listening on
    pub port: u16,

    /// Backend state for direct inspection and seeding in tests
    pub state: Arc<BackendState>,

    _shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
}

impl TestServer {
    /// Spawns an empty backend on a random port
    ///
    /// # Panics
    ///
    /// Panics if port binding fails or the server doesn't become ready
    /// within timeout.
    pub async fn spawn() -> Self {
        let state = Arc::new(BackendState::default());

        // Bind to random port
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind to random port");

        let port = listener
            .local_addr()
            .expect("Failed to get local address")
            .port();

        let base_url = format!("http://127.0.0.1:{}", port);

        // Create shutdown channel
        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();

        let app = make_app(state.clone());

        // Spawn server in background task with graceful shutdown
        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    shutdown_rx.await.ok();
                })
                .await
                .expect("Server failed");
        });

        let server = Self {
            base_url,
            port,
            state,
            _shutdown_tx: Some(shutdown_tx),
        };

        server.wait_for_ready().await;

        server
    }

    /// Spawns a backend pre-loaded with `seeded_notifications()`
    pub async fn spawn_seeded() -> Self {
        let server = Self::spawn().await;
        server.seed(seeded_notifications());
        server
    }

    /// URL of the push endpoint
    pub fn ws_url(&self) -> String {
        format!("ws://127.0.0.1:{}/ws/notifications/", self.port)
    }

    /// Replace the rows served by the list endpoint
    pub fn seed(&self, rows: Vec<Value>) {
        *self.state.notifications.lock().unwrap() = rows;
    }

    /// Send a `notification_created` frame to every connected socket.
    /// Returns how many sockets it was queued for.
    pub fn push_notification(&self, row: &Value) -> usize {
        let frame = ServerMessage::new(msg_types::NOTIFICATION_CREATED, row);
        self.push_raw(&serde_json::to_string(&frame).unwrap())
    }

    /// Send an arbitrary text frame to every connected socket
    pub fn push_raw(&self, text: &str) -> usize {
        let clients = self.state.push_clients.lock().unwrap();
        clients
            .iter()
            .filter(|client| client.send(text.to_string()).is_ok())
            .count()
    }

    /// Drop the server side of every push socket
    pub fn disconnect_push_clients(&self) {
        self.state.push_clients.lock().unwrap().clear();
    }

    pub fn live_sockets(&self) -> usize {
        self.state.live_sockets.load(Ordering::SeqCst)
    }

    /// Wait until exactly `count` sockets are connected and ready to receive
    pub async fn wait_for_push_clients(&self, count: usize) {
        let deadline = std::time::Instant::now() + Duration::from_millis(PUSH_TIMEOUT_MS);
        loop {
            let ready = self.state.push_clients.lock().unwrap().len();
            if ready == count && self.live_sockets() == count {
                return;
            }
            if std::time::Instant::now() > deadline {
                panic!(
                    "Expected {} push clients, have {} ({} sockets)",
                    count,
                    ready,
                    self.live_sockets()
                );
            }
            tokio::time::sleep(Duration::from_millis(SERVER_READY_POLL_INTERVAL_MS)).await;
        }
    }

    /// Waits for the server to become ready by polling the root endpoint
    async fn wait_for_ready(&self) {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(100))
            .build()
            .expect("Failed to build reqwest client");

        let start = std::time::Instant::now();
        let timeout = Duration::from_millis(SERVER_READY_TIMEOUT_MS);

        loop {
            if start.elapsed() > timeout {
                panic!(
                    "Server did not become ready within {}ms",
                    SERVER_READY_TIMEOUT_MS
                );
            }

            match client.get(format!("{}/", self.base_url)).send().await {
                Ok(response) if response.status().is_success() => {
                    return;
                }
                _ => {
                    tokio::time::sleep(Duration::from_millis(SERVER_READY_POLL_INTERVAL_MS)).await;
                }
            }
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(tx) = self._shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}
