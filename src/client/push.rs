//! Push channel adapters.
//!
//! [`WsPushChannel`] reads notification inserts from a WebSocket;
//! [`BroadcastPushChannel`] fans them out in-process. Both filter by recipient
//! and stop delivering as soon as their [`Subscription`] is cancelled.

use async_trait::async_trait;
use futures::StreamExt;
use tokio::net::TcpStream;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::header::{HeaderValue, AUTHORIZATION, USER_AGENT};
use tokio_tungstenite::tungstenite::protocol::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::messages::{msg_types, system, ServerMessage};
use super::{ClientError, InsertCallback, PushChannel};
use crate::notifications::{Notification, NotificationRecord, UserId};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Handle to a live push subscription.
///
/// Cancelling (explicitly or by dropping the handle) stops delivery; the
/// reader task exits on its own shortly after.
pub struct Subscription {
    token: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl Subscription {
    pub fn new(token: CancellationToken, task: JoinHandle<()>) -> Self {
        Self {
            token,
            task: Some(task),
        }
    }

    /// Stop delivery. Safe to call more than once.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Wait until the reader task has exited (cancellation, remote close or
    /// transport error).
    pub async fn closed(&mut self) {
        if let Some(task) = self.task.as_mut() {
            let _ = task.await;
            self.task = None;
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

/// Pass a notification to the callback if it is addressed to `recipient_id`.
fn deliver(notification: Notification, recipient_id: UserId, on_insert: &InsertCallback) -> bool {
    if notification.recipient_id != recipient_id {
        debug!(
            "Ignoring notification {} addressed to user {}",
            notification.id, notification.recipient_id
        );
        return false;
    }
    on_insert(notification);
    true
}

/// Handle one text frame. Returns true if a notification was delivered.
fn handle_text(text: &str, recipient_id: UserId, on_insert: &InsertCallback) -> bool {
    let message: ServerMessage = match serde_json::from_str(text) {
        Ok(message) => message,
        Err(e) => {
            warn!("Ignoring unparseable push frame: {}", e);
            return false;
        }
    };

    match message.msg_type.as_str() {
        msg_types::NOTIFICATION_CREATED => {
            let decoded = serde_json::from_value::<NotificationRecord>(message.payload)
                .map_err(ClientError::from)
                .and_then(Notification::try_from);
            match decoded {
                Ok(notification) => deliver(notification, recipient_id, on_insert),
                Err(e) => {
                    warn!("Dropping malformed notification event: {}", e);
                    false
                }
            }
        }
        msg_types::CONNECTED => {
            debug!("Push channel connected for user {}", recipient_id);
            false
        }
        msg_types::ERROR => {
            match serde_json::from_value::<system::Error>(message.payload) {
                Ok(err) => warn!("Push channel error {}: {}", err.code, err.message),
                Err(_) => warn!("Push channel reported an error"),
            }
            false
        }
        other => {
            debug!("Ignoring push message of type {}", other);
            false
        }
    }
}

/// Push channel backed by a WebSocket connection.
pub struct WsPushChannel {
    ws_url: String,
    token: String,
}

impl WsPushChannel {
    pub fn new(ws_url: String, token: String) -> Self {
        Self { ws_url, token }
    }

    pub fn ws_url(&self) -> &str {
        &self.ws_url
    }

    async fn connect(&self, recipient_id: UserId) -> Result<WsStream, ClientError> {
        let mut url = reqwest::Url::parse(&self.ws_url)
            .map_err(|e| ClientError::InvalidUrl(format!("{}: {}", self.ws_url, e)))?;
        url.query_pairs_mut()
            .append_pair("recipient_id", &recipient_id.to_string());

        let mut request = url.as_str().into_client_request()?;
        let auth = HeaderValue::from_str(&format!("Bearer {}", self.token))
            .map_err(|_| ClientError::InvalidToken)?;
        request.headers_mut().insert(AUTHORIZATION, auth);
        if let Ok(agent) = HeaderValue::from_str(&crate::user_agent()) {
            request.headers_mut().insert(USER_AGENT, agent);
        }

        let (stream, _response) = connect_async(request).await?;
        Ok(stream)
    }
}

async fn read_loop(
    mut stream: WsStream,
    recipient_id: UserId,
    on_insert: InsertCallback,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            biased;

            _ = cancel.cancelled() => {
                debug!("Push subscription for user {} cancelled", recipient_id);
                let _ = stream.close(None).await;
                break;
            }
            frame = stream.next() => match frame {
                Some(Ok(Message::Text(text))) => {
                    handle_text(text.as_str(), recipient_id, &on_insert);
                }
                Some(Ok(Message::Close(frame))) => {
                    info!("Push channel closed by server: {:?}", frame);
                    break;
                }
                // Ping/pong are answered by tungstenite
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    warn!("Push channel transport error: {}", e);
                    break;
                }
                None => {
                    info!("Push channel stream ended");
                    break;
                }
            }
        }
    }
}

#[async_trait]
impl PushChannel for WsPushChannel {
    async fn subscribe(
        &self,
        recipient_id: UserId,
        on_insert: InsertCallback,
    ) -> Result<Subscription, ClientError> {
        let stream = self.connect(recipient_id).await?;
        info!("Subscribed to push notifications for user {}", recipient_id);

        let token = CancellationToken::new();
        let task = tokio::spawn(read_loop(stream, recipient_id, on_insert, token.clone()));
        Ok(Subscription::new(token, task))
    }
}

/// In-process push channel built on a tokio broadcast channel.
pub struct BroadcastPushChannel {
    sender: broadcast::Sender<Notification>,
}

impl BroadcastPushChannel {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an insert to every live subscription. Returns how many
    /// subscriptions received it.
    pub fn publish(&self, notification: Notification) -> usize {
        self.sender.send(notification).unwrap_or(0)
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

#[async_trait]
impl PushChannel for BroadcastPushChannel {
    async fn subscribe(
        &self,
        recipient_id: UserId,
        on_insert: InsertCallback,
    ) -> Result<Subscription, ClientError> {
        let mut rx = self.sender.subscribe();
        let token = CancellationToken::new();
        let cancel = token.clone();

        let task = tokio::spawn(async move {
            loop {
                tokio::select! {
                    biased;

                    _ = cancel.cancelled() => break,
                    received = rx.recv() => match received {
                        Ok(notification) => {
                            deliver(notification, recipient_id, &on_insert);
                        }
                        // Skipped inserts would never reach the counter; close
                        // so the owner resyncs
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            warn!(
                                "Push subscriber for user {} lagged by {} events, closing",
                                recipient_id, skipped
                            );
                            break;
                        }
                        Err(broadcast::error::RecvError::Closed) => break,
                    }
                }
            }
        });

        Ok(Subscription::new(token, task))
    }
}
