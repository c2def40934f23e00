//! Collaborators the notification core talks to: the REST backend (snapshot
//! fetch, read receipts) and the realtime push channel.

pub mod http;
pub mod messages;
pub mod push;

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::notifications::{Notification, NotificationId, UserId};

pub use http::HttpNotificationsClient;
pub use push::{BroadcastPushChannel, Subscription, WsPushChannel};

/// Errors raised by the fetch and push adapters.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Request to {url} failed with status {status}")]
    Status {
        status: reqwest::StatusCode,
        url: String,
    },

    #[error("Malformed notification: missing {0}")]
    MalformedNotification(&'static str),

    #[error("Failed to decode payload: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("WebSocket error: {0}")]
    WebSocket(Box<tokio_tungstenite::tungstenite::Error>),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Auth token is not a valid header value")]
    InvalidToken,
}

impl From<tokio_tungstenite::tungstenite::Error> for ClientError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        ClientError::WebSocket(Box::new(err))
    }
}

/// Source of notification snapshots.
#[async_trait]
pub trait NotificationFetcher: Send + Sync {
    /// Most recent `limit` notifications of `recipient_id`, newest first.
    async fn fetch_recent(
        &self,
        recipient_id: UserId,
        limit: usize,
    ) -> Result<Vec<Notification>, ClientError>;

    /// Server-side count of notifications not yet seen, for backends that
    /// expose one.
    ///
    /// "Seen" is tracked apart from "read": marking everything read does not
    /// lower this count, only [`ReadReceipts::mark_seen`] does.
    async fn unseen_count(&self) -> Result<Option<i64>, ClientError> {
        Ok(None)
    }
}

/// Remote side of "mark as read". Calls are best-effort.
#[async_trait]
pub trait ReadReceipts: Send + Sync {
    async fn mark_all_read(&self) -> Result<(), ClientError>;

    async fn mark_read(&self, id: NotificationId) -> Result<(), ClientError>;

    /// Mark every notification as seen.
    async fn mark_seen(&self) -> Result<(), ClientError>;
}

/// Invoked for every notification delivered by a push subscription.
pub type InsertCallback = Arc<dyn Fn(Notification) + Send + Sync>;

/// Realtime delivery of newly created notifications.
#[async_trait]
pub trait PushChannel: Send + Sync {
    /// Subscribe to inserts addressed to `recipient_id`.
    ///
    /// Delivery is at-least-once and not ordered. Events for other recipients
    /// are never passed to `on_insert`. An adapter that cannot keep up ends
    /// the subscription instead of skipping events, so the owner sees it
    /// close and can resync.
    async fn subscribe(
        &self,
        recipient_id: UserId,
        on_insert: InsertCallback,
    ) -> Result<Subscription, ClientError>;
}
