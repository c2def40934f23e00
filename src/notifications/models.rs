//! Notification data models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::client::ClientError;

pub type NotificationId = i64;
pub type UserId = i64;

/// Notification type.
///
/// The backend set is open: values this client does not know are kept verbatim
/// in `Other` and rendered with the default icon.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum NotificationType {
    Like,
    Follow,
    Comment,
    Other(String),
}

impl NotificationType {
    pub fn as_str(&self) -> &str {
        match self {
            NotificationType::Like => "like",
            NotificationType::Follow => "follow",
            NotificationType::Comment => "comment",
            NotificationType::Other(raw) => raw,
        }
    }
}

impl From<String> for NotificationType {
    fn from(value: String) -> Self {
        match value.as_str() {
            "like" => NotificationType::Like,
            "follow" => NotificationType::Follow,
            "comment" => NotificationType::Comment,
            _ => NotificationType::Other(value),
        }
    }
}

impl From<NotificationType> for String {
    fn from(value: NotificationType) -> Self {
        match value {
            NotificationType::Other(raw) => raw,
            known => known.as_str().to_string(),
        }
    }
}

/// A notification directed at one recipient.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub id: NotificationId,
    pub recipient_id: UserId,
    pub sender_id: UserId,
    pub notification_type: NotificationType,
    pub message: String,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub post_id: Option<i64>,
}

/// Notification row as stored in the notifications table and delivered by the
/// push channel.
///
/// Every field is optional on the wire; conversion into [`Notification`]
/// rejects records missing a required field, so the store never holds a
/// partially populated notification.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NotificationRecord {
    pub id: Option<NotificationId>,
    pub recipient_id: Option<UserId>,
    pub sender_id: Option<UserId>,
    pub notification_type: Option<String>,
    pub message: Option<String>,
    pub is_read: Option<bool>,
    pub created_at: Option<DateTime<Utc>>,
    pub post_id: Option<i64>,
}

impl TryFrom<NotificationRecord> for Notification {
    type Error = ClientError;

    fn try_from(record: NotificationRecord) -> Result<Self, Self::Error> {
        fn required<T>(value: Option<T>, field: &'static str) -> Result<T, ClientError> {
            value.ok_or(ClientError::MalformedNotification(field))
        }

        Ok(Notification {
            id: required(record.id, "id")?,
            recipient_id: required(record.recipient_id, "recipient_id")?,
            sender_id: required(record.sender_id, "sender_id")?,
            notification_type: required(record.notification_type, "notification_type")?.into(),
            message: required(record.message, "message")?,
            // Rows are created unread unless the backend says otherwise
            is_read: record.is_read.unwrap_or(false),
            created_at: required(record.created_at, "created_at")?,
            post_id: record.post_id,
        })
    }
}

/// Sender as nested in rows of the REST list endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SenderSummary {
    pub id: Option<UserId>,
    #[serde(default)]
    pub username: Option<String>,
}

/// Notification row as served by `GET /api/notifications/`.
///
/// The endpoint only lists the authenticated user's notifications, so rows
/// carry no recipient; the sender is nested and the post is a bare id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ListedNotification {
    pub id: Option<NotificationId>,
    pub sender: Option<SenderSummary>,
    pub notification_type: Option<String>,
    pub post: Option<i64>,
    pub message: Option<String>,
    pub is_read: Option<bool>,
    pub seen_at: Option<DateTime<Utc>>,
    pub created_at: Option<DateTime<Utc>>,
}

impl ListedNotification {
    /// Convert a row fetched on behalf of `recipient_id`.
    pub fn into_notification(self, recipient_id: UserId) -> Result<Notification, ClientError> {
        Notification::try_from(NotificationRecord {
            id: self.id,
            recipient_id: Some(recipient_id),
            sender_id: self.sender.and_then(|sender| sender.id),
            notification_type: self.notification_type,
            message: self.message,
            is_read: self.is_read,
            created_at: self.created_at,
            post_id: self.post,
        })
    }
}

/// Read-only view of the store handed to UI surfaces.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NotificationSnapshot {
    pub notifications: Vec<Notification>,
    pub unread_count: usize,
}

impl NotificationSnapshot {
    pub fn has_unread(&self) -> bool {
        self.notifications.iter().any(|n| !n.is_read)
    }
}
