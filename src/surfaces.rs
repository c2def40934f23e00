//! UI surfaces over the shared notification center.
//!
//! None of these hold their own copy of the list or the counter; they read
//! the center every time and only keep presentation state (open, loading).

use chrono::{DateTime, Utc};
use tokio::task::JoinHandle;

use crate::client::ClientError;
use crate::notifications::{
    badge_label, relative_time, Notification, NotificationCenter, NotificationId,
    NotificationSnapshot, SnapshotMode,
};
use crate::session::NotificationSession;

/// One rendered notification row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationLine {
    pub id: NotificationId,
    pub icon: &'static str,
    pub message: String,
    pub age: String,
    pub unread: bool,
}

impl NotificationLine {
    pub fn new(notification: &Notification, now: DateTime<Utc>) -> Self {
        Self {
            id: notification.id,
            icon: notification.notification_type.icon(),
            message: notification.message.clone(),
            age: relative_time(notification.created_at, now),
            unread: !notification.is_read,
        }
    }
}

fn lines(snapshot: &NotificationSnapshot, now: DateTime<Utc>) -> Vec<NotificationLine> {
    snapshot
        .notifications
        .iter()
        .map(|n| NotificationLine::new(n, now))
        .collect()
}

/// Bell icon with a badge and a dropdown of recent notifications.
#[derive(Debug, Default)]
pub struct NotificationBell {
    is_open: bool,
    loading: bool,
}

impl NotificationBell {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_open(&self) -> bool {
        self.is_open
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// Open or close the dropdown. Opening fetches the most recent page; the
    /// dropdown opens even when that fetch fails.
    pub async fn toggle(&mut self, session: &NotificationSession) -> Result<(), ClientError> {
        if self.is_open {
            self.is_open = false;
            return Ok(());
        }

        self.loading = true;
        let result = session
            .refresh(session.settings().bell_fetch_limit, SnapshotMode::Passive)
            .await;
        self.loading = false;
        self.is_open = true;
        result
    }

    pub fn close(&mut self) {
        self.is_open = false;
    }

    pub fn badge(&self, center: &NotificationCenter) -> Option<String> {
        badge_label(center.unread_count())
    }

    /// "Mark all as read" is offered only while something is unread.
    pub fn can_mark_all_read(&self, center: &NotificationCenter) -> bool {
        center.unread_count() > 0
    }

    pub fn mark_all_read(&self, session: &NotificationSession) -> Option<JoinHandle<()>> {
        session.mark_all_read()
    }

    pub fn lines(&self, center: &NotificationCenter, now: DateTime<Utc>) -> Vec<NotificationLine> {
        lines(&center.query(), now)
    }
}

/// Full notifications page.
#[derive(Debug, Default)]
pub struct NotificationsPage {
    loading: bool,
}

impl NotificationsPage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// Load the page. The page snapshot is authoritative for the counter.
    pub async fn open(&mut self, session: &NotificationSession) -> Result<(), ClientError> {
        self.loading = true;
        let result = session
            .refresh(session.settings().page_fetch_limit, SnapshotMode::Authoritative)
            .await;
        self.loading = false;
        result
    }

    /// Whether any listed notification is unread.
    pub fn has_unread(&self, center: &NotificationCenter) -> bool {
        center.query().has_unread()
    }

    pub fn mark_all_read(&self, session: &NotificationSession) -> Option<JoinHandle<()>> {
        session.mark_all_read()
    }

    pub fn lines(&self, center: &NotificationCenter, now: DateTime<Utc>) -> Vec<NotificationLine> {
        lines(&center.query(), now)
    }
}

/// Sidebar entry linking to the notifications page.
#[derive(Debug, Default)]
pub struct SidebarBadge;

impl SidebarBadge {
    pub fn new() -> Self {
        Self
    }

    pub fn badge(&self, center: &NotificationCenter) -> Option<String> {
        badge_label(center.unread_count())
    }

    /// Selecting the entry clears the counter; the list is left as is.
    pub fn select(&self, center: &NotificationCenter) {
        if center.unread_count() > 0 {
            center.set_unread_count(0);
        }
    }
}
