//! In-memory notification list and unread counter for one session.

use std::collections::HashSet;

use super::models::{Notification, NotificationId, NotificationSnapshot};

/// Canonical notification list plus unread counter.
///
/// `unread_count` is maintained incrementally and may run ahead of the list:
/// a push can announce an unread event that the next (paginated) snapshot does
/// not contain. The drift closes on [`NotificationStore::reconverge`].
#[derive(Debug, Default)]
pub struct NotificationStore {
    /// Newest first, unique by id.
    notifications: Vec<Notification>,
    unread_count: usize,
    /// Ids the user marked read during this session.
    locally_read: HashSet<NotificationId>,
}

impl NotificationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the list with a fetched snapshot.
    ///
    /// The counter is only derived from the snapshot while it is zero. Once a
    /// push has counted an event, a snapshot that may not include it must not
    /// hide it.
    pub fn load_snapshot(&mut self, notifications: Vec<Notification>) {
        let mut seen = HashSet::with_capacity(notifications.len());
        self.notifications = notifications
            .into_iter()
            .filter(|n| seen.insert(n.id))
            .map(|mut n| {
                if self.locally_read.contains(&n.id) {
                    n.is_read = true;
                }
                n
            })
            .collect();

        if self.unread_count == 0 {
            self.unread_count = self.derived_unread_count();
        }
    }

    /// Insert a pushed notification at the head of the list.
    ///
    /// Returns false (and changes nothing) when the id is already present.
    pub fn insert_from_push(&mut self, mut notification: Notification) -> bool {
        if self.contains(notification.id) {
            return false;
        }
        if self.locally_read.contains(&notification.id) {
            notification.is_read = true;
        }
        if !notification.is_read {
            self.unread_count += 1;
        }
        self.notifications.insert(0, notification);
        true
    }

    pub fn set_unread_count(&mut self, count: i64) {
        self.unread_count = usize::try_from(count).unwrap_or(0);
    }

    pub fn mark_all_read(&mut self) {
        for notification in self.notifications.iter_mut() {
            notification.is_read = true;
            self.locally_read.insert(notification.id);
        }
        self.set_unread_count(0);
    }

    /// Mark a single notification read.
    ///
    /// Returns true if it was present and unread.
    pub fn mark_read(&mut self, id: NotificationId) -> bool {
        self.locally_read.insert(id);
        match self.notifications.iter_mut().find(|n| n.id == id) {
            Some(notification) if !notification.is_read => {
                notification.is_read = true;
                self.unread_count = self.unread_count.saturating_sub(1);
                true
            }
            _ => false,
        }
    }

    /// Unread count as derived from the list alone.
    pub fn derived_unread_count(&self) -> usize {
        self.notifications.iter().filter(|n| !n.is_read).count()
    }

    /// Drop any drift and trust the list.
    pub fn reconverge(&mut self) {
        self.unread_count = self.derived_unread_count();
    }

    pub fn clear(&mut self) {
        self.notifications.clear();
        self.unread_count = 0;
        self.locally_read.clear();
    }

    pub fn unread_count(&self) -> usize {
        self.unread_count
    }

    pub fn len(&self) -> usize {
        self.notifications.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notifications.is_empty()
    }

    pub fn contains(&self, id: NotificationId) -> bool {
        self.notifications.iter().any(|n| n.id == id)
    }

    pub fn query(&self) -> NotificationSnapshot {
        NotificationSnapshot {
            notifications: self.notifications.clone(),
            unread_count: self.unread_count,
        }
    }
}
