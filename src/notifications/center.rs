//! Shared owner of the notification store.
//!
//! All surfaces (bell, page, sidebar) read and mutate the same store through a
//! [`NotificationCenter`]. Mutations are serialized by a mutex and published to
//! watchers after every change. Each session gets an epoch; writes carrying an
//! older epoch are dropped, so a late fetch or a racing push callback can never
//! land in the store of a later session.

use std::sync::{Mutex, MutexGuard};

use tokio::sync::watch;
use tracing::debug;

use super::models::{Notification, NotificationId, NotificationSnapshot};
use super::store::NotificationStore;

/// Identifies one login session on a [`NotificationCenter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionEpoch(u64);

/// How a fetched snapshot affects the unread counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotMode {
    /// Keep a push-raised counter (bell dropdown).
    Passive,
    /// Derive the counter from the snapshot (full notifications page).
    Authoritative,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushOutcome {
    Inserted,
    Duplicate,
    /// The event belongs to a session that has ended.
    Stale,
}

struct CenterState {
    store: NotificationStore,
    epoch: u64,
    active: bool,
    /// Counter derived from a full list or set by the user this session;
    /// the server's unseen count no longer applies.
    counter_settled: bool,
}

impl CenterState {
    fn is_current(&self, epoch: SessionEpoch) -> bool {
        self.active && self.epoch == epoch.0
    }
}

pub struct NotificationCenter {
    state: Mutex<CenterState>,
    updates: watch::Sender<NotificationSnapshot>,
}

impl Default for NotificationCenter {
    fn default() -> Self {
        Self::new()
    }
}

impl NotificationCenter {
    pub fn new() -> Self {
        let (updates, _) = watch::channel(NotificationSnapshot::default());
        Self {
            state: Mutex::new(CenterState {
                store: NotificationStore::new(),
                epoch: 0,
                active: false,
                counter_settled: false,
            }),
            updates,
        }
    }

    fn lock(&self) -> MutexGuard<'_, CenterState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn publish(&self, state: &CenterState) {
        self.updates.send_replace(state.store.query());
    }

    /// Start a new session with an empty store.
    pub fn begin_session(&self) -> SessionEpoch {
        let mut state = self.lock();
        state.store.clear();
        state.epoch += 1;
        state.active = true;
        state.counter_settled = false;
        self.publish(&state);
        debug!("Notification session {} started", state.epoch);
        SessionEpoch(state.epoch)
    }

    /// End the current session: clear the store and invalidate its epoch.
    pub fn end_session(&self) {
        let mut state = self.lock();
        state.store.clear();
        state.epoch += 1;
        state.active = false;
        state.counter_settled = false;
        self.publish(&state);
        debug!("Notification session ended");
    }

    pub fn current_epoch(&self) -> Option<SessionEpoch> {
        let state = self.lock();
        state.active.then_some(SessionEpoch(state.epoch))
    }

    pub fn is_current(&self, epoch: SessionEpoch) -> bool {
        self.lock().is_current(epoch)
    }

    pub fn apply_push(&self, epoch: SessionEpoch, notification: Notification) -> PushOutcome {
        let mut state = self.lock();
        if !state.is_current(epoch) {
            debug!("Dropping push for notification {} from stale session", notification.id);
            return PushOutcome::Stale;
        }
        if state.store.insert_from_push(notification) {
            self.publish(&state);
            PushOutcome::Inserted
        } else {
            PushOutcome::Duplicate
        }
    }

    /// Apply a fetched snapshot. Returns false when the epoch is stale.
    pub fn apply_snapshot(
        &self,
        epoch: SessionEpoch,
        notifications: Vec<Notification>,
        mode: SnapshotMode,
    ) -> bool {
        let mut state = self.lock();
        if !state.is_current(epoch) {
            debug!("Dropping snapshot fetched by a stale session");
            return false;
        }
        state.store.load_snapshot(notifications);
        if mode == SnapshotMode::Authoritative {
            state.store.reconverge();
            state.counter_settled = true;
        }
        self.publish(&state);
        true
    }

    pub fn set_unread_count(&self, count: i64) {
        let mut state = self.lock();
        state.store.set_unread_count(count);
        state.counter_settled = true;
        self.publish(&state);
    }

    /// Seed the counter from the server's unseen count fetched under `epoch`.
    ///
    /// Ignored once the counter is settled: the server counts unseen rows,
    /// which drifts from the read flags after a full list load or a local
    /// mark-all-read.
    pub fn apply_unseen_count(&self, epoch: SessionEpoch, count: i64) -> bool {
        let mut state = self.lock();
        if !state.is_current(epoch) || state.counter_settled {
            return false;
        }
        state.store.set_unread_count(count);
        self.publish(&state);
        true
    }

    /// Mark everything read. Returns false when `epoch` is stale.
    pub fn mark_all_read(&self, epoch: SessionEpoch) -> bool {
        let mut state = self.lock();
        if !state.is_current(epoch) {
            return false;
        }
        state.store.mark_all_read();
        state.counter_settled = true;
        self.publish(&state);
        true
    }

    /// Mark one notification read. `None` when `epoch` is stale, otherwise
    /// whether anything changed.
    pub fn mark_read(&self, epoch: SessionEpoch, id: NotificationId) -> Option<bool> {
        let mut state = self.lock();
        if !state.is_current(epoch) {
            return None;
        }
        let changed = state.store.mark_read(id);
        if changed {
            self.publish(&state);
        }
        Some(changed)
    }

    pub fn query(&self) -> NotificationSnapshot {
        self.lock().store.query()
    }

    pub fn unread_count(&self) -> usize {
        self.lock().store.unread_count()
    }

    /// Watch every change. The receiver starts with the current state.
    pub fn subscribe(&self) -> watch::Receiver<NotificationSnapshot> {
        self.updates.subscribe()
    }
}
