//! Notification session lifecycle.
//!
//! A [`NotificationSession`] exists for as long as a user is logged in. Starting
//! it clears the center and subscribes to pushes for that user; ending it (or
//! dropping it) cancels the subscription and clears the center again.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::client::{
    ClientError, InsertCallback, NotificationFetcher, PushChannel, ReadReceipts, Subscription,
};
use crate::notifications::{
    NotificationCenter, NotificationId, NotificationSnapshot, PushOutcome, SessionEpoch,
    SnapshotMode, UserId,
};
use crate::toast::ToastBus;

/// External services a session talks to.
#[derive(Clone)]
pub struct Collaborators {
    pub fetcher: Arc<dyn NotificationFetcher>,
    pub push: Arc<dyn PushChannel>,
    pub receipts: Arc<dyn ReadReceipts>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSettings {
    /// Page size fetched when the bell dropdown opens.
    pub bell_fetch_limit: usize,
    /// Page size fetched by the notifications page.
    pub page_fetch_limit: usize,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            bell_fetch_limit: 10,
            page_fetch_limit: 20,
        }
    }
}

pub struct NotificationSession {
    center: Arc<NotificationCenter>,
    collaborators: Collaborators,
    toasts: ToastBus,
    settings: SessionSettings,
    user_id: UserId,
    epoch: SessionEpoch,
    subscription: Option<Subscription>,
}

impl NotificationSession {
    /// Start a session for `user_id` (login or session restore).
    ///
    /// Fails if the push subscription cannot be established; the center is
    /// left cleared in that case.
    pub async fn start(
        center: Arc<NotificationCenter>,
        collaborators: Collaborators,
        toasts: ToastBus,
        settings: SessionSettings,
        user_id: UserId,
    ) -> Result<Self, ClientError> {
        let epoch = center.begin_session();

        let sink = center.clone();
        let on_insert: InsertCallback = Arc::new(move |notification| {
            let id = notification.id;
            match sink.apply_push(epoch, notification) {
                PushOutcome::Inserted => debug!("Pushed notification {} stored", id),
                PushOutcome::Duplicate => debug!("Pushed notification {} already known", id),
                PushOutcome::Stale => {}
            }
        });

        let subscription = match collaborators.push.subscribe(user_id, on_insert).await {
            Ok(subscription) => subscription,
            Err(e) => {
                error!("Failed to subscribe to notifications for user {}: {}", user_id, e);
                toasts.error("Live notifications are unavailable");
                if center.is_current(epoch) {
                    center.end_session();
                }
                return Err(e);
            }
        };

        info!("Notification session started for user {}", user_id);
        Ok(Self {
            center,
            collaborators,
            toasts,
            settings,
            user_id,
            epoch,
            subscription: Some(subscription),
        })
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    pub fn epoch(&self) -> SessionEpoch {
        self.epoch
    }

    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    pub fn center(&self) -> &Arc<NotificationCenter> {
        &self.center
    }

    /// False once the session has ended or a newer one took over the center.
    pub fn is_active(&self) -> bool {
        self.center.is_current(self.epoch)
    }

    pub fn snapshot(&self) -> NotificationSnapshot {
        self.center.query()
    }

    /// Fetch the most recent `limit` notifications and load them.
    ///
    /// On failure the error is reported and returned; the store is untouched.
    pub async fn refresh(&self, limit: usize, mode: SnapshotMode) -> Result<(), ClientError> {
        match self
            .collaborators
            .fetcher
            .fetch_recent(self.user_id, limit)
            .await
        {
            Ok(notifications) => {
                if !self.center.apply_snapshot(self.epoch, notifications, mode) {
                    debug!("Session ended while fetching, snapshot discarded");
                }
                Ok(())
            }
            Err(e) => {
                error!("Error fetching notifications: {}", e);
                self.toasts.error("Could not load notifications");
                Err(e)
            }
        }
    }

    /// Seed the counter from the server's unseen count, when the backend
    /// provides one. Returns whether the counter was updated.
    ///
    /// Has no effect once a full page load or a local mark-all-read has
    /// settled the counter for this session.
    pub async fn sync_unread_count(&self) -> Result<bool, ClientError> {
        match self.collaborators.fetcher.unseen_count().await {
            Ok(Some(count)) => Ok(self.center.apply_unseen_count(self.epoch, count)),
            Ok(None) => Ok(false),
            Err(e) => {
                warn!("Error fetching unread count: {}", e);
                Err(e)
            }
        }
    }

    /// Mark everything read locally, then tell the backend without waiting.
    /// Everything is marked seen on the backend as well.
    ///
    /// The local transition is final: a failed remote call is logged and not
    /// rolled back. Returns the handle of the remote calls, `None` if the
    /// session is no longer active.
    pub fn mark_all_read(&self) -> Option<JoinHandle<()>> {
        if !self.center.mark_all_read(self.epoch) {
            return None;
        }

        let receipts = self.collaborators.receipts.clone();
        Some(tokio::spawn(async move {
            if let Err(e) = receipts.mark_all_read().await {
                warn!("Remote mark-all-read failed, keeping local state: {}", e);
            }
            if let Err(e) = receipts.mark_seen().await {
                warn!("Remote mark-seen failed: {}", e);
            }
        }))
    }

    /// Mark one notification read, same policy as [`Self::mark_all_read`].
    pub fn mark_read(&self, id: NotificationId) -> Option<JoinHandle<()>> {
        self.center.mark_read(self.epoch, id)?;

        let receipts = self.collaborators.receipts.clone();
        Some(tokio::spawn(async move {
            if let Err(e) = receipts.mark_read(id).await {
                warn!("Remote mark-read of {} failed, keeping local state: {}", id, e);
            }
        }))
    }

    /// Wait until the push subscription stops on its own (remote close or
    /// transport error).
    pub async fn push_closed(&mut self) {
        if let Some(subscription) = self.subscription.as_mut() {
            subscription.closed().await;
        }
    }

    /// End the session (logout).
    pub fn end(mut self) {
        self.teardown();
    }

    fn teardown(&mut self) {
        // Unsubscribe first so no callback races the clear below
        if let Some(subscription) = self.subscription.take() {
            subscription.cancel();
        }
        if self.center.is_current(self.epoch) {
            self.center.end_session();
            info!("Notification session ended for user {}", self.user_id);
        }
    }
}

impl Drop for NotificationSession {
    fn drop(&mut self) {
        self.teardown();
    }
}
