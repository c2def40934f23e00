//! Client-side wiring for end-to-end tests
//!
//! Builds the library's HTTP and WebSocket adapters against a `TestServer`
//! and starts sessions on top of them.

use super::constants::*;
use social_notifications::client::{HttpNotificationsClient, WsPushChannel};
use social_notifications::notifications::{NotificationCenter, NotificationSnapshot};
use social_notifications::session::{Collaborators, NotificationSession, SessionSettings};
use social_notifications::toast::{Toast, ToastBus, ToastSubscription};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Everything a logged-in client needs, pointed at one test server
pub struct TestClient {
    pub http: Arc<HttpNotificationsClient>,
    pub push: Arc<WsPushChannel>,
    pub center: Arc<NotificationCenter>,
    pub toasts: ToastBus,
    /// Every toast raised so far
    pub raised_toasts: Arc<Mutex<Vec<Toast>>>,
    _toast_subscription: ToastSubscription,
}

impl TestClient {
    /// Creates a client using the valid test token
    pub fn new(server_base_url: &str, ws_url: &str) -> Self {
        Self::with_token(server_base_url, ws_url, TEST_TOKEN)
    }

    pub fn with_token(server_base_url: &str, ws_url: &str, token: &str) -> Self {
        let http = HttpNotificationsClient::new(
            server_base_url.to_string(),
            token.to_string(),
            REQUEST_TIMEOUT_SECS,
        )
        .expect("Failed to build HTTP client");
        let push = WsPushChannel::new(ws_url.to_string(), token.to_string());

        let toasts = ToastBus::new();
        let raised_toasts = Arc::new(Mutex::new(Vec::new()));
        let sink = raised_toasts.clone();
        let toast_subscription = toasts.subscribe(Arc::new(move |toast: &Toast| {
            sink.lock().unwrap().push(toast.clone())
        }));

        Self {
            http: Arc::new(http),
            push: Arc::new(push),
            center: Arc::new(NotificationCenter::new()),
            toasts,
            raised_toasts,
            _toast_subscription: toast_subscription,
        }
    }

    pub fn collaborators(&self) -> Collaborators {
        Collaborators {
            fetcher: self.http.clone(),
            push: self.push.clone(),
            receipts: self.http.clone(),
        }
    }

    /// Starts a session for the test user
    ///
    /// # Panics
    ///
    /// Panics if the push subscription cannot be established.
    pub async fn start_session(&self) -> NotificationSession {
        NotificationSession::start(
            self.center.clone(),
            self.collaborators(),
            self.toasts.clone(),
            SessionSettings::default(),
            TEST_USER_ID,
        )
        .await
        .expect("Failed to start session")
    }

    /// Waits until the center's state satisfies `predicate`
    ///
    /// # Panics
    ///
    /// Panics if that doesn't happen within `PUSH_TIMEOUT_MS`.
    pub async fn wait_until<F>(&self, predicate: F) -> NotificationSnapshot
    where
        F: Fn(&NotificationSnapshot) -> bool,
    {
        let mut updates = self.center.subscribe();
        let result = tokio::time::timeout(Duration::from_millis(PUSH_TIMEOUT_MS), async {
            loop {
                {
                    let snapshot = updates.borrow_and_update();
                    if predicate(&*snapshot) {
                        return (*snapshot).clone();
                    }
                }
                if updates.changed().await.is_err() {
                    panic!("Notification center dropped");
                }
            }
        })
        .await;

        match result {
            Ok(snapshot) => snapshot,
            Err(_) => panic!(
                "Condition not reached within {}ms, last state: {:?}",
                PUSH_TIMEOUT_MS,
                self.center.query()
            ),
        }
    }

    pub fn toast_count(&self) -> usize {
        self.raised_toasts.lock().unwrap().len()
    }
}
