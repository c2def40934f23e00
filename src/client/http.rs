//! HTTP client for the notifications REST API.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::debug;

use super::{ClientError, NotificationFetcher, ReadReceipts};
use crate::notifications::{ListedNotification, Notification, NotificationId, UserId};

/// Either a bare list or a paginated envelope, depending on backend settings.
#[derive(Deserialize)]
#[serde(untagged)]
enum NotificationPage {
    List(Vec<ListedNotification>),
    Paginated { results: Vec<ListedNotification> },
}

impl NotificationPage {
    fn into_records(self) -> Vec<ListedNotification> {
        match self {
            NotificationPage::List(records) => records,
            NotificationPage::Paginated { results } => results,
        }
    }
}

/// Body of `unread-count/`. The backend counts rows with no `seen_at`.
#[derive(Deserialize)]
struct UnreadCountResponse {
    unread_count: i64,
}

/// Authenticated client for `/api/notifications/`.
#[derive(Clone)]
pub struct HttpNotificationsClient {
    client: Client,
    base_url: String,
    token: String,
}

impl HttpNotificationsClient {
    /// Create a new client.
    ///
    /// # Arguments
    /// * `base_url` - Backend root (e.g., "http://localhost:8000")
    /// * `token` - Bearer token of the logged-in user
    /// * `timeout_sec` - Request timeout in seconds
    pub fn new(base_url: String, token: String, timeout_sec: u64) -> Result<Self, ClientError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_sec))
            .user_agent(crate::user_agent())
            .build()?;

        let base_url = base_url.trim_end_matches('/').to_string();

        Ok(Self {
            client,
            base_url,
            token,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api/notifications/{}", self.base_url, path)
    }

    fn check_status(response: Response) -> Result<Response, ClientError> {
        let status = response.status();
        if status.is_success() {
            Ok(response)
        } else {
            Err(ClientError::Status {
                status,
                url: response.url().to_string(),
            })
        }
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<T, ClientError> {
        let response = self
            .client
            .get(url)
            .bearer_auth(&self.token)
            .query(query)
            .send()
            .await?;
        let body = Self::check_status(response)?.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }

    async fn send(&self, request: RequestBuilder) -> Result<(), ClientError> {
        let response = request.bearer_auth(&self.token).send().await?;
        Self::check_status(response)?;
        Ok(())
    }
}

#[async_trait]
impl NotificationFetcher for HttpNotificationsClient {
    async fn fetch_recent(
        &self,
        recipient_id: UserId,
        limit: usize,
    ) -> Result<Vec<Notification>, ClientError> {
        let page: NotificationPage = self
            .get_json(&self.url(""), &[("limit", limit.to_string())])
            .await?;

        // One bad row fails the whole snapshot
        let mut notifications = page
            .into_records()
            .into_iter()
            .map(|row| row.into_notification(recipient_id))
            .collect::<Result<Vec<_>, _>>()?;

        notifications.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        notifications.truncate(limit);

        debug!("Fetched {} notifications", notifications.len());
        Ok(notifications)
    }

    async fn unseen_count(&self) -> Result<Option<i64>, ClientError> {
        let response: UnreadCountResponse = self.get_json(&self.url("unread-count/"), &[]).await?;
        Ok(Some(response.unread_count))
    }
}

#[async_trait]
impl ReadReceipts for HttpNotificationsClient {
    async fn mark_all_read(&self) -> Result<(), ClientError> {
        self.send(self.client.post(self.url("mark-all-read/"))).await
    }

    async fn mark_read(&self, id: NotificationId) -> Result<(), ClientError> {
        self.send(self.client.post(self.url(&format!("{}/read/", id))))
            .await
    }

    async fn mark_seen(&self) -> Result<(), ClientError> {
        self.send(self.client.patch(self.url("mark-seen/"))).await
    }
}
