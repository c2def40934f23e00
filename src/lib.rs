//! Social Notifications Client Library
//!
//! Keeps a user's notification list and unread counter consistent across
//! push events, fetched snapshots and local read actions.

pub mod client;
pub mod config;
pub mod notifications;
pub mod session;
pub mod surfaces;
pub mod toast;

// Re-export commonly used types for convenience
pub use client::{ClientError, HttpNotificationsClient, WsPushChannel};
pub use notifications::{NotificationCenter, NotificationSnapshot, SnapshotMode};
pub use session::{Collaborators, NotificationSession, SessionSettings};
pub use toast::ToastBus;

/// User agent sent with every HTTP and WebSocket request.
pub fn user_agent() -> String {
    format!(
        "social-notifications/{}-{}",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH")
    )
}
