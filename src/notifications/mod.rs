//! User notifications: model, per-session store and the shared center

mod center;
mod display;
mod models;
mod store;

pub use center::{NotificationCenter, PushOutcome, SessionEpoch, SnapshotMode};
pub use display::{badge_label, relative_time, BADGE_MAX};
pub use models::{
    ListedNotification, Notification, NotificationId, NotificationRecord, NotificationSnapshot,
    NotificationType, SenderSummary, UserId,
};
pub use store::NotificationStore;
