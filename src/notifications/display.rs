//! Presentation helpers shared by the notification surfaces.

use chrono::{DateTime, Utc};

use super::models::NotificationType;

/// Badges stop counting here and show "99+".
pub const BADGE_MAX: usize = 99;

impl NotificationType {
    pub fn icon(&self) -> &'static str {
        match self {
            NotificationType::Like => "❤️",
            NotificationType::Follow => "➕",
            NotificationType::Comment => "💬",
            NotificationType::Other(_) => "🔔",
        }
    }
}

/// Badge text for an unread counter, `None` when there is nothing to show.
pub fn badge_label(unread_count: usize) -> Option<String> {
    match unread_count {
        0 => None,
        n if n > BADGE_MAX => Some(format!("{}+", BADGE_MAX)),
        n => Some(n.to_string()),
    }
}

/// Compact age of a notification: `now`, `5m`, `3h`, `2d`, `1w`.
pub fn relative_time(created_at: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let elapsed = now.signed_duration_since(created_at);
    if elapsed.num_days() >= 7 {
        format!("{}w", elapsed.num_weeks())
    } else if elapsed.num_days() > 0 {
        format!("{}d", elapsed.num_days())
    } else if elapsed.num_hours() > 0 {
        format!("{}h", elapsed.num_hours())
    } else if elapsed.num_minutes() > 0 {
        format!("{}m", elapsed.num_minutes())
    } else {
        "now".to_string()
    }
}
