use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Categories of in-app notifications surfaced to the owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    Reminder,
    Success,
    Warning,
    Info,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::Reminder => "reminder",
            NotificationKind::Success => "success",
            NotificationKind::Warning => "warning",
            NotificationKind::Info => "info",
        }
    }
}

/// A delivered in-app record, independent of read state.
///
/// Created by the in-app channel on successful dispatch; mutated by the
/// owner marking it read; pruned by the maintenance worker after expiry.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct InAppNotification {
    /// Primary key (UUID)
    pub id: String,

    pub owner_id: String,

    pub title: String,

    pub message: String,

    /// Notification category ('reminder', 'success', 'warning', 'info')
    pub kind: String,

    pub is_read: bool,

    /// Link resolved when the owner activates the notification.
    pub action_url: Option<String>,

    /// Rows past this instant are pruned.
    pub expires_at: Option<NaiveDateTime>,

    pub created_at: NaiveDateTime,
}

/// Data required to create an in-app notification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateInAppNotification {
    pub owner_id: String,
    pub title: String,
    pub message: String,
    pub kind: NotificationKind,
    pub action_url: Option<String>,
    pub expires_at: Option<NaiveDateTime>,
}
