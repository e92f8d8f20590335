use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Delivery channels a reminder can be routed through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelKind {
    Push,
    InApp,
    Email,
}

impl ChannelKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChannelKind::Push => "push",
            ChannelKind::InApp => "in_app",
            ChannelKind::Email => "email",
        }
    }

    pub fn parse(s: &str) -> Option<ChannelKind> {
        match s {
            "push" => Some(ChannelKind::Push),
            "in_app" => Some(ChannelKind::InApp),
            "email" => Some(ChannelKind::Email),
            _ => None,
        }
    }
}

/// Reminder delivery states.
///
/// `Pending` and `Suppressed` are live; `Sent` and `Failed` are terminal and
/// never touched by rescheduling (audit trail). `Suppressed` means due but
/// deferred by quiet hours, re-evaluated on the next poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReminderStatus {
    Pending,
    Sent,
    Failed,
    Suppressed,
}

impl ReminderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReminderStatus::Pending => "pending",
            ReminderStatus::Sent => "sent",
            ReminderStatus::Failed => "failed",
            ReminderStatus::Suppressed => "suppressed",
        }
    }

    pub fn parse(s: &str) -> Option<ReminderStatus> {
        match s {
            "pending" => Some(ReminderStatus::Pending),
            "sent" => Some(ReminderStatus::Sent),
            "failed" => Some(ReminderStatus::Failed),
            "suppressed" => Some(ReminderStatus::Suppressed),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ReminderStatus::Sent | ReminderStatus::Failed)
    }
}

/// One reminder per (event, lead time, channel) combination the owner has
/// enabled.
///
/// `fire_at` is computed once at creation (`event.fire_time` minus the lead
/// time) and never mutated; when recomputation is needed the old row is
/// invalidated (`invalidated_at` set) and a fresh one created.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Reminder {
    /// Primary key (UUID)
    pub id: String,

    /// Parent event id (references `scheduled_events.id`)
    pub event_id: String,

    /// Owning user id
    pub owner_id: String,

    /// Instant the reminder becomes due
    pub fire_at: NaiveDateTime,

    /// Minutes before the event fire time this reminder targets
    pub lead_time_minutes: i64,

    /// Delivery channel ('push', 'in_app', 'email')
    pub channel: String,

    /// Delivery state ('pending', 'sent', 'failed', 'suppressed')
    pub status: String,

    /// Set when delivery succeeded.
    pub sent_at: Option<NaiveDateTime>,

    /// Delivery error message when `status` is 'failed'.
    pub error: Option<String>,

    /// Logical deletion marker set by rescheduling and archival. Invalidated
    /// rows are excluded from every live query.
    pub invalidated_at: Option<NaiveDateTime>,

    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl Reminder {
    pub fn channel_kind(&self) -> Option<ChannelKind> {
        ChannelKind::parse(&self.channel)
    }

    /// Stable dedup key used by delivery channels to avoid surfacing the
    /// same reminder twice.
    pub fn dedup_tag(&self) -> String {
        format!("reminder-{}", self.id)
    }
}

/// Data required to create a reminder; produced by the scheduler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewReminder {
    pub event_id: String,
    pub owner_id: String,
    pub fire_at: NaiveDateTime,
    pub lead_time_minutes: i64,
    pub channel: ChannelKind,
}
