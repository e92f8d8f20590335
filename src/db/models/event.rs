use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A future content-publishing action owned by a user.
///
/// Created by the external scheduling surface. Immutable once reminders have
/// been generated, except `fire_time`: changing it invalidates the event's
/// pending reminders, which are then recomputed. All timestamps are UTC.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct ScheduledEvent {
    /// Primary key (UUID)
    pub id: String,

    /// Owning user id
    pub owner_id: String,

    /// Instant at which the event fires (the publish time)
    pub fire_time: NaiveDateTime,

    pub title: String,

    /// Short descriptive body shown in reminder payloads
    pub body: String,

    /// Link to the scheduled content (carried into delivery payloads)
    pub target_url: Option<String>,

    /// Set when the owner cancels the event; reminders are archived after.
    pub cancelled_at: Option<NaiveDateTime>,

    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl ScheduledEvent {
    pub fn is_cancelled(&self) -> bool {
        self.cancelled_at.is_some()
    }
}

/// Data required to create a new scheduled event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateScheduledEvent {
    pub owner_id: String,
    pub fire_time: NaiveDateTime,
    pub title: String,
    pub body: String,
    pub target_url: Option<String>,
}
