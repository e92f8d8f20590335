//! Persistence contracts consumed by the engine.
//!
//! The scheduler, poller and channels only ever see these traits; the
//! concrete SQLite repositories implement them. Tests substitute in-memory
//! fakes so ticks run deterministically without a database.

use async_trait::async_trait;
use chrono::NaiveDateTime;

use crate::db::models::{
    CreateInAppNotification, InAppNotification, NewReminder, PermissionState, Reminder,
    ScheduledEvent, UserPreferences,
};
use crate::error::AppResult;

#[async_trait]
pub trait ReminderStore: Send + Sync {
    /// Persist a freshly computed reminder.
    async fn upsert(&self, reminder: NewReminder) -> AppResult<Reminder>;

    /// Live (non-invalidated) reminders with status pending/suppressed and
    /// `fire_at <= now`, oldest first, bounded by `limit`.
    async fn query_due(&self, now: NaiveDateTime, limit: i64) -> AppResult<Vec<Reminder>>;

    /// Compare-and-set claim: transition pending/suppressed -> sent in a
    /// single conditional statement. Returns `None` when another poller won
    /// the race (or the row is gone/terminal), in which case the caller must
    /// not dispatch.
    async fn claim_for_send(
        &self,
        id: &str,
        now: NaiveDateTime,
    ) -> AppResult<Option<Reminder>>;

    /// Downgrade a claimed reminder to terminal `failed`, recording the
    /// delivery error.
    async fn mark_failed(&self, id: &str, error: &str) -> AppResult<Option<Reminder>>;

    /// Conditional pending -> suppressed transition. Idempotent: an already
    /// suppressed reminder is left as-is and reported as success.
    async fn mark_suppressed(&self, id: &str) -> AppResult<()>;

    /// Logically delete all non-terminal reminders of an event (used by
    /// rescheduling and archival). Returns the number of rows invalidated.
    async fn invalidate_non_terminal(&self, event_id: &str) -> AppResult<u64>;
}

#[async_trait]
pub trait EventStore: Send + Sync {
    async fn get(&self, id: &str) -> AppResult<Option<ScheduledEvent>>;
}

#[async_trait]
pub trait PreferenceStore: Send + Sync {
    /// Preferences for an owner, falling back to defaults when the owner has
    /// never saved any.
    async fn get(&self, owner_id: &str) -> AppResult<UserPreferences>;
}

#[async_trait]
pub trait NotificationStore: Send + Sync {
    async fn create(&self, notification: CreateInAppNotification) -> AppResult<InAppNotification>;
}

#[async_trait]
pub trait PermissionStore: Send + Sync {
    async fn get(&self, owner_id: &str) -> AppResult<PermissionState>;

    async fn set(&self, owner_id: &str, state: PermissionState) -> AppResult<PermissionState>;
}
