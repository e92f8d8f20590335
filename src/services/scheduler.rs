use std::sync::Arc;

use chrono::{Duration, NaiveDateTime};

use crate::db::models::{CreateScheduledEvent, NewReminder, Reminder, ScheduledEvent, UserPreferences};
use crate::db::store::ReminderStore;
use crate::error::{AppError, AppResult};
use crate::services::clock::Clock;

/// Compute the reminder set for an event: one candidate per
/// (lead time x enabled channel), dropping candidates already in the past.
///
/// Empty lead times or an empty channel set produce an empty list, which is
/// a valid outcome rather than an error.
pub fn compute_reminders(
    event: &ScheduledEvent,
    prefs: &UserPreferences,
    now: NaiveDateTime,
) -> Vec<NewReminder> {
    let channels = prefs.channels();
    let mut out = Vec::new();

    for lead in prefs.lead_times() {
        let fire_at = event.fire_time - Duration::minutes(lead);
        if fire_at <= now {
            // Already past; produces no reminder.
            continue;
        }
        for &channel in &channels {
            out.push(NewReminder {
                event_id: event.id.clone(),
                owner_id: event.owner_id.clone(),
                fire_at,
                lead_time_minutes: lead,
                channel,
            });
        }
    }

    out
}

/// Reject malformed events before anything is persisted.
pub fn validate_event(event: &CreateScheduledEvent, now: NaiveDateTime) -> AppResult<()> {
    if event.title.trim().is_empty() {
        return Err(AppError::Scheduling("Event title must not be empty".to_string()));
    }
    if event.fire_time <= now {
        return Err(AppError::Scheduling(
            "Event fire time must be in the future".to_string(),
        ));
    }
    Ok(())
}

/// Computes reminder instants from the owner's lead-time configuration and
/// persists them through the reminder store.
pub struct ReminderScheduler {
    reminders: Arc<dyn ReminderStore>,
    clock: Arc<dyn Clock>,
}

impl ReminderScheduler {
    pub fn new(reminders: Arc<dyn ReminderStore>, clock: Arc<dyn Clock>) -> Self {
        Self { reminders, clock }
    }

    /// Create pending reminders for a freshly scheduled event.
    pub async fn schedule(
        &self,
        event: &ScheduledEvent,
        prefs: &UserPreferences,
    ) -> AppResult<Vec<Reminder>> {
        let now = self.clock.now_utc();
        let mut created = Vec::new();

        for candidate in compute_reminders(event, prefs, now) {
            created.push(self.reminders.upsert(candidate).await?);
        }

        tracing::info!(
            "Scheduled {} reminder(s) for event {} (owner {})",
            created.len(),
            event.id,
            event.owner_id
        );

        Ok(created)
    }

    /// Re-run scheduling after the event's fire time or the owner's
    /// preferences changed. All non-terminal reminders of the event are
    /// invalidated first; sent/failed rows stay untouched as audit trail.
    pub async fn reschedule(
        &self,
        event: &ScheduledEvent,
        prefs: &UserPreferences,
    ) -> AppResult<Vec<Reminder>> {
        let invalidated = self.reminders.invalidate_non_terminal(&event.id).await?;
        tracing::info!(
            "Invalidated {} reminder(s) for event {} before rescheduling",
            invalidated,
            event.id
        );

        self.schedule(event, prefs).await
    }
}
