use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;

use crate::config::PollerConfig;
use crate::db::models::Reminder;
use crate::db::store::{EventStore, PreferenceStore, ReminderStore};
use crate::error::{AppResult, DeliveryError};
use crate::services::clock::Clock;
use crate::services::dispatcher::ChannelDispatcher;
use crate::services::quiet_hours;

/// Outcome tallies for one poll tick.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TickSummary {
    pub sent: usize,
    pub failed: usize,
    pub suppressed: usize,
    /// Reminders observed but not transitioned this tick: lost claim races,
    /// store errors, or work shed by the tick budget. All stay
    /// pending/suppressed and are picked up on a later tick.
    pub skipped: usize,
}

enum Outcome {
    Sent,
    Failed,
    Suppressed,
    Skipped,
}

/// Periodic scan-and-dispatch orchestrator.
///
/// Each tick selects due, live reminders and walks them once: quiet-hours
/// deferral, compare-and-set claim, channel dispatch. Every transition out
/// of pending/suppressed is a conditional update, so concurrent pollers
/// (another server instance, an out-of-band mark-sent) cannot double-send.
/// Clock and stores are injected; tests drive ticks directly.
pub struct DueReminderPoller {
    reminders: Arc<dyn ReminderStore>,
    events: Arc<dyn EventStore>,
    preferences: Arc<dyn PreferenceStore>,
    dispatcher: Arc<ChannelDispatcher>,
    clock: Arc<dyn Clock>,
    config: PollerConfig,
}

impl DueReminderPoller {
    pub fn new(
        reminders: Arc<dyn ReminderStore>,
        events: Arc<dyn EventStore>,
        preferences: Arc<dyn PreferenceStore>,
        dispatcher: Arc<ChannelDispatcher>,
        clock: Arc<dyn Clock>,
        config: PollerConfig,
    ) -> Self {
        Self {
            reminders,
            events,
            preferences,
            dispatcher,
            clock,
            config,
        }
    }

    /// Run one poll tick to completion.
    pub async fn tick(&self) -> AppResult<TickSummary> {
        self.tick_inner(None).await
    }

    async fn tick_inner(
        &self,
        mut shutdown: Option<&mut broadcast::Receiver<()>>,
    ) -> AppResult<TickSummary> {
        let now = self.clock.now_utc();
        let due = self.reminders.query_due(now, self.config.batch_size).await?;

        let mut summary = TickSummary::default();
        if due.is_empty() {
            return Ok(summary);
        }

        tracing::debug!("Poll tick: {} due reminder(s)", due.len());

        let budget = Duration::from_secs(self.config.tick_budget_seconds);
        let started = std::time::Instant::now();

        for (index, reminder) in due.iter().enumerate() {
            // Stop between reminders on shutdown; whatever is left stays
            // pending/suppressed for the next run.
            if let Some(rx) = shutdown.as_deref_mut() {
                if rx.try_recv().is_ok() {
                    tracing::info!("Poll tick interrupted by shutdown");
                    summary.skipped += due.len() - index;
                    break;
                }
            }

            if started.elapsed() >= budget {
                tracing::warn!(
                    "Tick budget ({}s) exhausted; deferring {} reminder(s) to the next tick",
                    self.config.tick_budget_seconds,
                    due.len() - index
                );
                summary.skipped += due.len() - index;
                break;
            }

            match self.process_one(reminder, now).await {
                Ok(Outcome::Sent) => summary.sent += 1,
                Ok(Outcome::Failed) => summary.failed += 1,
                Ok(Outcome::Suppressed) => summary.suppressed += 1,
                Ok(Outcome::Skipped) => summary.skipped += 1,
                Err(e) => {
                    // A store failure on one reminder never aborts the tick.
                    tracing::warn!("Failed to process reminder {}: {:?}", reminder.id, e);
                    summary.skipped += 1;
                }
            }
        }

        if summary.sent + summary.failed + summary.suppressed > 0 {
            tracing::info!(
                "Poll tick complete: {} sent, {} failed, {} suppressed, {} skipped",
                summary.sent,
                summary.failed,
                summary.suppressed,
                summary.skipped
            );
        }

        Ok(summary)
    }

    async fn process_one(
        &self,
        reminder: &Reminder,
        now: chrono::NaiveDateTime,
    ) -> AppResult<Outcome> {
        let prefs = self.preferences.get(&reminder.owner_id).await?;

        if quiet_hours::is_quiet(now, &prefs) {
            // Deferred, not discarded; re-evaluated next tick.
            self.reminders.mark_suppressed(&reminder.id).await?;
            return Ok(Outcome::Suppressed);
        }

        let event = match self.events.get(&reminder.event_id).await? {
            Some(event) if !event.is_cancelled() => event,
            _ => {
                self.reminders
                    .mark_failed(&reminder.id, "parent event missing or cancelled")
                    .await?;
                return Ok(Outcome::Failed);
            }
        };

        // Compare-and-set claim; only the winner dispatches.
        let Some(claimed) = self.reminders.claim_for_send(&reminder.id, now).await? else {
            tracing::debug!(
                "Reminder {} already transitioned by a concurrent poller",
                reminder.id
            );
            return Ok(Outcome::Skipped);
        };

        let timeout = Duration::from_secs(self.config.send_timeout_seconds);
        let send = self.dispatcher.dispatch(&claimed, &event, &prefs);

        match tokio::time::timeout(timeout, send).await {
            Ok(Ok(())) => Ok(Outcome::Sent),
            Ok(Err(e)) => {
                tracing::warn!("Delivery failed for reminder {}: {}", reminder.id, e);
                self.reminders
                    .mark_failed(&reminder.id, &e.to_string())
                    .await?;
                Ok(Outcome::Failed)
            }
            Err(_) => {
                tracing::warn!(
                    "Delivery timed out for reminder {} after {}s",
                    reminder.id,
                    self.config.send_timeout_seconds
                );
                self.reminders
                    .mark_failed(&reminder.id, &DeliveryError::Timeout.to_string())
                    .await?;
                Ok(Outcome::Failed)
            }
        }
    }

    /// Poll loop: tick, then sleep for the configured interval, until the
    /// shutdown channel fires.
    pub async fn run(self: Arc<Self>, mut shutdown: broadcast::Receiver<()>) {
        if !self.config.enabled {
            tracing::info!("Due-reminder poller disabled by configuration");
            return;
        }

        tracing::info!(
            "Due-reminder poller started (interval {}s)",
            self.config.poll_interval_seconds
        );

        loop {
            if let Err(e) = self.tick_inner(Some(&mut shutdown)).await {
                tracing::warn!("Poll tick failed: {:?}", e);
            }

            tokio::select! {
                _ = shutdown.recv() => {
                    tracing::info!("Due-reminder poller shutting down");
                    break;
                }
                _ = tokio::time::sleep(Duration::from_secs(self.config.poll_interval_seconds)) => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::{
        ChannelKind, CreateInAppNotification, InAppNotification, NewReminder, ReminderStatus,
        ScheduledEvent, UserPreferences,
    };
    use crate::db::store::NotificationStore;
    use crate::error::AppError;
    use crate::services::clock::ManualClock;
    use crate::services::dispatcher::Channel;
    use async_trait::async_trait;
    use chrono::{NaiveDate, NaiveDateTime};
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    fn utc(d: u32, h: u32, mi: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, d)
            .unwrap()
            .and_hms_opt(h, mi, 0)
            .unwrap()
    }

    // ------------------------------------------------------------------
    // In-memory fakes
    // ------------------------------------------------------------------

    #[derive(Default)]
    struct MemReminderStore {
        rows: Mutex<Vec<Reminder>>,
        next_id: AtomicUsize,
    }

    impl MemReminderStore {
        fn status_of(&self, id: &str) -> Option<ReminderStatus> {
            self.rows
                .lock()
                .unwrap()
                .iter()
                .find(|r| r.id == id)
                .and_then(|r| ReminderStatus::parse(&r.status))
        }

        fn error_of(&self, id: &str) -> Option<String> {
            self.rows
                .lock()
                .unwrap()
                .iter()
                .find(|r| r.id == id)
                .and_then(|r| r.error.clone())
        }
    }

    #[async_trait]
    impl ReminderStore for MemReminderStore {
        async fn upsert(&self, reminder: NewReminder) -> AppResult<Reminder> {
            let id = format!("rem-{}", self.next_id.fetch_add(1, Ordering::SeqCst));
            let row = Reminder {
                id: id.clone(),
                event_id: reminder.event_id,
                owner_id: reminder.owner_id,
                fire_at: reminder.fire_at,
                lead_time_minutes: reminder.lead_time_minutes,
                channel: reminder.channel.as_str().to_string(),
                status: "pending".to_string(),
                sent_at: None,
                error: None,
                invalidated_at: None,
                created_at: reminder.fire_at,
                updated_at: reminder.fire_at,
            };
            self.rows.lock().unwrap().push(row.clone());
            Ok(row)
        }

        async fn query_due(&self, now: NaiveDateTime, limit: i64) -> AppResult<Vec<Reminder>> {
            let rows = self.rows.lock().unwrap();
            Ok(rows
                .iter()
                .filter(|r| {
                    (r.status == "pending" || r.status == "suppressed")
                        && r.fire_at <= now
                        && r.invalidated_at.is_none()
                })
                .take(limit as usize)
                .cloned()
                .collect())
        }

        async fn claim_for_send(
            &self,
            id: &str,
            now: NaiveDateTime,
        ) -> AppResult<Option<Reminder>> {
            let mut rows = self.rows.lock().unwrap();
            for row in rows.iter_mut() {
                if row.id == id
                    && (row.status == "pending" || row.status == "suppressed")
                    && row.invalidated_at.is_none()
                {
                    row.status = "sent".to_string();
                    row.sent_at = Some(now);
                    return Ok(Some(row.clone()));
                }
            }
            Ok(None)
        }

        async fn mark_failed(&self, id: &str, error: &str) -> AppResult<Option<Reminder>> {
            let mut rows = self.rows.lock().unwrap();
            for row in rows.iter_mut() {
                if row.id == id {
                    row.status = "failed".to_string();
                    row.error = Some(error.to_string());
                    row.sent_at = None;
                    return Ok(Some(row.clone()));
                }
            }
            Ok(None)
        }

        async fn mark_suppressed(&self, id: &str) -> AppResult<()> {
            let mut rows = self.rows.lock().unwrap();
            for row in rows.iter_mut() {
                if row.id == id && row.status == "pending" && row.invalidated_at.is_none() {
                    row.status = "suppressed".to_string();
                }
            }
            Ok(())
        }

        async fn invalidate_non_terminal(&self, event_id: &str) -> AppResult<u64> {
            let mut rows = self.rows.lock().unwrap();
            let mut count = 0;
            for row in rows.iter_mut() {
                if row.event_id == event_id
                    && (row.status == "pending" || row.status == "suppressed")
                    && row.invalidated_at.is_none()
                {
                    row.invalidated_at = Some(row.fire_at);
                    count += 1;
                }
            }
            Ok(count)
        }
    }

    #[derive(Default)]
    struct MemEventStore {
        events: Mutex<HashMap<String, ScheduledEvent>>,
    }

    #[async_trait]
    impl EventStore for MemEventStore {
        async fn get(&self, id: &str) -> AppResult<Option<ScheduledEvent>> {
            Ok(self.events.lock().unwrap().get(id).cloned())
        }
    }

    struct MemPreferenceStore {
        prefs: UserPreferences,
        fail_for: Option<String>,
    }

    #[async_trait]
    impl PreferenceStore for MemPreferenceStore {
        async fn get(&self, owner_id: &str) -> AppResult<UserPreferences> {
            if self.fail_for.as_deref() == Some(owner_id) {
                return Err(AppError::Database(sqlx::Error::PoolClosed));
            }
            let mut prefs = self.prefs.clone();
            prefs.owner_id = owner_id.to_string();
            Ok(prefs)
        }
    }

    struct StubChannel {
        kind: ChannelKind,
        sends: AtomicUsize,
        fail_with: Option<DeliveryError>,
    }

    impl StubChannel {
        fn ok(kind: ChannelKind) -> Self {
            Self {
                kind,
                sends: AtomicUsize::new(0),
                fail_with: None,
            }
        }

        fn failing(kind: ChannelKind, err: DeliveryError) -> Self {
            Self {
                kind,
                sends: AtomicUsize::new(0),
                fail_with: Some(err),
            }
        }
    }

    #[async_trait]
    impl Channel for StubChannel {
        fn kind(&self) -> ChannelKind {
            self.kind
        }

        async fn send(
            &self,
            _reminder: &Reminder,
            _event: &ScheduledEvent,
            _prefs: &UserPreferences,
        ) -> Result<(), DeliveryError> {
            self.sends.fetch_add(1, Ordering::SeqCst);
            match &self.fail_with {
                Some(DeliveryError::PermissionMissing) => Err(DeliveryError::PermissionMissing),
                Some(DeliveryError::Timeout) => Err(DeliveryError::Timeout),
                Some(DeliveryError::ChannelUnavailable(s)) => {
                    Err(DeliveryError::ChannelUnavailable(s.clone()))
                }
                Some(DeliveryError::Transport(s)) => Err(DeliveryError::Transport(s.clone())),
                Some(DeliveryError::Store(s)) => Err(DeliveryError::Store(s.clone())),
                None => Ok(()),
            }
        }
    }

    // ------------------------------------------------------------------
    // Harness
    // ------------------------------------------------------------------

    struct Harness {
        reminders: Arc<MemReminderStore>,
        events: Arc<MemEventStore>,
        clock: Arc<ManualClock>,
        channel: Arc<StubChannel>,
        poller: DueReminderPoller,
    }

    fn poller_config() -> PollerConfig {
        PollerConfig {
            enabled: true,
            poll_interval_seconds: 60,
            batch_size: 100,
            send_timeout_seconds: 5,
            tick_budget_seconds: 30,
            maintenance_interval_seconds: 3600,
        }
    }

    fn harness(prefs: UserPreferences, channel: StubChannel, now: NaiveDateTime) -> Harness {
        let reminders = Arc::new(MemReminderStore::default());
        let events = Arc::new(MemEventStore::default());
        let preferences = Arc::new(MemPreferenceStore {
            prefs,
            fail_for: None,
        });
        let clock = Arc::new(ManualClock::at(now));
        let channel = Arc::new(channel);
        let dispatcher = Arc::new(ChannelDispatcher::new().register(channel.clone()));

        let poller = DueReminderPoller::new(
            reminders.clone(),
            events.clone(),
            preferences,
            dispatcher,
            clock.clone(),
            poller_config(),
        );

        Harness {
            reminders,
            events,
            clock,
            channel,
            poller,
        }
    }

    fn event(id: &str, fire_time: NaiveDateTime) -> ScheduledEvent {
        ScheduledEvent {
            id: id.to_string(),
            owner_id: "owner-1".to_string(),
            fire_time,
            title: "Launch post".to_string(),
            body: "Main account".to_string(),
            target_url: None,
            cancelled_at: None,
            created_at: fire_time,
            updated_at: fire_time,
        }
    }

    async fn seed_reminder(
        h: &Harness,
        event_id: &str,
        fire_at: NaiveDateTime,
        channel: ChannelKind,
    ) -> String {
        let row = h
            .reminders
            .upsert(NewReminder {
                event_id: event_id.to_string(),
                owner_id: "owner-1".to_string(),
                fire_at,
                lead_time_minutes: 15,
                channel,
            })
            .await
            .unwrap();
        row.id
    }

    fn quiet_prefs(start: &str, end: &str) -> UserPreferences {
        UserPreferences {
            quiet_hours_start: Some(start.to_string()),
            quiet_hours_end: Some(end.to_string()),
            ..Default::default()
        }
    }

    // ------------------------------------------------------------------
    // Tests
    // ------------------------------------------------------------------

    #[tokio::test]
    async fn due_reminder_is_dispatched_and_marked_sent() {
        let now = utc(10, 14, 46);
        let h = harness(
            UserPreferences::default(),
            StubChannel::ok(ChannelKind::InApp),
            now,
        );
        h.events
            .events
            .lock()
            .unwrap()
            .insert("evt-1".to_string(), event("evt-1", utc(10, 15, 0)));
        let id = seed_reminder(&h, "evt-1", utc(10, 14, 45), ChannelKind::InApp).await;

        let summary = h.poller.tick().await.unwrap();

        assert_eq!(summary.sent, 1);
        assert_eq!(h.channel.sends.load(Ordering::SeqCst), 1);
        assert_eq!(h.reminders.status_of(&id), Some(ReminderStatus::Sent));
    }

    #[tokio::test]
    async fn double_tick_never_sends_twice() {
        let now = utc(10, 14, 46);
        let h = harness(
            UserPreferences::default(),
            StubChannel::ok(ChannelKind::InApp),
            now,
        );
        h.events
            .events
            .lock()
            .unwrap()
            .insert("evt-1".to_string(), event("evt-1", utc(10, 15, 0)));
        seed_reminder(&h, "evt-1", utc(10, 14, 45), ChannelKind::InApp).await;

        h.poller.tick().await.unwrap();
        let second = h.poller.tick().await.unwrap();

        assert_eq!(second, TickSummary::default());
        assert_eq!(h.channel.sends.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn future_reminder_is_untouched() {
        let now = utc(10, 14, 0);
        let h = harness(
            UserPreferences::default(),
            StubChannel::ok(ChannelKind::InApp),
            now,
        );
        h.events
            .events
            .lock()
            .unwrap()
            .insert("evt-1".to_string(), event("evt-1", utc(10, 15, 0)));
        let id = seed_reminder(&h, "evt-1", utc(10, 14, 45), ChannelKind::InApp).await;

        let summary = h.poller.tick().await.unwrap();

        assert_eq!(summary, TickSummary::default());
        assert_eq!(h.reminders.status_of(&id), Some(ReminderStatus::Pending));
    }

    #[tokio::test]
    async fn quiet_hours_suppress_then_deliver_after_window() {
        // Quiet 23:00-07:00 UTC; reminder due at 23:30, re-checked at 07:10.
        let h = harness(
            quiet_prefs("23:00", "07:00"),
            StubChannel::ok(ChannelKind::InApp),
            utc(10, 23, 30),
        );
        h.events
            .events
            .lock()
            .unwrap()
            .insert("evt-1".to_string(), event("evt-1", utc(11, 9, 0)));
        let id = seed_reminder(&h, "evt-1", utc(10, 23, 15), ChannelKind::InApp).await;

        let first = h.poller.tick().await.unwrap();
        assert_eq!(first.suppressed, 1);
        assert_eq!(h.reminders.status_of(&id), Some(ReminderStatus::Suppressed));
        assert_eq!(h.channel.sends.load(Ordering::SeqCst), 0);

        // Still inside the window on a later tick: idempotent, stays suppressed.
        h.clock.set(utc(11, 2, 0));
        let second = h.poller.tick().await.unwrap();
        assert_eq!(second.suppressed, 1);
        assert_eq!(h.reminders.status_of(&id), Some(ReminderStatus::Suppressed));

        // Window over: dispatched and sent.
        h.clock.set(utc(11, 7, 10));
        let third = h.poller.tick().await.unwrap();
        assert_eq!(third.sent, 1);
        assert_eq!(h.reminders.status_of(&id), Some(ReminderStatus::Sent));
        assert_eq!(h.channel.sends.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn delivery_failure_is_terminal_and_not_retried() {
        let now = utc(10, 14, 46);
        let h = harness(
            UserPreferences::default(),
            StubChannel::failing(
                ChannelKind::Push,
                DeliveryError::Transport("gateway 502".to_string()),
            ),
            now,
        );
        h.events
            .events
            .lock()
            .unwrap()
            .insert("evt-1".to_string(), event("evt-1", utc(10, 15, 0)));
        let id = seed_reminder(&h, "evt-1", utc(10, 14, 45), ChannelKind::Push).await;

        let first = h.poller.tick().await.unwrap();
        assert_eq!(first.failed, 1);
        assert_eq!(h.reminders.status_of(&id), Some(ReminderStatus::Failed));
        assert!(h.reminders.error_of(&id).unwrap().contains("gateway 502"));

        // Failed is terminal: the next tick finds nothing to do.
        let second = h.poller.tick().await.unwrap();
        assert_eq!(second, TickSummary::default());
        assert_eq!(h.channel.sends.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn permission_missing_fails_fast_without_fallback() {
        let now = utc(10, 14, 46);
        let h = harness(
            UserPreferences::default(),
            StubChannel::failing(ChannelKind::Push, DeliveryError::PermissionMissing),
            now,
        );
        h.events
            .events
            .lock()
            .unwrap()
            .insert("evt-1".to_string(), event("evt-1", utc(10, 15, 0)));
        let id = seed_reminder(&h, "evt-1", utc(10, 14, 45), ChannelKind::Push).await;

        let summary = h.poller.tick().await.unwrap();

        assert_eq!(summary.failed, 1);
        assert_eq!(h.reminders.status_of(&id), Some(ReminderStatus::Failed));
        assert!(h
            .reminders
            .error_of(&id)
            .unwrap()
            .contains("permission not granted"));
    }

    #[tokio::test]
    async fn missing_parent_event_fails_the_reminder() {
        let now = utc(10, 14, 46);
        let h = harness(
            UserPreferences::default(),
            StubChannel::ok(ChannelKind::InApp),
            now,
        );
        let id = seed_reminder(&h, "evt-gone", utc(10, 14, 45), ChannelKind::InApp).await;

        let summary = h.poller.tick().await.unwrap();

        assert_eq!(summary.failed, 1);
        assert_eq!(h.reminders.status_of(&id), Some(ReminderStatus::Failed));
        assert_eq!(h.channel.sends.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn store_error_on_one_owner_does_not_abort_the_tick() {
        let now = utc(10, 14, 46);
        let reminders = Arc::new(MemReminderStore::default());
        let events = Arc::new(MemEventStore::default());
        let preferences = Arc::new(MemPreferenceStore {
            prefs: UserPreferences::default(),
            fail_for: Some("owner-broken".to_string()),
        });
        let clock = Arc::new(ManualClock::at(now));
        let channel = Arc::new(StubChannel::ok(ChannelKind::InApp));
        let dispatcher = Arc::new(ChannelDispatcher::new().register(channel.clone()));
        let poller = DueReminderPoller::new(
            reminders.clone(),
            events.clone(),
            preferences,
            dispatcher,
            clock,
            poller_config(),
        );

        events
            .events
            .lock()
            .unwrap()
            .insert("evt-1".to_string(), event("evt-1", utc(10, 15, 0)));

        let broken = reminders
            .upsert(NewReminder {
                event_id: "evt-1".to_string(),
                owner_id: "owner-broken".to_string(),
                fire_at: utc(10, 14, 45),
                lead_time_minutes: 15,
                channel: ChannelKind::InApp,
            })
            .await
            .unwrap();
        let healthy = reminders
            .upsert(NewReminder {
                event_id: "evt-1".to_string(),
                owner_id: "owner-1".to_string(),
                fire_at: utc(10, 14, 45),
                lead_time_minutes: 15,
                channel: ChannelKind::InApp,
            })
            .await
            .unwrap();

        let summary = poller.tick().await.unwrap();

        assert_eq!(summary.sent, 1);
        assert_eq!(summary.skipped, 1);
        assert_eq!(
            reminders.status_of(&broken.id),
            Some(ReminderStatus::Pending)
        );
        assert_eq!(reminders.status_of(&healthy.id), Some(ReminderStatus::Sent));
    }

    #[tokio::test]
    async fn rescheduling_invalidates_live_rows_only() {
        let now = utc(10, 14, 46);
        let h = harness(
            UserPreferences::default(),
            StubChannel::ok(ChannelKind::InApp),
            now,
        );
        h.events
            .events
            .lock()
            .unwrap()
            .insert("evt-1".to_string(), event("evt-1", utc(10, 15, 0)));

        let sent_id = seed_reminder(&h, "evt-1", utc(10, 14, 45), ChannelKind::InApp).await;
        h.poller.tick().await.unwrap();
        assert_eq!(h.reminders.status_of(&sent_id), Some(ReminderStatus::Sent));

        let pending_id = seed_reminder(&h, "evt-1", utc(10, 16, 0), ChannelKind::InApp).await;
        let invalidated = h.reminders.invalidate_non_terminal("evt-1").await.unwrap();

        assert_eq!(invalidated, 1);
        assert_eq!(h.reminders.status_of(&sent_id), Some(ReminderStatus::Sent));
        // The invalidated row never comes due again.
        h.clock.set(utc(10, 16, 30));
        let summary = h.poller.tick().await.unwrap();
        assert_eq!(summary, TickSummary::default());
        assert_eq!(
            h.reminders.status_of(&pending_id),
            Some(ReminderStatus::Pending)
        );
    }

    // NotificationStore fake kept here so the in-app channel can be exercised
    // end to end through the dispatcher.
    #[derive(Default)]
    struct MemNotificationStore {
        created: Mutex<Vec<InAppNotification>>,
    }

    #[async_trait]
    impl NotificationStore for MemNotificationStore {
        async fn create(
            &self,
            notification: CreateInAppNotification,
        ) -> AppResult<InAppNotification> {
            let row = InAppNotification {
                id: format!("ntf-{}", self.created.lock().unwrap().len()),
                owner_id: notification.owner_id,
                title: notification.title,
                message: notification.message,
                kind: notification.kind.as_str().to_string(),
                is_read: false,
                action_url: notification.action_url,
                expires_at: notification.expires_at,
                created_at: utc(10, 0, 0),
            };
            self.created.lock().unwrap().push(row.clone());
            Ok(row)
        }
    }

    #[tokio::test]
    async fn in_app_channel_writes_notification_through_poller() {
        use crate::services::channels::InAppChannel;

        let now = utc(10, 14, 46);
        let reminders = Arc::new(MemReminderStore::default());
        let events = Arc::new(MemEventStore::default());
        let preferences = Arc::new(MemPreferenceStore {
            prefs: UserPreferences::default(),
            fail_for: None,
        });
        let notifications = Arc::new(MemNotificationStore::default());
        let clock = Arc::new(ManualClock::at(now));
        let dispatcher = Arc::new(
            ChannelDispatcher::new().register(Arc::new(InAppChannel::new(notifications.clone()))),
        );
        let poller = DueReminderPoller::new(
            reminders.clone(),
            events.clone(),
            preferences,
            dispatcher,
            clock,
            poller_config(),
        );

        events
            .events
            .lock()
            .unwrap()
            .insert("evt-1".to_string(), event("evt-1", utc(10, 15, 0)));
        reminders
            .upsert(NewReminder {
                event_id: "evt-1".to_string(),
                owner_id: "owner-1".to_string(),
                fire_at: utc(10, 14, 45),
                lead_time_minutes: 15,
                channel: ChannelKind::InApp,
            })
            .await
            .unwrap();

        let summary = poller.tick().await.unwrap();

        assert_eq!(summary.sent, 1);
        let created = notifications.created.lock().unwrap();
        assert_eq!(created.len(), 1);
        assert_eq!(created[0].kind, "reminder");
        assert_eq!(created[0].expires_at, Some(utc(10, 15, 0)));
        assert!(!created[0].is_read);
    }
}
