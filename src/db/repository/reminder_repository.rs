use async_trait::async_trait;
use chrono::{NaiveDateTime, Utc};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::db::models::{NewReminder, Reminder, ReminderStatus};
use crate::db::store::ReminderStore;
use crate::error::{AppError, AppResult};

const REMINDER_COLUMNS: &str = r#"
    id,
    event_id,
    owner_id,
    fire_at,
    lead_time_minutes,
    channel,
    status,
    sent_at,
    error,
    invalidated_at,
    created_at,
    updated_at
"#;

/// Repository for reminder rows.
///
/// Implementation notes:
/// - Status transitions out of pending/suppressed are single-statement
///   conditional updates (`UPDATE ... WHERE ... RETURNING`), so concurrent
///   pollers cannot double-claim a reminder and no long-lived transaction is
///   held against SQLite.
/// - Every live query filters `invalidated_at IS NULL`; invalidated rows are
///   logically deleted and only reachable through the audit listing.
#[derive(Clone)]
pub struct ReminderRepository {
    pool: SqlitePool,
}

impl ReminderRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, reminder: NewReminder) -> AppResult<Reminder> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now().naive_utc();

        let row = sqlx::query_as::<_, Reminder>(&format!(
            r#"
            INSERT INTO reminders (
                id, event_id, owner_id, fire_at, lead_time_minutes,
                channel, status, sent_at, error, invalidated_at,
                created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, NULL, NULL, NULL, ?, ?)
            RETURNING {REMINDER_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(reminder.event_id)
        .bind(reminder.owner_id)
        .bind(reminder.fire_at)
        .bind(reminder.lead_time_minutes)
        .bind(reminder.channel.as_str())
        .bind(ReminderStatus::Pending.as_str())
        .bind(now)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(AppError::Database)?;

        Ok(row)
    }

    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<Reminder>> {
        sqlx::query_as::<_, Reminder>(&format!(
            "SELECT {REMINDER_COLUMNS} FROM reminders WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::Database)
    }

    pub async fn find_due(&self, now: NaiveDateTime, limit: i64) -> AppResult<Vec<Reminder>> {
        sqlx::query_as::<_, Reminder>(&format!(
            r#"
            SELECT {REMINDER_COLUMNS}
            FROM reminders
            WHERE status IN ('pending', 'suppressed')
              AND fire_at <= ?
              AND invalidated_at IS NULL
            ORDER BY fire_at ASC
            LIMIT ?
            "#
        ))
        .bind(now)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(AppError::Database)
    }

    /// All live `pending` reminders whose fire time has passed. Consumed by
    /// the backfill/sync surface.
    pub async fn find_overdue_pending(&self, now: NaiveDateTime) -> AppResult<Vec<Reminder>> {
        sqlx::query_as::<_, Reminder>(&format!(
            r#"
            SELECT {REMINDER_COLUMNS}
            FROM reminders
            WHERE status = 'pending'
              AND fire_at <= ?
              AND invalidated_at IS NULL
            ORDER BY fire_at ASC
            "#
        ))
        .bind(now)
        .fetch_all(&self.pool)
        .await
        .map_err(AppError::Database)
    }

    /// Audit listing for an owner, optionally filtered by status. Includes
    /// invalidated rows so the history stays inspectable.
    pub async fn find_by_owner(
        &self,
        owner_id: &str,
        status: Option<&str>,
        limit: i64,
        offset: i64,
    ) -> AppResult<Vec<Reminder>> {
        match status {
            Some(status) => sqlx::query_as::<_, Reminder>(&format!(
                r#"
                SELECT {REMINDER_COLUMNS}
                FROM reminders
                WHERE owner_id = ? AND status = ?
                ORDER BY fire_at DESC
                LIMIT ? OFFSET ?
                "#
            ))
            .bind(owner_id)
            .bind(status)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await
            .map_err(AppError::Database),
            None => sqlx::query_as::<_, Reminder>(&format!(
                r#"
                SELECT {REMINDER_COLUMNS}
                FROM reminders
                WHERE owner_id = ?
                ORDER BY fire_at DESC
                LIMIT ? OFFSET ?
                "#
            ))
            .bind(owner_id)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await
            .map_err(AppError::Database),
        }
    }

    /// Claim a due reminder for delivery: pending/suppressed -> sent in one
    /// conditional statement. `None` means another poller already owns the
    /// transition (or the row is terminal/invalidated).
    pub async fn claim_for_send(
        &self,
        id: &str,
        now: NaiveDateTime,
    ) -> AppResult<Option<Reminder>> {
        sqlx::query_as::<_, Reminder>(&format!(
            r#"
            UPDATE reminders
            SET status = 'sent', sent_at = ?, updated_at = ?
            WHERE id = ?
              AND status IN ('pending', 'suppressed')
              AND invalidated_at IS NULL
            RETURNING {REMINDER_COLUMNS}
            "#
        ))
        .bind(now)
        .bind(now)
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::Database)
    }

    /// Record a delivery failure on a claimed reminder. Terminal; the poller
    /// never retries a failed reminder.
    pub async fn mark_failed(&self, id: &str, error: &str) -> AppResult<Option<Reminder>> {
        let now = Utc::now().naive_utc();
        sqlx::query_as::<_, Reminder>(&format!(
            r#"
            UPDATE reminders
            SET status = 'failed', error = ?, sent_at = NULL, updated_at = ?
            WHERE id = ?
            RETURNING {REMINDER_COLUMNS}
            "#
        ))
        .bind(error)
        .bind(now)
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::Database)
    }

    /// Conditional pending -> suppressed transition. A reminder already
    /// suppressed matches zero rows, which is fine (idempotent).
    pub async fn mark_suppressed(&self, id: &str) -> AppResult<()> {
        let now = Utc::now().naive_utc();
        sqlx::query(
            r#"
            UPDATE reminders
            SET status = 'suppressed', updated_at = ?
            WHERE id = ?
              AND status = 'pending'
              AND invalidated_at IS NULL
            "#,
        )
        .bind(now)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(AppError::Database)?;

        Ok(())
    }

    /// Logically delete all non-terminal reminders of an event. Sent/failed
    /// rows are untouched (audit trail).
    pub async fn invalidate_non_terminal(&self, event_id: &str) -> AppResult<u64> {
        let now = Utc::now().naive_utc();
        let result = sqlx::query(
            r#"
            UPDATE reminders
            SET invalidated_at = ?, updated_at = ?
            WHERE event_id = ?
              AND status IN ('pending', 'suppressed')
              AND invalidated_at IS NULL
            "#,
        )
        .bind(now)
        .bind(now)
        .bind(event_id)
        .execute(&self.pool)
        .await
        .map_err(AppError::Database)?;

        Ok(result.rows_affected())
    }

    /// Archive reminders whose parent event has fired or been cancelled.
    /// Run by the maintenance worker; returns the number of rows archived.
    pub async fn archive_for_finished_events(&self, now: NaiveDateTime) -> AppResult<u64> {
        let result = sqlx::query(
            r#"
            UPDATE reminders
            SET invalidated_at = ?, updated_at = ?
            WHERE invalidated_at IS NULL
              AND status IN ('pending', 'suppressed')
              AND event_id IN (
                  SELECT id FROM scheduled_events
                  WHERE fire_time <= ? OR cancelled_at IS NOT NULL
              )
            "#,
        )
        .bind(now)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(AppError::Database)?;

        Ok(result.rows_affected())
    }
}

#[async_trait]
impl ReminderStore for ReminderRepository {
    async fn upsert(&self, reminder: NewReminder) -> AppResult<Reminder> {
        self.create(reminder).await
    }

    async fn query_due(&self, now: NaiveDateTime, limit: i64) -> AppResult<Vec<Reminder>> {
        self.find_due(now, limit).await
    }

    async fn claim_for_send(&self, id: &str, now: NaiveDateTime) -> AppResult<Option<Reminder>> {
        ReminderRepository::claim_for_send(self, id, now).await
    }

    async fn mark_failed(&self, id: &str, error: &str) -> AppResult<Option<Reminder>> {
        ReminderRepository::mark_failed(self, id, error).await
    }

    async fn mark_suppressed(&self, id: &str) -> AppResult<()> {
        ReminderRepository::mark_suppressed(self, id).await
    }

    async fn invalidate_non_terminal(&self, event_id: &str) -> AppResult<u64> {
        ReminderRepository::invalidate_non_terminal(self, event_id).await
    }
}
