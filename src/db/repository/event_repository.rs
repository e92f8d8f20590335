use async_trait::async_trait;
use chrono::{NaiveDateTime, Utc};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::db::models::{CreateScheduledEvent, ScheduledEvent};
use crate::db::store::EventStore;
use crate::error::{AppError, AppResult};

const EVENT_COLUMNS: &str = r#"
    id,
    owner_id,
    fire_time,
    title,
    body,
    target_url,
    cancelled_at,
    created_at,
    updated_at
"#;

#[derive(Clone)]
pub struct EventRepository {
    pool: SqlitePool,
}

impl EventRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, event: CreateScheduledEvent) -> AppResult<ScheduledEvent> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now().naive_utc();

        sqlx::query_as::<_, ScheduledEvent>(&format!(
            r#"
            INSERT INTO scheduled_events (
                id, owner_id, fire_time, title, body, target_url,
                cancelled_at, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, NULL, ?, ?)
            RETURNING {EVENT_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(event.owner_id)
        .bind(event.fire_time)
        .bind(event.title)
        .bind(event.body)
        .bind(event.target_url)
        .bind(now)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(AppError::Database)
    }

    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<ScheduledEvent>> {
        sqlx::query_as::<_, ScheduledEvent>(&format!(
            "SELECT {EVENT_COLUMNS} FROM scheduled_events WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::Database)
    }

    /// Move the event's fire time. The caller is responsible for
    /// invalidating and recomputing the event's reminders afterwards.
    pub async fn set_fire_time(
        &self,
        id: &str,
        fire_time: NaiveDateTime,
    ) -> AppResult<Option<ScheduledEvent>> {
        let now = Utc::now().naive_utc();
        sqlx::query_as::<_, ScheduledEvent>(&format!(
            r#"
            UPDATE scheduled_events
            SET fire_time = ?, updated_at = ?
            WHERE id = ? AND cancelled_at IS NULL
            RETURNING {EVENT_COLUMNS}
            "#
        ))
        .bind(fire_time)
        .bind(now)
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::Database)
    }

    pub async fn cancel(&self, id: &str) -> AppResult<Option<ScheduledEvent>> {
        let now = Utc::now().naive_utc();
        sqlx::query_as::<_, ScheduledEvent>(&format!(
            r#"
            UPDATE scheduled_events
            SET cancelled_at = ?, updated_at = ?
            WHERE id = ? AND cancelled_at IS NULL
            RETURNING {EVENT_COLUMNS}
            "#
        ))
        .bind(now)
        .bind(now)
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::Database)
    }

    pub async fn find_by_owner(&self, owner_id: &str) -> AppResult<Vec<ScheduledEvent>> {
        sqlx::query_as::<_, ScheduledEvent>(&format!(
            r#"
            SELECT {EVENT_COLUMNS}
            FROM scheduled_events
            WHERE owner_id = ?
            ORDER BY fire_time ASC
            "#
        ))
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await
        .map_err(AppError::Database)
    }
}

#[async_trait]
impl EventStore for EventRepository {
    async fn get(&self, id: &str) -> AppResult<Option<ScheduledEvent>> {
        self.find_by_id(id).await
    }
}
