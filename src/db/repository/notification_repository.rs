use async_trait::async_trait;
use chrono::{NaiveDateTime, Utc};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::db::models::{CreateInAppNotification, InAppNotification};
use crate::db::store::NotificationStore;
use crate::error::{AppError, AppResult};

const NOTIFICATION_COLUMNS: &str = r#"
    id,
    owner_id,
    title,
    message,
    kind,
    is_read,
    action_url,
    expires_at,
    created_at
"#;

/// Repository for the in-app notification feed.
#[derive(Clone)]
pub struct NotificationRepository {
    pool: SqlitePool,
}

impl NotificationRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn create(
        &self,
        notification: CreateInAppNotification,
    ) -> AppResult<InAppNotification> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now().naive_utc();

        sqlx::query_as::<_, InAppNotification>(&format!(
            r#"
            INSERT INTO in_app_notifications (
                id, owner_id, title, message, kind, is_read,
                action_url, expires_at, created_at
            ) VALUES (?, ?, ?, ?, ?, FALSE, ?, ?, ?)
            RETURNING {NOTIFICATION_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(notification.owner_id)
        .bind(notification.title)
        .bind(notification.message)
        .bind(notification.kind.as_str())
        .bind(notification.action_url)
        .bind(notification.expires_at)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(AppError::Database)
    }

    pub async fn find_by_owner(
        &self,
        owner_id: &str,
        unread_only: bool,
        limit: i64,
        offset: i64,
    ) -> AppResult<Vec<InAppNotification>> {
        let filter = if unread_only {
            "AND is_read = FALSE"
        } else {
            ""
        };

        sqlx::query_as::<_, InAppNotification>(&format!(
            r#"
            SELECT {NOTIFICATION_COLUMNS}
            FROM in_app_notifications
            WHERE owner_id = ? {filter}
            ORDER BY created_at DESC
            LIMIT ? OFFSET ?
            "#
        ))
        .bind(owner_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(AppError::Database)
    }

    pub async fn mark_read(&self, id: &str) -> AppResult<Option<InAppNotification>> {
        sqlx::query_as::<_, InAppNotification>(&format!(
            r#"
            UPDATE in_app_notifications
            SET is_read = TRUE
            WHERE id = ?
            RETURNING {NOTIFICATION_COLUMNS}
            "#
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::Database)
    }

    /// Delete notifications past their expiry. Returns the number pruned.
    pub async fn prune_expired(&self, now: NaiveDateTime) -> AppResult<u64> {
        let result = sqlx::query(
            "DELETE FROM in_app_notifications WHERE expires_at IS NOT NULL AND expires_at <= ?",
        )
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(AppError::Database)?;

        Ok(result.rows_affected())
    }
}

#[async_trait]
impl NotificationStore for NotificationRepository {
    async fn create(&self, notification: CreateInAppNotification) -> AppResult<InAppNotification> {
        NotificationRepository::create(self, notification).await
    }
}
