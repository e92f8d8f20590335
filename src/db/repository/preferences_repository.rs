use async_trait::async_trait;
use chrono::Utc;
use sqlx::SqlitePool;

use crate::db::models::{UpdatePreferences, UserPreferences};
use crate::db::store::PreferenceStore;
use crate::error::{AppError, AppResult};

const PREFERENCES_COLUMNS: &str = r#"
    owner_id,
    enabled_channels,
    lead_times_minutes,
    quiet_hours_start,
    quiet_hours_end,
    timezone,
    email_address,
    created_at,
    updated_at
"#;

#[derive(Clone)]
pub struct PreferencesRepository {
    pool: SqlitePool,
}

impl PreferencesRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn find_by_owner(&self, owner_id: &str) -> AppResult<Option<UserPreferences>> {
        sqlx::query_as::<_, UserPreferences>(&format!(
            "SELECT {PREFERENCES_COLUMNS} FROM user_preferences WHERE owner_id = ?"
        ))
        .bind(owner_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::Database)
    }

    /// Preferences for an owner, creating the default row on first access so
    /// the engine always has something to schedule against.
    pub async fn get_or_create(&self, owner_id: &str) -> AppResult<UserPreferences> {
        if let Some(prefs) = self.find_by_owner(owner_id).await? {
            return Ok(prefs);
        }

        let defaults = UserPreferences::default();
        let now = Utc::now().naive_utc();

        let inserted = sqlx::query_as::<_, UserPreferences>(&format!(
            r#"
            INSERT INTO user_preferences (
                owner_id, enabled_channels, lead_times_minutes,
                quiet_hours_start, quiet_hours_end, timezone, email_address,
                created_at, updated_at
            ) VALUES (?, ?, ?, NULL, NULL, ?, NULL, ?, ?)
            ON CONFLICT(owner_id) DO NOTHING
            RETURNING {PREFERENCES_COLUMNS}
            "#
        ))
        .bind(owner_id)
        .bind(&defaults.enabled_channels)
        .bind(&defaults.lead_times_minutes)
        .bind(&defaults.timezone)
        .bind(now)
        .bind(now)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::Database)?;

        if let Some(prefs) = inserted {
            return Ok(prefs);
        }

        // DO NOTHING returns no row when a concurrent insert won; re-read.
        self.find_by_owner(owner_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("preferences for {}", owner_id)))
    }

    /// Apply a validated partial update over the stored preferences.
    pub async fn update(
        &self,
        owner_id: &str,
        update: UpdatePreferences,
    ) -> AppResult<UserPreferences> {
        let current = self.get_or_create(owner_id).await?;

        let enabled_channels = match update.enabled_channels {
            Some(channels) => {
                let names: Vec<&str> = channels.iter().map(|c| c.as_str()).collect();
                serde_json::to_string(&names)
                    .map_err(|e| AppError::Internal(anyhow::anyhow!(e)))?
            }
            None => current.enabled_channels,
        };
        let lead_times_minutes = match update.lead_times_minutes {
            Some(leads) => serde_json::to_string(&leads)
                .map_err(|e| AppError::Internal(anyhow::anyhow!(e)))?,
            None => current.lead_times_minutes,
        };
        let (quiet_hours_start, quiet_hours_end) = match update.quiet_hours {
            Some(Some(window)) => (Some(window.start), Some(window.end)),
            Some(None) => (None, None),
            None => (current.quiet_hours_start, current.quiet_hours_end),
        };
        let timezone = update.timezone.unwrap_or(current.timezone);
        let email_address = update.email_address.or(current.email_address);

        let now = Utc::now().naive_utc();
        sqlx::query_as::<_, UserPreferences>(&format!(
            r#"
            UPDATE user_preferences
            SET enabled_channels = ?,
                lead_times_minutes = ?,
                quiet_hours_start = ?,
                quiet_hours_end = ?,
                timezone = ?,
                email_address = ?,
                updated_at = ?
            WHERE owner_id = ?
            RETURNING {PREFERENCES_COLUMNS}
            "#
        ))
        .bind(enabled_channels)
        .bind(lead_times_minutes)
        .bind(quiet_hours_start)
        .bind(quiet_hours_end)
        .bind(timezone)
        .bind(email_address)
        .bind(now)
        .bind(owner_id)
        .fetch_one(&self.pool)
        .await
        .map_err(AppError::Database)
    }
}

#[async_trait]
impl PreferenceStore for PreferencesRepository {
    async fn get(&self, owner_id: &str) -> AppResult<UserPreferences> {
        self.get_or_create(owner_id).await
    }
}
