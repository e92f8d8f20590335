use async_trait::async_trait;
use chrono::Utc;
use sqlx::SqlitePool;

use crate::db::models::{PermissionState, PushPermission};
use crate::db::store::PermissionStore;
use crate::error::{AppError, AppResult};

/// Repository for per-owner push permission state.
#[derive(Clone)]
pub struct PushPermissionRepository {
    pool: SqlitePool,
}

impl PushPermissionRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Current state for an owner; owners with no stored row are `default`.
    pub async fn find_state(&self, owner_id: &str) -> AppResult<PermissionState> {
        let row = sqlx::query_as::<_, PushPermission>(
            "SELECT owner_id, state, updated_at FROM push_permissions WHERE owner_id = ?",
        )
        .bind(owner_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::Database)?;

        Ok(row
            .map(|p| p.permission_state())
            .unwrap_or(PermissionState::Default))
    }

    pub async fn set_state(
        &self,
        owner_id: &str,
        state: PermissionState,
    ) -> AppResult<PermissionState> {
        let now = Utc::now().naive_utc();
        sqlx::query(
            r#"
            INSERT INTO push_permissions (owner_id, state, updated_at)
            VALUES (?, ?, ?)
            ON CONFLICT(owner_id) DO UPDATE SET state = excluded.state, updated_at = excluded.updated_at
            "#,
        )
        .bind(owner_id)
        .bind(state.as_str())
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(AppError::Database)?;

        Ok(state)
    }
}

#[async_trait]
impl PermissionStore for PushPermissionRepository {
    async fn get(&self, owner_id: &str) -> AppResult<PermissionState> {
        self.find_state(owner_id).await
    }

    async fn set(&self, owner_id: &str, state: PermissionState) -> AppResult<PermissionState> {
        self.set_state(owner_id, state).await
    }
}
