use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;

use crate::db::models::InAppNotification;
use crate::error::{AppError, AppResult};
use crate::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/owner/:owner_id", get(list_notifications))
        .route("/:id/read", post(mark_read))
}

#[derive(Debug, Deserialize)]
pub struct ListNotificationsQuery {
    #[serde(default)]
    pub unread_only: bool,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

/// In-app notification feed for an owner, newest first.
async fn list_notifications(
    State(state): State<Arc<AppState>>,
    Path(owner_id): Path<String>,
    Query(query): Query<ListNotificationsQuery>,
) -> AppResult<Json<Vec<InAppNotification>>> {
    let page = query.page.unwrap_or(1).max(1);
    let per_page = query.per_page.unwrap_or(20).clamp(1, 100);
    let offset = (page - 1) * per_page;

    let items = state
        .notifications
        .find_by_owner(&owner_id, query.unread_only, per_page, offset)
        .await?;

    Ok(Json(items))
}

async fn mark_read(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> AppResult<Json<InAppNotification>> {
    let notification = state
        .notifications
        .mark_read(&id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("notification {}", id)))?;

    Ok(Json(notification))
}
