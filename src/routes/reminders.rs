use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::db::models::{Reminder, ReminderStatus};
use crate::error::{AppError, AppResult};
use crate::services::clock::Clock;
use crate::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_reminders))
        .route("/overdue", get(list_overdue))
        .route("/:id/mark-sent", post(mark_sent))
}

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ListRemindersQuery {
    pub owner_id: String,
    pub status: Option<String>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct RemindersListResponse {
    pub items: Vec<Reminder>,
    pub page: i64,
    pub per_page: i64,
}

// ============================================================================
// Handlers
// ============================================================================

/// Audit listing of an owner's reminders, optionally filtered by status.
async fn list_reminders(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListRemindersQuery>,
) -> AppResult<Json<RemindersListResponse>> {
    if let Some(ref status) = query.status {
        if ReminderStatus::parse(status).is_none() {
            return Err(AppError::BadRequest(format!(
                "Unknown reminder status: '{}'",
                status
            )));
        }
    }

    let page = query.page.unwrap_or(1).max(1);
    let per_page = query.per_page.unwrap_or(20).clamp(1, 100);
    let offset = (page - 1) * per_page;

    let items = state
        .reminders
        .find_by_owner(&query.owner_id, query.status.as_deref(), per_page, offset)
        .await?;

    Ok(Json(RemindersListResponse {
        items,
        page,
        per_page,
    }))
}

/// All pending reminders whose fire time has passed. Consumed by
/// externally-triggered sync/backfill passes.
async fn list_overdue(State(state): State<Arc<AppState>>) -> AppResult<Json<Vec<Reminder>>> {
    let overdue = state
        .reminders
        .find_overdue_pending(state.clock.now_utc())
        .await?;

    Ok(Json(overdue))
}

/// Mark a reminder sent out-of-band (e.g. a consumer delivered it through
/// its own background path). Uses the same compare-and-set transition as the
/// poller, so a concurrent poll cannot double-send.
async fn mark_sent(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> AppResult<Json<Reminder>> {
    let now = state.clock.now_utc();

    if let Some(reminder) = state.reminders.claim_for_send(&id, now).await? {
        return Ok(Json(reminder));
    }

    match state.reminders.find_by_id(&id).await? {
        Some(reminder) => Err(AppError::Conflict(format!(
            "Reminder {} is already '{}' (or invalidated)",
            id, reminder.status
        ))),
        None => Err(AppError::NotFound(format!("reminder {}", id))),
    }
}
