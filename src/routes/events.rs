use std::sync::Arc;

use axum::{
    extract::{Path, State},
    routing::{delete, get, post, put},
    Json, Router,
};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::db::models::{CreateScheduledEvent, Reminder, ScheduledEvent};
use crate::error::{AppError, AppResult};
use crate::services::clock::Clock;
use crate::services::scheduler;
use crate::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", post(create_event))
        .route("/:id", get(get_event))
        .route("/:id", delete(cancel_event))
        .route("/:id/fire-time", put(change_fire_time))
}

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct CreateEventRequest {
    pub owner_id: String,
    pub fire_time: NaiveDateTime,
    pub title: String,
    #[serde(default)]
    pub body: String,
    pub target_url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ChangeFireTimeRequest {
    pub fire_time: NaiveDateTime,
}

#[derive(Debug, Serialize)]
pub struct EventWithReminders {
    pub event: ScheduledEvent,
    pub reminders: Vec<Reminder>,
}

// ============================================================================
// Handlers
// ============================================================================

/// Create a scheduled event and fan out its reminders.
async fn create_event(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CreateEventRequest>,
) -> AppResult<Json<EventWithReminders>> {
    let create = CreateScheduledEvent {
        owner_id: request.owner_id,
        fire_time: request.fire_time,
        title: request.title,
        body: request.body,
        target_url: request.target_url,
    };

    scheduler::validate_event(&create, state.clock.now_utc())?;

    let event = state.events.create(create).await?;
    let prefs = state.preferences.get_or_create(&event.owner_id).await?;
    let reminders = state.scheduler.schedule(&event, &prefs).await?;

    Ok(Json(EventWithReminders { event, reminders }))
}

async fn get_event(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> AppResult<Json<ScheduledEvent>> {
    let event = state
        .events
        .find_by_id(&id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("event {}", id)))?;

    Ok(Json(event))
}

/// Move an event's fire time. Existing pending/suppressed reminders are
/// invalidated and a fresh, correctly offset set is computed; sent/failed
/// reminders remain untouched.
async fn change_fire_time(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(request): Json<ChangeFireTimeRequest>,
) -> AppResult<Json<EventWithReminders>> {
    if request.fire_time <= state.clock.now_utc() {
        return Err(AppError::Scheduling(
            "Event fire time must be in the future".to_string(),
        ));
    }

    let event = state
        .events
        .set_fire_time(&id, request.fire_time)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("event {}", id)))?;

    let prefs = state.preferences.get_or_create(&event.owner_id).await?;
    let reminders = state.scheduler.reschedule(&event, &prefs).await?;

    Ok(Json(EventWithReminders { event, reminders }))
}

/// Cancel an event and archive its live reminders.
async fn cancel_event(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> AppResult<Json<ScheduledEvent>> {
    let event = state
        .events
        .cancel(&id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("event {}", id)))?;

    let archived = state.reminders.invalidate_non_terminal(&id).await?;
    tracing::info!(
        "Cancelled event {} and archived {} reminder(s)",
        id,
        archived
    );

    Ok(Json(event))
}
