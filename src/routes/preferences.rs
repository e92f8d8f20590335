use std::sync::Arc;

use axum::{
    extract::{Path, State},
    routing::{get, put},
    Json, Router,
};

use crate::db::models::{UpdatePreferences, UserPreferences};
use crate::error::AppResult;
use crate::services::clock::Clock;
use crate::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/:owner_id", get(get_preferences))
        .route("/:owner_id", put(update_preferences))
}

async fn get_preferences(
    State(state): State<Arc<AppState>>,
    Path(owner_id): Path<String>,
) -> AppResult<Json<UserPreferences>> {
    let prefs = state.preferences.get_or_create(&owner_id).await?;
    Ok(Json(prefs))
}

/// Update an owner's preferences and re-run scheduling for their upcoming
/// events: lead-time or channel changes invalidate the events' live
/// reminders and fan out a fresh set; sent/failed rows are untouched.
async fn update_preferences(
    State(state): State<Arc<AppState>>,
    Path(owner_id): Path<String>,
    Json(update): Json<UpdatePreferences>,
) -> AppResult<Json<UserPreferences>> {
    update.validate()?;

    let prefs = state.preferences.update(&owner_id, update).await?;

    let now = state.clock.now_utc();
    for event in state.events.find_by_owner(&owner_id).await? {
        if event.is_cancelled() || event.fire_time <= now {
            continue;
        }
        state.scheduler.reschedule(&event, &prefs).await?;
    }

    Ok(Json(prefs))
}
