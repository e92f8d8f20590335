use std::sync::Arc;

use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::db::models::PermissionState;
use crate::error::AppResult;
use crate::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/:owner_id", get(get_permission))
        .route("/:owner_id", post(report_permission))
}

#[derive(Debug, Deserialize)]
pub struct ReportPermissionRequest {
    pub state: PermissionState,
}

#[derive(Debug, Serialize)]
pub struct PermissionResponse {
    pub owner_id: String,
    pub state: PermissionState,
}

async fn get_permission(
    State(state): State<Arc<AppState>>,
    Path(owner_id): Path<String>,
) -> AppResult<Json<PermissionResponse>> {
    let permission = state.permissions.current(&owner_id).await?;

    Ok(Json(PermissionResponse {
        owner_id,
        state: permission,
    }))
}

/// Record the outcome of an explicit permission request made by the
/// consumer. The poller never calls this; it only ever reads the state.
async fn report_permission(
    State(state): State<Arc<AppState>>,
    Path(owner_id): Path<String>,
    Json(request): Json<ReportPermissionRequest>,
) -> AppResult<Json<PermissionResponse>> {
    let stored = state.permissions.report(&owner_id, request.state).await?;

    Ok(Json(PermissionResponse {
        owner_id,
        state: stored,
    }))
}
