use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{get, post},
};
use serde::Serialize;
use std::sync::Arc;

use crate::api::AppState;
use crate::models::access_log::{AccessLogEntry, AccessLogFilter};
use crate::services::accounts::unlock_account;
use crate::utils::error::AppResult;

#[derive(Debug, Serialize)]
struct UnlockResponse {
    id: String,
    was_locked: bool,
}

async fn list_access_logs(
    State(state): State<Arc<AppState>>,
    Query(filter): Query<AccessLogFilter>,
) -> AppResult<Json<Vec<AccessLogEntry>>> {
    let entries = state.access_logs.list_access_logs(&filter).await?;
    Ok(Json(entries))
}

async fn unlock_user(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> AppResult<Json<UnlockResponse>> {
    let was_locked = unlock_account(state.users.as_ref(), &id).await?;
    Ok(Json(UnlockResponse { id, was_locked }))
}

pub fn routes(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/access-logs", get(list_access_logs))
        .route("/users/:id/unlock", post(unlock_user))
        .with_state(state)
}
