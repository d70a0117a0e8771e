//! Notification routes

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use common::models::Notification;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::error::{ApiError, ApiResult, DbResultExt};
use crate::state::AppState;

#[derive(Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub unread_only: bool,
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_limit() -> i64 {
    50
}

#[derive(Serialize)]
pub struct MarkAllResponse {
    pub marked: u64,
}

pub async fn list(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<Uuid>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<Vec<Notification>>> {
    let notifications = db::notifications::list_for_user(
        &state.pool,
        user_id,
        query.unread_only,
        query.limit.clamp(1, 200),
    )
    .await
    .db_err()?;
    Ok(Json(notifications))
}

pub async fn mark_read(
    State(state): State<Arc<AppState>>,
    Path((user_id, notification_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<StatusCode> {
    if !db::notifications::mark_read(&state.pool, user_id, notification_id)
        .await
        .db_err()?
    {
        return Err(ApiError::NotFound(format!(
            "Notification {} not found",
            notification_id
        )));
    }
    Ok(StatusCode::NO_CONTENT)
}

pub async fn mark_all_read(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<Uuid>,
) -> ApiResult<Json<MarkAllResponse>> {
    let marked = db::notifications::mark_all_read(&state.pool, user_id)
        .await
        .db_err()?;
    Ok(Json(MarkAllResponse { marked }))
}
