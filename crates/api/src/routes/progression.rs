//! Level, points and streak routes

use axum::{
    extract::{Path, State},
    Json,
};
use engine::handler::{ProgressionSummary, StreakHistory};
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::{ApiResult, DbResultExt};
use crate::state::AppState;

#[derive(Serialize)]
pub struct ProgressionResponse {
    #[serde(flatten)]
    pub summary: ProgressionSummary,
    pub unread_notifications: i64,
}

pub async fn summary(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<Uuid>,
) -> ApiResult<Json<ProgressionResponse>> {
    let summary = state.engine.progression_summary(user_id).await?;
    let unread_notifications = db::notifications::count_unread(&state.pool, user_id)
        .await
        .db_err()?;

    Ok(Json(ProgressionResponse {
        summary,
        unread_notifications,
    }))
}

/// Current and longest streak with the last 30 days of history
pub async fn streak(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<Uuid>,
) -> ApiResult<Json<StreakHistory>> {
    Ok(Json(state.engine.streak_history(user_id).await?))
}
