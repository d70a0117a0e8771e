//! Achievement routes

use axum::{
    extract::{Path, State},
    Json,
};
use engine::evaluator::AchievementProgress;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::ApiResult;
use crate::state::AppState;

/// A user's progress toward every active achievement
pub async fn user_progress(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<Uuid>,
) -> ApiResult<Json<Vec<AchievementProgress>>> {
    Ok(Json(state.engine.achievements(user_id).await?))
}
