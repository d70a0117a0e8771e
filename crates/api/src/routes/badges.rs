//! Badge routes

use axum::{
    extract::{Path, State},
    Json,
};
use common::ledger::ProgressionState;
use common::models::{BadgeDefinition, UserBadge};
use engine::handler::Rewarded;
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::{ApiResult, DbResultExt, OptionExt};
use crate::state::AppState;

#[derive(Serialize)]
pub struct ShowcaseResponse {
    pub badge_id: String,
    pub is_showcased: bool,
}

/// Active badge catalog
pub async fn list(State(state): State<Arc<AppState>>) -> ApiResult<Json<Vec<BadgeDefinition>>> {
    let badges = db::badges::list_active(&state.pool).await.db_err()?;
    Ok(Json(badges))
}

pub async fn get(
    State(state): State<Arc<AppState>>,
    Path(badge_id): Path<String>,
) -> ApiResult<Json<BadgeDefinition>> {
    let badge = db::badges::get(&state.pool, &badge_id)
        .await
        .db_err()?
        .not_found(format!("Badge {} not found", badge_id))?;
    Ok(Json(badge))
}

/// Badges a user has earned
pub async fn user_badges(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<Uuid>,
) -> ApiResult<Json<Vec<UserBadge>>> {
    Ok(Json(state.engine.user_badges(user_id).await?))
}

/// Evaluate badge and achievement rules now
pub async fn check(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<Uuid>,
) -> ApiResult<Json<Rewarded<ProgressionState>>> {
    Ok(Json(state.engine.check_rewards(user_id).await?))
}

pub async fn toggle_showcase(
    State(state): State<Arc<AppState>>,
    Path((user_id, badge_id)): Path<(Uuid, String)>,
) -> ApiResult<Json<ShowcaseResponse>> {
    let is_showcased = state
        .engine
        .toggle_badge_showcase(user_id, &badge_id)
        .await?;
    Ok(Json(ShowcaseResponse {
        badge_id,
        is_showcased,
    }))
}
