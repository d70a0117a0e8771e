//! Leaderboard routes

use axum::{
    extract::{Path, Query, State},
    Json,
};
use common::models::LeaderboardMetric;
use engine::leaderboard::{GlobalLeaderboard, DEFAULT_LEADERBOARD_LIMIT};
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::ApiResult;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct LeaderboardQuery {
    /// "points", "co2_saved" or "streak"
    #[serde(default = "default_metric")]
    metric: LeaderboardMetric,
    #[serde(default = "default_limit")]
    limit: i64,
}

fn default_metric() -> LeaderboardMetric {
    LeaderboardMetric::Points
}

fn default_limit() -> i64 {
    DEFAULT_LEADERBOARD_LIMIT
}

/// All users ranked by one statistic, with the caller's own rank
pub async fn global(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<Uuid>,
    Query(query): Query<LeaderboardQuery>,
) -> ApiResult<Json<GlobalLeaderboard>> {
    let leaderboard = state
        .engine
        .leaderboard(user_id, query.metric, query.limit)
        .await?;
    Ok(Json(leaderboard))
}
