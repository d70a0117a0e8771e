//! Activity logging and summary routes

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use common::models::Activity;
use engine::handler::ActivityLogged;
use engine::summary::{ActivityStats, PeriodSummary};
use engine::ActivityInput;
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::ApiResult;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct ListQuery {
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_limit() -> i64 {
    20
}

#[derive(Deserialize)]
pub struct QuickLogRequest {
    pub template: String,
}

#[derive(Deserialize)]
pub struct MonthQuery {
    pub year: Option<i32>,
    pub month: Option<u32>,
}

/// Most recent activities
pub async fn list(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<Uuid>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<Vec<Activity>>> {
    let limit = query.limit.clamp(1, 100);
    let activities = state.engine.recent_activities(user_id, limit).await?;
    Ok(Json(activities))
}

/// Log an activity
pub async fn create(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<Uuid>,
    Json(input): Json<ActivityInput>,
) -> ApiResult<(StatusCode, Json<ActivityLogged>)> {
    let logged = state.engine.log_activity(user_id, input).await?;
    Ok((StatusCode::CREATED, Json(logged)))
}

/// Log a predefined template
pub async fn quick_log(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<Uuid>,
    Json(request): Json<QuickLogRequest>,
) -> ApiResult<(StatusCode, Json<ActivityLogged>)> {
    let logged = state.engine.quick_log(user_id, &request.template).await?;
    Ok((StatusCode::CREATED, Json(logged)))
}

pub async fn weekly_summary(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<Uuid>,
) -> ApiResult<Json<PeriodSummary>> {
    Ok(Json(state.engine.weekly_summary(user_id).await?))
}

pub async fn monthly_summary(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<Uuid>,
    Query(query): Query<MonthQuery>,
) -> ApiResult<Json<PeriodSummary>> {
    let summary = state
        .engine
        .monthly_summary(user_id, query.year, query.month)
        .await?;
    Ok(Json(summary))
}

pub async fn stats(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<Uuid>,
) -> ApiResult<Json<ActivityStats>> {
    Ok(Json(state.engine.activity_stats(user_id).await?))
}
