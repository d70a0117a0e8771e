//! Challenge routes

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::NaiveDate;
use common::models::{
    Challenge, ChallengeKind, ChallengeParticipation, ChallengeTarget, Difficulty,
};
use engine::challenges::{ChallengeStanding, ChallengeStats};
use engine::handler::Rewarded;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::error::{ApiError, ApiResult, DbResultExt, OptionExt};
use crate::state::AppState;

#[derive(Deserialize)]
pub struct CreateChallenge {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_kind")]
    pub kind: ChallengeKind,
    #[serde(default = "default_difficulty")]
    pub difficulty: Difficulty,
    pub target: ChallengeTarget,
    pub target_value: f64,
    #[serde(default)]
    pub reward_points: u32,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

fn default_kind() -> ChallengeKind {
    ChallengeKind::Individual
}

fn default_difficulty() -> Difficulty {
    Difficulty::Medium
}

#[derive(Serialize)]
pub struct UserChallenge {
    pub challenge: Challenge,
    pub participation: ChallengeParticipation,
}

/// Active challenges
pub async fn list(State(state): State<Arc<AppState>>) -> ApiResult<Json<Vec<Challenge>>> {
    let challenges = db::challenges::list_active(&state.pool).await.db_err()?;
    Ok(Json(challenges))
}

pub async fn create(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CreateChallenge>,
) -> ApiResult<(StatusCode, Json<Challenge>)> {
    if request.name.trim().is_empty() {
        return Err(ApiError::Validation("Challenge name is required".to_string()));
    }
    if request.start_date > request.end_date {
        return Err(ApiError::Validation(
            "start_date must not be after end_date".to_string(),
        ));
    }
    if !request.target_value.is_finite() || request.target_value <= 0.0 {
        return Err(ApiError::Validation(
            "target_value must be positive".to_string(),
        ));
    }

    let challenge = Challenge {
        id: Uuid::new_v4(),
        name: request.name.trim().to_string(),
        description: request.description,
        kind: request.kind,
        difficulty: request.difficulty,
        target: request.target,
        target_value: request.target_value,
        reward_points: request.reward_points,
        start_date: request.start_date,
        end_date: request.end_date,
        is_active: true,
    };
    db::challenges::insert(&state.pool, &challenge)
        .await
        .db_err()?;
    info!("Created challenge {} ({})", challenge.name, challenge.id);

    Ok((StatusCode::CREATED, Json(challenge)))
}

pub async fn get(
    State(state): State<Arc<AppState>>,
    Path(challenge_id): Path<Uuid>,
) -> ApiResult<Json<Challenge>> {
    let challenge = db::challenges::get(&state.pool, challenge_id)
        .await
        .db_err()?
        .not_found(format!("Challenge {} not found", challenge_id))?;
    Ok(Json(challenge))
}

pub async fn leaderboard(
    State(state): State<Arc<AppState>>,
    Path(challenge_id): Path<Uuid>,
) -> ApiResult<Json<Vec<ChallengeStanding>>> {
    Ok(Json(state.engine.challenge_leaderboard(challenge_id).await?))
}

/// Challenges a user has joined
pub async fn user_challenges(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<Uuid>,
) -> ApiResult<Json<Vec<UserChallenge>>> {
    let joined = state.engine.user_challenges(user_id).await?;
    Ok(Json(
        joined
            .into_iter()
            .map(|(challenge, participation)| UserChallenge {
                challenge,
                participation,
            })
            .collect(),
    ))
}

pub async fn join(
    State(state): State<Arc<AppState>>,
    Path((user_id, challenge_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<(StatusCode, Json<Rewarded<ChallengeParticipation>>)> {
    let joined = state.engine.join_challenge(user_id, challenge_id).await?;
    Ok((StatusCode::CREATED, Json(joined)))
}

pub async fn leave(
    State(state): State<Arc<AppState>>,
    Path((user_id, challenge_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<StatusCode> {
    state.engine.leave_challenge(user_id, challenge_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Recompute progress on demand
pub async fn refresh(
    State(state): State<Arc<AppState>>,
    Path((user_id, challenge_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<Json<Rewarded<ChallengeParticipation>>> {
    Ok(Json(
        state.engine.refresh_challenge(user_id, challenge_id).await?,
    ))
}

pub async fn stats(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<Uuid>,
) -> ApiResult<Json<ChallengeStats>> {
    Ok(Json(state.engine.challenge_stats(user_id).await?))
}
