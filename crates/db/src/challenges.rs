//! Challenge and participation queries

use chrono::{DateTime, NaiveDate, Utc};
use common::models::{Challenge, ChallengeParticipation};
use sqlx::postgres::{PgExecutor, PgRow};
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::{points_column, points_param, text_column};

const CHALLENGE_COLUMNS: &str = r#"
    c.id, c.name, c.description, c.kind, c.difficulty, c.target_type, c.target_value,
    c.reward_points, c.start_date, c.end_date, c.is_active
"#;

const PARTICIPATION_COLUMNS: &str = r#"
    p.challenge_id, p.user_id, p.progress, p.is_completed, p.completed_at, p.joined_at
"#;

/// Get a challenge by id
pub async fn get(pool: &PgPool, challenge_id: Uuid) -> Result<Option<Challenge>, sqlx::Error> {
    let sql = format!("SELECT {} FROM challenges c WHERE c.id = $1", CHALLENGE_COLUMNS);
    let row = sqlx::query(&sql)
        .bind(challenge_id)
        .fetch_optional(pool)
        .await?;

    row.as_ref().map(row_to_challenge).transpose()
}

/// Active challenges, newest window first
pub async fn list_active(pool: &PgPool) -> Result<Vec<Challenge>, sqlx::Error> {
    let sql = format!(
        "SELECT {} FROM challenges c WHERE c.is_active ORDER BY c.start_date DESC",
        CHALLENGE_COLUMNS
    );
    let rows = sqlx::query(&sql).fetch_all(pool).await?;

    rows.iter().map(row_to_challenge).collect()
}

/// Create a challenge
pub async fn insert(pool: &PgPool, challenge: &Challenge) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO challenges (
            id, name, description, kind, difficulty, target_type, target_value,
            reward_points, start_date, end_date, is_active, created_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, NOW())
        "#,
    )
    .bind(challenge.id)
    .bind(&challenge.name)
    .bind(&challenge.description)
    .bind(challenge.kind.as_str())
    .bind(challenge.difficulty.as_str())
    .bind(challenge.target.as_str())
    .bind(challenge.target_value)
    .bind(points_param(challenge.reward_points)?)
    .bind(challenge.start_date)
    .bind(challenge.end_date)
    .bind(challenge.is_active)
    .execute(pool)
    .await?;

    Ok(())
}

/// Get a user's participation in a challenge
pub async fn get_participation(
    pool: &PgPool,
    challenge_id: Uuid,
    user_id: Uuid,
) -> Result<Option<ChallengeParticipation>, sqlx::Error> {
    let sql = format!(
        "SELECT {} FROM challenge_participations p WHERE p.challenge_id = $1 AND p.user_id = $2",
        PARTICIPATION_COLUMNS
    );
    let row = sqlx::query(&sql)
        .bind(challenge_id)
        .bind(user_id)
        .fetch_optional(pool)
        .await?;

    row.as_ref().map(row_to_participation).transpose()
}

/// Enrol a user. Returns false if they were already enrolled.
pub async fn join(pool: &PgPool, participation: &ChallengeParticipation) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        INSERT INTO challenge_participations (challenge_id, user_id, progress, is_completed, completed_at, joined_at)
        VALUES ($1, $2, $3, $4, $5, $6)
        ON CONFLICT (challenge_id, user_id) DO NOTHING
        "#,
    )
    .bind(participation.challenge_id)
    .bind(participation.user_id)
    .bind(participation.progress)
    .bind(participation.is_completed)
    .bind(participation.completed_at)
    .bind(participation.joined_at)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// Remove an incomplete participation. Returns false if nothing was removed.
pub async fn leave(pool: &PgPool, challenge_id: Uuid, user_id: Uuid) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        DELETE FROM challenge_participations
        WHERE challenge_id = $1 AND user_id = $2 AND is_completed = FALSE
        "#,
    )
    .bind(challenge_id)
    .bind(user_id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// Raise progress on an incomplete participation; never lowers it
pub async fn save_progress(
    pool: &PgPool,
    challenge_id: Uuid,
    user_id: Uuid,
    progress: f64,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        UPDATE challenge_participations
        SET progress = GREATEST(progress, $3)
        WHERE challenge_id = $1 AND user_id = $2 AND is_completed = FALSE
        "#,
    )
    .bind(challenge_id)
    .bind(user_id)
    .bind(progress)
    .execute(pool)
    .await?;

    Ok(())
}

/// Mark a participation completed. Returns false if it already was.
pub async fn complete<'e, E>(
    executor: E,
    challenge_id: Uuid,
    user_id: Uuid,
    completed_at: DateTime<Utc>,
) -> Result<bool, sqlx::Error>
where
    E: PgExecutor<'e>,
{
    let result = sqlx::query(
        r#"
        UPDATE challenge_participations
        SET progress = 100, is_completed = TRUE, completed_at = $3
        WHERE challenge_id = $1 AND user_id = $2 AND is_completed = FALSE
        "#,
    )
    .bind(challenge_id)
    .bind(user_id)
    .bind(completed_at)
    .execute(executor)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// All of a user's participations with their challenges
pub async fn list_for_user(
    pool: &PgPool,
    user_id: Uuid,
) -> Result<Vec<(Challenge, ChallengeParticipation)>, sqlx::Error> {
    let sql = format!(
        r#"
        SELECT {}, {}
        FROM challenge_participations p
        JOIN challenges c ON c.id = p.challenge_id
        WHERE p.user_id = $1
        ORDER BY p.joined_at DESC
        "#,
        CHALLENGE_COLUMNS, PARTICIPATION_COLUMNS
    );
    let rows = sqlx::query(&sql).bind(user_id).fetch_all(pool).await?;

    rows.iter()
        .map(|r| Ok((row_to_challenge(r)?, row_to_participation(r)?)))
        .collect()
}

/// Incomplete participations in active challenges whose window contains `today`
pub async fn list_open_for_user(
    pool: &PgPool,
    user_id: Uuid,
    today: NaiveDate,
) -> Result<Vec<(Challenge, ChallengeParticipation)>, sqlx::Error> {
    let sql = format!(
        r#"
        SELECT {}, {}
        FROM challenge_participations p
        JOIN challenges c ON c.id = p.challenge_id
        WHERE p.user_id = $1
          AND p.is_completed = FALSE
          AND c.is_active
          AND c.start_date <= $2
          AND c.end_date >= $2
        ORDER BY c.end_date ASC
        "#,
        CHALLENGE_COLUMNS, PARTICIPATION_COLUMNS
    );
    let rows = sqlx::query(&sql)
        .bind(user_id)
        .bind(today)
        .fetch_all(pool)
        .await?;

    rows.iter()
        .map(|r| Ok((row_to_challenge(r)?, row_to_participation(r)?)))
        .collect()
}

/// Participants of a challenge ordered by progress, then join time
pub async fn list_participants(
    pool: &PgPool,
    challenge_id: Uuid,
) -> Result<Vec<ChallengeParticipation>, sqlx::Error> {
    let sql = format!(
        r#"
        SELECT {}
        FROM challenge_participations p
        WHERE p.challenge_id = $1
        ORDER BY p.progress DESC, p.joined_at ASC
        "#,
        PARTICIPATION_COLUMNS
    );
    let rows = sqlx::query(&sql).bind(challenge_id).fetch_all(pool).await?;

    rows.iter().map(row_to_participation).collect()
}

fn row_to_challenge(row: &PgRow) -> Result<Challenge, sqlx::Error> {
    Ok(Challenge {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        description: row.try_get("description")?,
        kind: text_column(row, "kind")?,
        difficulty: text_column(row, "difficulty")?,
        target: text_column(row, "target_type")?,
        target_value: row.try_get("target_value")?,
        reward_points: points_column(row, "reward_points")?,
        start_date: row.try_get("start_date")?,
        end_date: row.try_get("end_date")?,
        is_active: row.try_get("is_active")?,
    })
}

fn row_to_participation(row: &PgRow) -> Result<ChallengeParticipation, sqlx::Error> {
    Ok(ChallengeParticipation {
        challenge_id: row.try_get("challenge_id")?,
        user_id: row.try_get("user_id")?,
        progress: row.try_get("progress")?,
        is_completed: row.try_get("is_completed")?,
        completed_at: row.try_get("completed_at")?,
        joined_at: row.try_get("joined_at")?,
    })
}
