//! Achievement queries

use chrono::{DateTime, Utc};
use common::models::{AchievementDefinition, UserAchievement};
use sqlx::postgres::{PgExecutor, PgRow};
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::{points_column, text_column};

/// All active achievement definitions
pub async fn list_active(pool: &PgPool) -> Result<Vec<AchievementDefinition>, sqlx::Error> {
    let rows = sqlx::query(
        r#"
        SELECT id, title, description, icon, trigger_type, trigger_value,
               points_reward, badge_id, is_active
        FROM achievements
        WHERE is_active
        ORDER BY trigger_value ASC, id ASC
        "#,
    )
    .fetch_all(pool)
    .await?;

    rows.iter().map(row_to_definition).collect()
}

/// A user's achievement progress rows
pub async fn list_for_user(
    pool: &PgPool,
    user_id: Uuid,
) -> Result<Vec<UserAchievement>, sqlx::Error> {
    let rows = sqlx::query(
        r#"
        SELECT user_id, achievement_id, progress, is_completed, completed_at
        FROM user_achievements
        WHERE user_id = $1
        ORDER BY completed_at DESC NULLS LAST, achievement_id ASC
        "#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|r| UserAchievement {
            user_id: r.get("user_id"),
            achievement_id: r.get("achievement_id"),
            progress: r.get("progress"),
            is_completed: r.get("is_completed"),
            completed_at: r.get("completed_at"),
        })
        .collect())
}

/// Store progress on an incomplete achievement. Completed rows are left untouched.
pub async fn save_progress(
    pool: &PgPool,
    user_id: Uuid,
    achievement_id: &str,
    progress: f64,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO user_achievements (user_id, achievement_id, progress, is_completed)
        VALUES ($1, $2, $3, FALSE)
        ON CONFLICT (user_id, achievement_id) DO UPDATE
        SET progress = EXCLUDED.progress
        WHERE user_achievements.is_completed = FALSE
        "#,
    )
    .bind(user_id)
    .bind(achievement_id)
    .bind(progress)
    .execute(pool)
    .await?;

    Ok(())
}

/// Mark an achievement completed. Returns false if it already was.
pub async fn complete<'e, E>(
    executor: E,
    user_id: Uuid,
    achievement_id: &str,
    progress: f64,
    completed_at: DateTime<Utc>,
) -> Result<bool, sqlx::Error>
where
    E: PgExecutor<'e>,
{
    let result = sqlx::query(
        r#"
        INSERT INTO user_achievements (user_id, achievement_id, progress, is_completed, completed_at)
        VALUES ($1, $2, $3, TRUE, $4)
        ON CONFLICT (user_id, achievement_id) DO UPDATE
        SET progress = EXCLUDED.progress,
            is_completed = TRUE,
            completed_at = EXCLUDED.completed_at
        WHERE user_achievements.is_completed = FALSE
        "#,
    )
    .bind(user_id)
    .bind(achievement_id)
    .bind(progress)
    .bind(completed_at)
    .execute(executor)
    .await?;

    Ok(result.rows_affected() == 1)
}

fn row_to_definition(row: &PgRow) -> Result<AchievementDefinition, sqlx::Error> {
    Ok(AchievementDefinition {
        id: row.try_get("id")?,
        title: row.try_get("title")?,
        description: row.try_get("description")?,
        icon: row.try_get("icon")?,
        trigger: text_column(row, "trigger_type")?,
        trigger_value: row.try_get("trigger_value")?,
        points_reward: points_column(row, "points_reward")?,
        badge_id: row.try_get("badge_id")?,
        is_active: row.try_get("is_active")?,
    })
}
