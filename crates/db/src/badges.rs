//! Badge queries

use chrono::{DateTime, Utc};
use common::models::{BadgeDefinition, UserBadge};
use sqlx::postgres::{PgExecutor, PgRow};
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::{points_column, text_column};

/// All active badge definitions, cheapest first
pub async fn list_active(pool: &PgPool) -> Result<Vec<BadgeDefinition>, sqlx::Error> {
    let rows = sqlx::query(
        r#"
        SELECT id, name, description, category, rarity, requirement_type,
               requirement_value, points_reward, icon, is_active
        FROM badges
        WHERE is_active
        ORDER BY requirement_value ASC, id ASC
        "#,
    )
    .fetch_all(pool)
    .await?;

    rows.iter().map(row_to_badge).collect()
}

/// Get a badge definition by id
pub async fn get(pool: &PgPool, badge_id: &str) -> Result<Option<BadgeDefinition>, sqlx::Error> {
    let row = sqlx::query(
        r#"
        SELECT id, name, description, category, rarity, requirement_type,
               requirement_value, points_reward, icon, is_active
        FROM badges
        WHERE id = $1
        "#,
    )
    .bind(badge_id)
    .fetch_optional(pool)
    .await?;

    row.as_ref().map(row_to_badge).transpose()
}

/// Badges a user has earned, newest first
pub async fn list_for_user(pool: &PgPool, user_id: Uuid) -> Result<Vec<UserBadge>, sqlx::Error> {
    let rows = sqlx::query(
        r#"
        SELECT user_id, badge_id, earned_at, is_showcased
        FROM user_badges
        WHERE user_id = $1
        ORDER BY earned_at DESC
        "#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|r| UserBadge {
            user_id: r.get("user_id"),
            badge_id: r.get("badge_id"),
            earned_at: r.get("earned_at"),
            is_showcased: r.get("is_showcased"),
        })
        .collect())
}

/// Record a badge as earned. Returns false if the user already had it.
pub async fn award<'e, E>(
    executor: E,
    user_id: Uuid,
    badge_id: &str,
    earned_at: DateTime<Utc>,
) -> Result<bool, sqlx::Error>
where
    E: PgExecutor<'e>,
{
    let result = sqlx::query(
        r#"
        INSERT INTO user_badges (user_id, badge_id, earned_at, is_showcased)
        VALUES ($1, $2, $3, FALSE)
        ON CONFLICT (user_id, badge_id) DO NOTHING
        "#,
    )
    .bind(user_id)
    .bind(badge_id)
    .bind(earned_at)
    .execute(executor)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// Flip the showcase flag on an earned badge. None if the badge was not earned.
pub async fn toggle_showcase(
    pool: &PgPool,
    user_id: Uuid,
    badge_id: &str,
) -> Result<Option<bool>, sqlx::Error> {
    let row = sqlx::query(
        r#"
        UPDATE user_badges
        SET is_showcased = NOT is_showcased
        WHERE user_id = $1 AND badge_id = $2
        RETURNING is_showcased
        "#,
    )
    .bind(user_id)
    .bind(badge_id)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|r| r.get("is_showcased")))
}

fn row_to_badge(row: &PgRow) -> Result<BadgeDefinition, sqlx::Error> {
    Ok(BadgeDefinition {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        description: row.try_get("description")?,
        category: text_column(row, "category")?,
        rarity: text_column(row, "rarity")?,
        requirement: text_column(row, "requirement_type")?,
        requirement_value: row.try_get("requirement_value")?,
        points_reward: points_column(row, "points_reward")?,
        icon: row.try_get("icon")?,
        is_active: row.try_get("is_active")?,
    })
}
