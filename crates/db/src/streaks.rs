//! Daily streak history queries

use common::models::DailyStreak;
use sqlx::postgres::PgExecutor;
use sqlx::{PgPool, Row};
use uuid::Uuid;

/// Insert or replace the history row for one day
pub async fn record_day<'e, E>(executor: E, day: &DailyStreak) -> Result<(), sqlx::Error>
where
    E: PgExecutor<'e>,
{
    sqlx::query(
        r#"
        INSERT INTO daily_streaks (user_id, date, activities_count, co2_saved, streak_day)
        VALUES ($1, $2, $3, $4, $5)
        ON CONFLICT (user_id, date) DO UPDATE
        SET activities_count = EXCLUDED.activities_count,
            co2_saved = EXCLUDED.co2_saved,
            streak_day = EXCLUDED.streak_day
        "#,
    )
    .bind(day.user_id)
    .bind(day.date)
    .bind(day.activities_count)
    .bind(day.co2_saved)
    .bind(day.streak_day)
    .execute(executor)
    .await?;

    Ok(())
}

/// Get the history row for one day
pub async fn get_day(
    pool: &PgPool,
    user_id: Uuid,
    date: chrono::NaiveDate,
) -> Result<Option<DailyStreak>, sqlx::Error> {
    let row = sqlx::query(
        r#"
        SELECT user_id, date, activities_count, co2_saved, streak_day
        FROM daily_streaks
        WHERE user_id = $1 AND date = $2
        "#,
    )
    .bind(user_id)
    .bind(date)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|r| DailyStreak {
        user_id: r.get("user_id"),
        date: r.get("date"),
        activities_count: r.get("activities_count"),
        co2_saved: r.get("co2_saved"),
        streak_day: r.get("streak_day"),
    }))
}

/// Most recent history rows
pub async fn history(pool: &PgPool, user_id: Uuid, limit: i64) -> Result<Vec<DailyStreak>, sqlx::Error> {
    let rows = sqlx::query(
        r#"
        SELECT user_id, date, activities_count, co2_saved, streak_day
        FROM daily_streaks
        WHERE user_id = $1
        ORDER BY date DESC
        LIMIT $2
        "#,
    )
    .bind(user_id)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|r| DailyStreak {
            user_id: r.get("user_id"),
            date: r.get("date"),
            activities_count: r.get("activities_count"),
            co2_saved: r.get("co2_saved"),
            streak_day: r.get("streak_day"),
        })
        .collect())
}
