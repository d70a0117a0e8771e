//! Progression queries

use common::ledger::ProgressionRecord;
use common::models::LeaderboardMetric;
use sqlx::postgres::{PgExecutor, PgRow};
use sqlx::{PgPool, Row};
use uuid::Uuid;

const PROGRESSION_COLUMNS: &str = r#"
    user_id, carbon_points, total_co2_saved, level, current_streak,
    longest_streak, last_activity_date, total_activities
"#;

/// Load a user's progression, if they have logged anything yet
pub async fn get(pool: &PgPool, user_id: Uuid) -> Result<Option<ProgressionRecord>, sqlx::Error> {
    let sql = format!(
        "SELECT {} FROM progression WHERE user_id = $1",
        PROGRESSION_COLUMNS
    );
    let row = sqlx::query(&sql)
        .bind(user_id)
        .fetch_optional(pool)
        .await?;

    row.as_ref().map(row_to_record).transpose()
}

/// Insert or overwrite a user's progression
pub async fn save<'e, E>(executor: E, record: &ProgressionRecord) -> Result<(), sqlx::Error>
where
    E: PgExecutor<'e>,
{
    sqlx::query(
        r#"
        INSERT INTO progression (
            user_id, carbon_points, total_co2_saved, level, current_streak,
            longest_streak, last_activity_date, total_activities, updated_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, NOW())
        ON CONFLICT (user_id) DO UPDATE
        SET carbon_points = EXCLUDED.carbon_points,
            total_co2_saved = EXCLUDED.total_co2_saved,
            level = EXCLUDED.level,
            current_streak = EXCLUDED.current_streak,
            longest_streak = EXCLUDED.longest_streak,
            last_activity_date = EXCLUDED.last_activity_date,
            total_activities = EXCLUDED.total_activities,
            updated_at = NOW()
        "#,
    )
    .bind(record.user_id)
    .bind(record.carbon_points)
    .bind(record.total_co2_saved)
    .bind(record.level)
    .bind(record.current_streak)
    .bind(record.longest_streak)
    .bind(record.last_activity_date)
    .bind(record.total_activities)
    .execute(executor)
    .await?;

    Ok(())
}

fn metric_column(metric: LeaderboardMetric) -> &'static str {
    match metric {
        LeaderboardMetric::Points => "carbon_points",
        LeaderboardMetric::Co2Saved => "total_co2_saved",
        LeaderboardMetric::Streak => "current_streak",
    }
}

/// Highest ranked users for a metric. Ties fall back to points, then user id.
pub async fn top(
    pool: &PgPool,
    metric: LeaderboardMetric,
    limit: i64,
) -> Result<Vec<ProgressionRecord>, sqlx::Error> {
    let sql = format!(
        r#"
        SELECT {} FROM progression
        ORDER BY {} DESC, carbon_points DESC, user_id ASC
        LIMIT $1
        "#,
        PROGRESSION_COLUMNS,
        metric_column(metric)
    );
    let rows = sqlx::query(&sql).bind(limit).fetch_all(pool).await?;

    rows.iter().map(row_to_record).collect()
}

/// Number of users strictly ahead of `value` on a metric
pub async fn count_above(
    pool: &PgPool,
    metric: LeaderboardMetric,
    value: f64,
) -> Result<i64, sqlx::Error> {
    let sql = format!(
        "SELECT COUNT(*) AS ahead FROM progression WHERE {}::float8 > $1",
        metric_column(metric)
    );
    let row = sqlx::query(&sql).bind(value).fetch_one(pool).await?;
    row.try_get("ahead")
}

/// Number of users with a progression row
pub async fn count(pool: &PgPool) -> Result<i64, sqlx::Error> {
    let row = sqlx::query("SELECT COUNT(*) AS total FROM progression")
        .fetch_one(pool)
        .await?;
    row.try_get("total")
}

fn row_to_record(row: &PgRow) -> Result<ProgressionRecord, sqlx::Error> {
    Ok(ProgressionRecord {
        user_id: row.try_get("user_id")?,
        carbon_points: row.try_get("carbon_points")?,
        total_co2_saved: row.try_get("total_co2_saved")?,
        level: row.try_get("level")?,
        current_streak: row.try_get("current_streak")?,
        longest_streak: row.try_get("longest_streak")?,
        last_activity_date: row.try_get("last_activity_date")?,
        total_activities: row.try_get("total_activities")?,
    })
}
