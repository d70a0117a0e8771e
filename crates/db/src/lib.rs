//! Database layer for Carbon Karma

use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Row};
use std::str::FromStr;
use tracing::info;

pub mod achievements;
pub mod activities;
pub mod badges;
pub mod challenges;
pub mod notifications;
pub mod progression;
pub mod streaks;

/// Create a database connection pool
pub async fn create_pool(database_url: &str, max_connections: u32) -> Result<PgPool, sqlx::Error> {
    info!("Connecting to database...");
    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await?;
    info!("Database connected");
    Ok(pool)
}

/// Run database migrations from SQL files
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::Error> {
    info!("Running migrations...");

    // Schema and seeded badge/achievement definitions
    let migration_sql = include_str!("../../../migrations/001_initial.sql");
    sqlx::raw_sql(migration_sql).execute(pool).await?;

    info!("Migrations complete");
    Ok(())
}

/// Decode a text column into one of the domain enums
pub(crate) fn text_column<T>(row: &PgRow, column: &str) -> Result<T, sqlx::Error>
where
    T: FromStr<Err = common::Error>,
{
    let raw: String = row.try_get(column)?;
    raw.parse()
        .map_err(|e: common::Error| sqlx::Error::Decode(Box::new(e)))
}

/// Nullable variant of [`text_column`]
pub(crate) fn optional_text_column<T>(row: &PgRow, column: &str) -> Result<Option<T>, sqlx::Error>
where
    T: FromStr<Err = common::Error>,
{
    let raw: Option<String> = row.try_get(column)?;
    raw.map(|s| s.parse())
        .transpose()
        .map_err(|e: common::Error| sqlx::Error::Decode(Box::new(e)))
}

/// Point amounts are bound as INTEGER; values past `i32::MAX` are refused
pub(crate) fn points_param(points: u32) -> Result<i32, sqlx::Error> {
    i32::try_from(points).map_err(|e| sqlx::Error::Encode(Box::new(e)))
}

/// Stored point amounts are non-negative INTEGER columns
pub(crate) fn points_column(row: &PgRow, column: &str) -> Result<u32, sqlx::Error> {
    let raw: i32 = row.try_get(column)?;
    Ok(u32::try_from(raw).unwrap_or(0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_points_param_refuses_overflow() {
        assert_eq!(points_param(17).unwrap(), 17);
        assert_eq!(points_param(i32::MAX as u32).unwrap(), i32::MAX);
        assert!(points_param(i32::MAX as u32 + 1).is_err());
        assert!(points_param(u32::MAX).is_err());
    }
}
