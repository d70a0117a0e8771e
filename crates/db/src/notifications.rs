//! Notification queries

use chrono::{DateTime, Utc};
use common::models::{NewNotification, Notification};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::text_column;

/// Store a notification
pub async fn insert(
    pool: &PgPool,
    notification: &NewNotification,
    created_at: DateTime<Utc>,
) -> Result<Notification, sqlx::Error> {
    let row = sqlx::query(
        r#"
        INSERT INTO notifications (id, user_id, kind, title, message, related_id, is_read, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, FALSE, $7)
        RETURNING id, user_id, kind, title, message, related_id, is_read, created_at
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(notification.user_id)
    .bind(notification.kind.as_str())
    .bind(&notification.title)
    .bind(&notification.message)
    .bind(&notification.related_id)
    .bind(created_at)
    .fetch_one(pool)
    .await?;

    row_to_notification(&row)
}

/// A user's notifications, newest first
pub async fn list_for_user(
    pool: &PgPool,
    user_id: Uuid,
    unread_only: bool,
    limit: i64,
) -> Result<Vec<Notification>, sqlx::Error> {
    let rows = sqlx::query(
        r#"
        SELECT id, user_id, kind, title, message, related_id, is_read, created_at
        FROM notifications
        WHERE user_id = $1 AND (NOT $2 OR is_read = FALSE)
        ORDER BY created_at DESC
        LIMIT $3
        "#,
    )
    .bind(user_id)
    .bind(unread_only)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    rows.iter().map(row_to_notification).collect()
}

/// Mark one notification read. Returns false if it does not belong to the user.
pub async fn mark_read(pool: &PgPool, user_id: Uuid, id: Uuid) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("UPDATE notifications SET is_read = TRUE WHERE id = $1 AND user_id = $2")
        .bind(id)
        .bind(user_id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() == 1)
}

/// Mark every unread notification read, returning how many changed
pub async fn mark_all_read(pool: &PgPool, user_id: Uuid) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE notifications SET is_read = TRUE WHERE user_id = $1 AND is_read = FALSE",
    )
    .bind(user_id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}

/// Number of unread notifications
pub async fn count_unread(pool: &PgPool, user_id: Uuid) -> Result<i64, sqlx::Error> {
    let row = sqlx::query(
        "SELECT COUNT(*) as count FROM notifications WHERE user_id = $1 AND is_read = FALSE",
    )
    .bind(user_id)
    .fetch_one(pool)
    .await?;

    Ok(row.get::<i64, _>("count"))
}

fn row_to_notification(row: &PgRow) -> Result<Notification, sqlx::Error> {
    Ok(Notification {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        kind: text_column(row, "kind")?,
        title: row.try_get("title")?,
        message: row.try_get("message")?,
        related_id: row.try_get("related_id")?,
        is_read: row.try_get("is_read")?,
        created_at: row.try_get("created_at")?,
    })
}
