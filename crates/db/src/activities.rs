//! Activity queries

use chrono::NaiveDate;
use common::models::{
    Activity, ActivityCategory, ActivityDetails, EnergyDetails, FoodDetails, TransportDetails,
    WasteDetails,
};
use sqlx::postgres::{PgExecutor, PgRow};
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::{optional_text_column, points_column, points_param, text_column};

const ACTIVITY_COLUMNS: &str = r#"
    id, user_id, category, transport_mode, distance_km, meal_type, servings,
    energy_type, energy_saved_kwh, hours, waste_type, weight_kg,
    description, location, notes, co2_impact, points_earned, logged_at
"#;

/// Insert a new activity
pub async fn insert<'e, E>(executor: E, activity: &Activity) -> Result<(), sqlx::Error>
where
    E: PgExecutor<'e>,
{
    let mut transport_mode = None;
    let mut distance_km = None;
    let mut meal_type = None;
    let mut servings = None;
    let mut energy_type = None;
    let mut energy_saved_kwh = None;
    let mut hours = None;
    let mut waste_type = None;
    let mut weight_kg = None;

    match &activity.details {
        ActivityDetails::Transport(d) => {
            transport_mode = d.mode.map(|m| m.as_str());
            distance_km = d.distance_km;
        }
        ActivityDetails::Food(d) => {
            meal_type = d.meal_type.map(|m| m.as_str());
            servings = d.servings;
        }
        ActivityDetails::Energy(d) => {
            energy_type = d.energy_type.map(|e| e.as_str());
            energy_saved_kwh = d.kwh_saved;
            hours = d.hours;
        }
        ActivityDetails::Waste(d) => {
            waste_type = d.waste_type.map(|w| w.as_str());
            weight_kg = d.weight_kg;
        }
    }

    sqlx::query(
        r#"
        INSERT INTO activities (
            id, user_id, category, transport_mode, distance_km, meal_type, servings,
            energy_type, energy_saved_kwh, hours, waste_type, weight_kg,
            description, location, notes, co2_impact, points_earned, logged_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18)
        "#,
    )
    .bind(activity.id)
    .bind(activity.user_id)
    .bind(activity.category().as_str())
    .bind(transport_mode)
    .bind(distance_km)
    .bind(meal_type)
    .bind(servings)
    .bind(energy_type)
    .bind(energy_saved_kwh)
    .bind(hours)
    .bind(waste_type)
    .bind(weight_kg)
    .bind(&activity.description)
    .bind(&activity.location)
    .bind(&activity.notes)
    .bind(activity.co2_impact)
    .bind(points_param(activity.points_earned)?)
    .bind(activity.logged_at)
    .execute(executor)
    .await?;

    Ok(())
}

/// Most recent activities for a user
pub async fn list_recent(
    pool: &PgPool,
    user_id: Uuid,
    limit: i64,
) -> Result<Vec<Activity>, sqlx::Error> {
    let sql = format!(
        "SELECT {} FROM activities WHERE user_id = $1 ORDER BY logged_at DESC LIMIT $2",
        ACTIVITY_COLUMNS
    );
    let rows = sqlx::query(&sql)
        .bind(user_id)
        .bind(limit)
        .fetch_all(pool)
        .await?;

    rows.iter().map(row_to_activity).collect()
}

/// Activities whose UTC calendar day falls in `[from, to]`
pub async fn list_between(
    pool: &PgPool,
    user_id: Uuid,
    from: NaiveDate,
    to: NaiveDate,
) -> Result<Vec<Activity>, sqlx::Error> {
    let sql = format!(
        r#"
        SELECT {} FROM activities
        WHERE user_id = $1
          AND (logged_at AT TIME ZONE 'UTC')::date BETWEEN $2 AND $3
        ORDER BY logged_at ASC
        "#,
        ACTIVITY_COLUMNS
    );
    let rows = sqlx::query(&sql)
        .bind(user_id)
        .bind(from)
        .bind(to)
        .fetch_all(pool)
        .await?;

    rows.iter().map(row_to_activity).collect()
}

/// Every activity for a user, oldest first
pub async fn list_all_for_user(pool: &PgPool, user_id: Uuid) -> Result<Vec<Activity>, sqlx::Error> {
    let sql = format!(
        "SELECT {} FROM activities WHERE user_id = $1 ORDER BY logged_at ASC",
        ACTIVITY_COLUMNS
    );
    let rows = sqlx::query(&sql).bind(user_id).fetch_all(pool).await?;

    rows.iter().map(row_to_activity).collect()
}

fn row_to_activity(row: &PgRow) -> Result<Activity, sqlx::Error> {
    let category: ActivityCategory = text_column(row, "category")?;
    let details = match category {
        ActivityCategory::Transport => ActivityDetails::Transport(TransportDetails {
            mode: optional_text_column(row, "transport_mode")?,
            distance_km: row.try_get("distance_km")?,
        }),
        ActivityCategory::Food => ActivityDetails::Food(FoodDetails {
            meal_type: optional_text_column(row, "meal_type")?,
            servings: row.try_get("servings")?,
        }),
        ActivityCategory::Energy => ActivityDetails::Energy(EnergyDetails {
            energy_type: optional_text_column(row, "energy_type")?,
            kwh_saved: row.try_get("energy_saved_kwh")?,
            hours: row.try_get("hours")?,
        }),
        ActivityCategory::Waste => ActivityDetails::Waste(WasteDetails {
            waste_type: optional_text_column(row, "waste_type")?,
            weight_kg: row.try_get("weight_kg")?,
        }),
    };

    Ok(Activity {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        details,
        description: row.try_get("description")?,
        location: row.try_get("location")?,
        notes: row.try_get("notes")?,
        co2_impact: row.try_get("co2_impact")?,
        points_earned: points_column(row, "points_earned")?,
        logged_at: row.try_get("logged_at")?,
    })
}
