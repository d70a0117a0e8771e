//! Boundary validation for activity submissions

use chrono::{DateTime, Utc};
use common::models::{
    ActivityCategory, ActivityDetails, EnergyDetails, FoodDetails, TransportDetails, WasteDetails,
};
use common::{Error, Result};
use serde::Deserialize;
use std::str::FromStr;

/// Largest single-activity quantities a submission may carry
pub const MAX_DISTANCE_KM: f64 = 1_000.0;
pub const MAX_SERVINGS: i32 = 20;
pub const MAX_HOURS: f64 = 24.0;
pub const MAX_KWH: f64 = 1_000.0;
pub const MAX_WEIGHT_KG: f64 = 1_000.0;

/// Raw activity submission as received from a client
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ActivityInput {
    pub category: String,
    pub transport_mode: Option<String>,
    pub distance_km: Option<f64>,
    pub meal_type: Option<String>,
    pub servings: Option<i32>,
    pub energy_type: Option<String>,
    pub energy_saved_kwh: Option<f64>,
    pub hours: Option<f64>,
    pub waste_type: Option<String>,
    pub weight_kg: Option<f64>,
    pub description: Option<String>,
    pub location: Option<String>,
    pub notes: Option<String>,
    /// Defaults to now; may be in the past
    pub occurred_at: Option<DateTime<Utc>>,
}

/// A submission that passed validation
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedActivity {
    pub details: ActivityDetails,
    pub description: String,
    pub location: Option<String>,
    pub notes: Option<String>,
    pub occurred_at: Option<DateTime<Utc>>,
}

/// Check a submission and convert it into typed activity details
pub fn validate(input: ActivityInput, now: DateTime<Utc>) -> Result<ValidatedActivity> {
    let category: ActivityCategory = input.category.trim().parse()?;

    let details = match category {
        ActivityCategory::Transport => {
            let mode = required(
                input.transport_mode.as_deref(),
                "Transport mode is required for transport activities",
            )?;
            match input.distance_km {
                Some(d) if d > 0.0 && d <= MAX_DISTANCE_KM => {}
                Some(d) if d > MAX_DISTANCE_KM => {
                    return Err(Error::Validation(format!(
                        "distance_km must be at most {}",
                        MAX_DISTANCE_KM
                    )))
                }
                _ => {
                    return Err(Error::Validation(
                        "Valid distance is required for transport activities".to_string(),
                    ))
                }
            }
            ActivityDetails::Transport(TransportDetails {
                mode: Some(mode),
                distance_km: input.distance_km,
            })
        }
        ActivityCategory::Food => {
            let meal = required(
                input.meal_type.as_deref(),
                "Meal type is required for food activities",
            )?;
            let servings = match input.servings {
                Some(s) if s > MAX_SERVINGS => {
                    return Err(Error::Validation(format!(
                        "servings must be at most {}",
                        MAX_SERVINGS
                    )))
                }
                Some(s) if s > 0 => s,
                _ => 1,
            };
            ActivityDetails::Food(FoodDetails {
                meal_type: Some(meal),
                servings: Some(servings),
            })
        }
        ActivityCategory::Energy => {
            let energy = required(
                input.energy_type.as_deref(),
                "Energy type is required for energy activities",
            )?;
            bounded(input.energy_saved_kwh, MAX_KWH, "energy_saved_kwh")?;
            bounded(input.hours, MAX_HOURS, "hours")?;
            ActivityDetails::Energy(EnergyDetails {
                energy_type: Some(energy),
                kwh_saved: input.energy_saved_kwh,
                hours: input.hours,
            })
        }
        ActivityCategory::Waste => {
            let waste = required(
                input.waste_type.as_deref(),
                "Waste type is required for waste activities",
            )?;
            bounded(input.weight_kg, MAX_WEIGHT_KG, "weight_kg")?;
            ActivityDetails::Waste(WasteDetails {
                waste_type: Some(waste),
                weight_kg: input.weight_kg,
            })
        }
    };

    if let Some(occurred_at) = input.occurred_at {
        if occurred_at > now {
            return Err(Error::Validation(
                "Activities cannot be logged in the future".to_string(),
            ));
        }
    }

    let description = match input.description.map(|d| d.trim().to_string()) {
        Some(d) if !d.is_empty() => d,
        _ => default_description(&details),
    };

    Ok(ValidatedActivity {
        details,
        description,
        location: input.location.filter(|l| !l.trim().is_empty()),
        notes: input.notes.filter(|n| !n.trim().is_empty()),
        occurred_at: input.occurred_at,
    })
}

fn required<T>(value: Option<&str>, message: &str) -> Result<T>
where
    T: FromStr<Err = Error>,
{
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => v.parse(),
        _ => Err(Error::Validation(message.to_string())),
    }
}

fn bounded(value: Option<f64>, max: f64, field: &str) -> Result<()> {
    match value {
        Some(v) if !(0.0..=max).contains(&v) => Err(Error::Validation(format!(
            "{} must be a number between 0 and {}",
            field, max
        ))),
        _ => Ok(()),
    }
}

fn default_description(details: &ActivityDetails) -> String {
    match details {
        ActivityDetails::Transport(d) => format!(
            "Travelled {} km by {}",
            d.distance_km.unwrap_or_default(),
            d.mode.map(|m| m.as_str()).unwrap_or("unknown")
        ),
        ActivityDetails::Food(d) => format!(
            "Ate {}",
            d.meal_type.map(|m| m.as_str()).unwrap_or("a meal")
        ),
        ActivityDetails::Energy(d) => format!(
            "Saved energy: {}",
            d.energy_type.map(|e| e.as_str()).unwrap_or("other")
        ),
        ActivityDetails::Waste(d) => format!(
            "Reduced waste: {}",
            d.waste_type.map(|w| w.as_str()).unwrap_or("other")
        ),
    }
}

/// Predefined submissions for common activities
pub fn quick_log_template(name: &str) -> Result<ActivityInput> {
    let input = match name {
        "walked_to_work" => ActivityInput {
            category: "transport".to_string(),
            transport_mode: Some("walk".to_string()),
            distance_km: Some(2.0),
            description: Some("Walked to work".to_string()),
            ..Default::default()
        },
        "cycled_to_work" => ActivityInput {
            category: "transport".to_string(),
            transport_mode: Some("bicycle".to_string()),
            distance_km: Some(3.0),
            description: Some("Cycled to work".to_string()),
            ..Default::default()
        },
        "vegetarian_lunch" => ActivityInput {
            category: "food".to_string(),
            meal_type: Some("vegetarian".to_string()),
            servings: Some(1),
            description: Some("Vegetarian lunch".to_string()),
            ..Default::default()
        },
        "lights_off_hour" => ActivityInput {
            category: "energy".to_string(),
            energy_type: Some("lights_off".to_string()),
            hours: Some(1.0),
            description: Some("Turned off lights for 1 hour".to_string()),
            ..Default::default()
        },
        "recycled_waste" => ActivityInput {
            category: "waste".to_string(),
            waste_type: Some("recycled".to_string()),
            weight_kg: Some(0.5),
            description: Some("Recycled waste".to_string()),
            ..Default::default()
        },
        other => {
            return Err(Error::Validation(format!(
                "Invalid quick-log template '{}'",
                other
            )))
        }
    };
    Ok(input)
}
