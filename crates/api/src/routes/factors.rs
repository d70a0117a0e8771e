//! Emission factor reference routes

use axum::{extract::Query, Json};
use common::models::{EnergyType, MealType, TransportMode, WasteType};
use engine::emissions::{self, EmissionFactor};
use serde::{Deserialize, Serialize};

#[derive(Serialize)]
pub struct Factor {
    pub name: &'static str,
    pub factor: f64,
}

#[derive(Serialize)]
pub struct FactorTable {
    /// kg CO2 per km
    pub transport: Vec<Factor>,
    /// kg CO2 per serving
    pub food: Vec<Factor>,
    /// kWh saved per hour
    pub energy: Vec<Factor>,
    /// kg CO2 saved per kg
    pub waste: Vec<Factor>,
    pub grid_emission_factor: f64,
    pub average_meal_emission: f64,
}

fn factors<T: EmissionFactor + Copy>(all: &[T], name: fn(&T) -> &'static str) -> Vec<Factor> {
    all.iter()
        .map(|item| Factor {
            name: name(item),
            factor: item.factor(),
        })
        .collect()
}

pub async fn table() -> Json<FactorTable> {
    Json(FactorTable {
        transport: factors(TransportMode::ALL, TransportMode::as_str),
        food: factors(MealType::ALL, MealType::as_str),
        energy: factors(EnergyType::ALL, EnergyType::as_str),
        waste: factors(WasteType::ALL, WasteType::as_str),
        grid_emission_factor: emissions::GRID_EMISSION_FACTOR,
        average_meal_emission: emissions::AVERAGE_MEAL_EMISSION,
    })
}

#[derive(Deserialize)]
pub struct CompareQuery {
    #[serde(default = "default_distance")]
    pub distance_km: f64,
    #[serde(default = "default_servings")]
    pub servings: i32,
}

fn default_distance() -> f64 {
    10.0
}

fn default_servings() -> i32 {
    1
}

#[derive(Serialize)]
pub struct Comparison {
    pub distance_km: f64,
    pub servings: i32,
    /// kg CO2 emitted by each mode over the distance
    pub transport: Vec<Factor>,
    /// kg CO2 emitted by each meal for the servings
    pub food: Vec<Factor>,
}

/// What the same trip or meal costs across every option
pub async fn compare(Query(query): Query<CompareQuery>) -> Json<Comparison> {
    let distance_km = query.distance_km.max(0.0);
    let servings = query.servings.max(1);

    Json(Comparison {
        distance_km,
        servings,
        transport: emissions::transport_comparison(distance_km)
            .into_iter()
            .map(|(mode, co2)| Factor {
                name: mode.as_str(),
                factor: co2,
            })
            .collect(),
        food: emissions::food_comparison(servings)
            .into_iter()
            .map(|(meal, co2)| Factor {
                name: meal.as_str(),
                factor: co2,
            })
            .collect(),
    })
}
